//! # vtx-core
//!
//! Foundation types shared by every vtx crate.
//!
//! - **Messages**: `Message` enum with `User`, `Assistant`, `ToolResult` variants
//! - **Content blocks**: `ContentBlock` (text, thinking, tool call) and `ContentPart` (text, image)
//! - **Turn events**: `AssistantEvent`, the delta stream emitted while a turn is assembled
//! - **Models**: `ModelInfo` registry entries, reasoning effort and thinking budgets
//! - **Text**: surrogate sanitizers for foreign text entering the pipeline
//! - **Logging**: `tracing` subscriber setup and in-memory capture for tests

#![deny(unsafe_code)]

pub mod content;
pub mod events;
pub mod logging;
pub mod messages;
pub mod models;
pub mod text;
pub mod tools;
