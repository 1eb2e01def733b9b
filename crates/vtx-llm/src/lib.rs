//! # vtx-llm
//!
//! Streaming turn pipeline for Anthropic models served through Vertex AI.
//!
//! - History normalizer: makes a conversation safe to replay against a strict API
//! - Wire encoder: normalized history + tools + reasoning config to a request body
//! - SSE decoder: chunked bytes to typed frames, tolerant of malformed payloads
//! - Turn assembler: frames to live [`AssistantEvent`]s plus the final turn
//!
//! The caller owns transport: it sends the body produced by
//! [`vertex::build_request`] and hands the response back to
//! [`vertex::stream_vertex_anthropic`].
//!
//! [`AssistantEvent`]: vtx_core::events::AssistantEvent

#![deny(unsafe_code)]

pub mod id_remapping;
pub mod provider;
pub mod sse;
pub mod tool_parsing;
pub mod transform;
pub mod vertex;

pub use provider::{AccessTokenSource, ProviderError, ProviderResult, StaticAccessToken, StreamOptions};
