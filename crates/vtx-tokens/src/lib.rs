//! # vtx-tokens
//!
//! Cost collaborator for the turn assembler: converts token usage counters
//! into a USD breakdown using per-million prices from the model registry.

#![deny(unsafe_code)]

pub mod pricing;

pub use pricing::{CostModel, calculate_cost};
