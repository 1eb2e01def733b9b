//! # Vertex AI Anthropic
//!
//! Request encoding and streaming turn assembly for Claude models served
//! through Vertex AI `streamRawPredict`.

pub mod message_converter;
pub mod provider;
pub mod stream_handler;
pub mod types;

pub use message_converter::{convert_messages, convert_tools};
pub use provider::{
    AssistantEventStream, ByteStream, WireResponse, build_request, prepare_request,
    stream_vertex_anthropic,
};
pub use stream_handler::{TurnAssembler, map_stop_reason};
pub use types::VertexRequest;
