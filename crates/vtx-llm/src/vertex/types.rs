//! Vertex Anthropic wire types: request body and SSE event structures.
//!
//! The SSE types mirror the raw JSON of `streamRawPredict` responses. Usage
//! counters are optional because the backend may send `null` or omit them.
//! Unknown event, block, and delta types deserialize to an `Unknown` variant
//! and are ignored downstream.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

// ─────────────────────────────────────────────────────────────────────────────
// SSE event types
// ─────────────────────────────────────────────────────────────────────────────

/// A raw SSE event from the Vertex Anthropic stream.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum VertexSseEvent {
    /// `message_start`: the response message begins.
    #[serde(rename = "message_start")]
    MessageStart {
        /// The message object.
        message: SseMessage,
    },
    /// `content_block_start`: a new content block begins.
    #[serde(rename = "content_block_start")]
    ContentBlockStart {
        /// Server-assigned block index.
        index: usize,
        /// The content block.
        content_block: SseContentBlock,
    },
    /// `content_block_delta`: incremental content.
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta {
        /// Server-assigned block index.
        index: usize,
        /// The delta.
        delta: SseDelta,
    },
    /// `content_block_stop`: block finished.
    #[serde(rename = "content_block_stop")]
    ContentBlockStop {
        /// Server-assigned block index.
        index: usize,
    },
    /// `message_delta`: stop reason and output usage.
    #[serde(rename = "message_delta")]
    MessageDelta {
        /// Delta fields.
        #[serde(default)]
        delta: SseMessageDelta,
        /// Usage update.
        #[serde(default)]
        usage: Option<SseUsageDelta>,
    },
    /// `message_stop`: stream complete.
    #[serde(rename = "message_stop")]
    MessageStop,
    /// `ping`: keepalive.
    #[serde(rename = "ping")]
    Ping,
    /// `error`: backend-reported error.
    #[serde(rename = "error")]
    Error {
        /// Error details.
        error: SseError,
    },
    /// Any other event type.
    #[serde(other)]
    Unknown,
}

/// Message object in `message_start`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SseMessage {
    /// Message ID.
    #[serde(default)]
    pub id: Option<String>,
    /// Usage information.
    #[serde(default)]
    pub usage: SseUsage,
}

/// Token usage in `message_start`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SseUsage {
    /// Uncached input tokens.
    #[serde(default)]
    pub input_tokens: Option<u64>,
    /// Output tokens so far.
    #[serde(default)]
    pub output_tokens: Option<u64>,
    /// Cache read tokens.
    #[serde(default)]
    pub cache_read_input_tokens: Option<u64>,
    /// Cache creation tokens.
    #[serde(default)]
    pub cache_creation_input_tokens: Option<u64>,
}

/// Content block in `content_block_start`.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum SseContentBlock {
    /// Text block.
    #[serde(rename = "text")]
    Text,
    /// Thinking block.
    #[serde(rename = "thinking")]
    Thinking,
    /// Tool use block.
    #[serde(rename = "tool_use")]
    ToolUse {
        /// Tool call ID.
        id: String,
        /// Tool name.
        name: String,
    },
    /// Any other block type.
    #[serde(other)]
    Unknown,
}

/// Delta in `content_block_delta`.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum SseDelta {
    /// Text fragment.
    #[serde(rename = "text_delta")]
    TextDelta {
        /// Text fragment.
        text: String,
    },
    /// Thinking fragment.
    #[serde(rename = "thinking_delta")]
    ThinkingDelta {
        /// Thinking fragment.
        thinking: String,
    },
    /// Signature fragment.
    #[serde(rename = "signature_delta")]
    SignatureDelta {
        /// Signature fragment.
        signature: String,
    },
    /// Tool argument JSON fragment.
    #[serde(rename = "input_json_delta")]
    InputJsonDelta {
        /// Raw JSON fragment.
        partial_json: String,
    },
    /// Any other delta type.
    #[serde(other)]
    Unknown,
}

/// Message-level delta in `message_delta`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SseMessageDelta {
    /// Backend stop reason.
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Usage delta in `message_delta`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SseUsageDelta {
    /// Cumulative output tokens.
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

/// Error in SSE `error` event.
#[derive(Clone, Debug, Deserialize)]
pub struct SseError {
    /// Error type.
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Error message.
    #[serde(default)]
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Request types
// ─────────────────────────────────────────────────────────────────────────────

/// Prompt cache directive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheControl {
    /// Cache type (always `"ephemeral"`).
    #[serde(rename = "type")]
    pub cache_type: String,
}

impl CacheControl {
    /// The ephemeral cache directive.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            cache_type: "ephemeral".into(),
        }
    }
}

/// System prompt block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemPromptBlock {
    /// Block type (always `"text"`).
    #[serde(rename = "type")]
    pub block_type: String,
    /// Prompt text.
    pub text: String,
    /// Cache directive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

impl SystemPromptBlock {
    /// A text block with ephemeral cache control.
    #[must_use]
    pub fn text_cached(text: impl Into<String>) -> Self {
        Self {
            block_type: "text".into(),
            text: text.into(),
            cache_control: Some(CacheControl::ephemeral()),
        }
    }
}

/// Tool definition in the wire format.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnthropicTool {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for the input object.
    pub input_schema: Value,
}

/// Extended thinking configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThinkingConfig {
    /// Always `"enabled"`.
    #[serde(rename = "type")]
    pub thinking_type: String,
    /// Token budget for thinking.
    pub budget_tokens: u32,
}

impl ThinkingConfig {
    /// Thinking enabled with `budget_tokens`.
    #[must_use]
    pub fn enabled(budget_tokens: u32) -> Self {
        Self {
            thinking_type: "enabled".into(),
            budget_tokens,
        }
    }
}

/// One message in the wire format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// `"user"` or `"assistant"`.
    pub role: String,
    /// A plain string or an array of content parts.
    pub content: Value,
}

impl WireMessage {
    /// A user message.
    #[must_use]
    pub fn user(content: Value) -> Self {
        Self {
            role: "user".into(),
            content,
        }
    }

    /// An assistant message.
    #[must_use]
    pub fn assistant(content: Value) -> Self {
        Self {
            role: "assistant".into(),
            content,
        }
    }
}

/// `streamRawPredict` request body.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VertexRequest {
    /// Anthropic API version (`"vertex-2023-10-16"`).
    pub anthropic_version: String,
    /// Conversation.
    pub messages: Vec<WireMessage>,
    /// Maximum tokens to generate.
    pub max_tokens: u64,
    /// Always `true`.
    pub stream: bool,
    /// System prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<Vec<SystemPromptBlock>>,
    /// Available tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
    /// Extended thinking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingConfig>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Content part builders
// ─────────────────────────────────────────────────────────────────────────────

/// Build a text part.
#[must_use]
pub fn text_block(text: &str) -> Value {
    json!({
        "type": "text",
        "text": text,
    })
}

/// Build a base64 image part.
#[must_use]
pub fn image_block(data: &str, media_type: &str) -> Value {
    json!({
        "type": "image",
        "source": {
            "type": "base64",
            "media_type": media_type,
            "data": data,
        },
    })
}

/// Build a signed thinking part.
#[must_use]
pub fn thinking_block(thinking: &str, signature: &str) -> Value {
    json!({
        "type": "thinking",
        "thinking": thinking,
        "signature": signature,
    })
}

/// Build a `tool_use` part.
#[must_use]
pub fn tool_use_block(id: &str, name: &str, input: &Map<String, Value>) -> Value {
    json!({
        "type": "tool_use",
        "id": id,
        "name": name,
        "input": input,
    })
}

/// Build a `tool_result` part. `is_error` is always present.
#[must_use]
pub fn tool_result_block(tool_use_id: &str, content: Value, is_error: bool) -> Value {
    json!({
        "type": "tool_result",
        "tool_use_id": tool_use_id,
        "content": content,
        "is_error": is_error,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn parse(json: &str) -> VertexSseEvent {
        serde_json::from_str(json).unwrap()
    }

    // -- SSE event deserialization --

    #[test]
    fn message_start_with_null_usage_fields() {
        let event = parse(
            r#"{"type":"message_start","message":{"id":"msg_1","usage":{"input_tokens":12,"output_tokens":null}}}"#,
        );
        assert_matches!(event, VertexSseEvent::MessageStart { message } => {
            assert_eq!(message.id.as_deref(), Some("msg_1"));
            assert_eq!(message.usage.input_tokens, Some(12));
            assert_eq!(message.usage.output_tokens, None);
            assert_eq!(message.usage.cache_read_input_tokens, None);
        });
    }

    #[test]
    fn content_block_start_variants() {
        assert_matches!(
            parse(r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#),
            VertexSseEvent::ContentBlockStart { index: 0, content_block: SseContentBlock::Text }
        );
        assert_matches!(
            parse(r#"{"type":"content_block_start","index":1,"content_block":{"type":"thinking","thinking":""}}"#),
            VertexSseEvent::ContentBlockStart { content_block: SseContentBlock::Thinking, .. }
        );
        assert_matches!(
            parse(r#"{"type":"content_block_start","index":2,"content_block":{"type":"tool_use","id":"toolu_1","name":"read","input":{}}}"#),
            VertexSseEvent::ContentBlockStart { content_block: SseContentBlock::ToolUse { id, name }, .. }
                if id == "toolu_1" && name == "read"
        );
        assert_matches!(
            parse(r#"{"type":"content_block_start","index":3,"content_block":{"type":"server_tool_use"}}"#),
            VertexSseEvent::ContentBlockStart { content_block: SseContentBlock::Unknown, .. }
        );
    }

    #[test]
    fn delta_variants() {
        assert_matches!(
            parse(r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"a\""}}"#),
            VertexSseEvent::ContentBlockDelta { delta: SseDelta::InputJsonDelta { partial_json }, .. }
                if partial_json == "{\"a\""
        );
        assert_matches!(
            parse(r#"{"type":"content_block_delta","index":0,"delta":{"type":"signature_delta","signature":"EqQ"}}"#),
            VertexSseEvent::ContentBlockDelta { delta: SseDelta::SignatureDelta { .. }, .. }
        );
        assert_matches!(
            parse(r#"{"type":"content_block_delta","index":0,"delta":{"type":"citations_delta"}}"#),
            VertexSseEvent::ContentBlockDelta { delta: SseDelta::Unknown, .. }
        );
    }

    #[test]
    fn message_delta_and_unknown_event() {
        assert_matches!(
            parse(r#"{"type":"message_delta","delta":{"stop_reason":"tool_use"},"usage":{"output_tokens":42}}"#),
            VertexSseEvent::MessageDelta { delta, usage: Some(usage) } => {
                assert_eq!(delta.stop_reason.as_deref(), Some("tool_use"));
                assert_eq!(usage.output_tokens, Some(42));
            }
        );
        assert_matches!(parse(r#"{"type":"vertex_event"}"#), VertexSseEvent::Unknown);
        assert_matches!(parse(r#"{"type":"ping"}"#), VertexSseEvent::Ping);
    }

    // -- Request serialization --

    #[test]
    fn request_omits_absent_optionals() {
        let body = VertexRequest {
            anthropic_version: "vertex-2023-10-16".into(),
            messages: vec![WireMessage::user(json!("hi"))],
            max_tokens: 100,
            stream: true,
            system: None,
            tools: None,
            thinking: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "anthropic_version": "vertex-2023-10-16",
                "messages": [{"role": "user", "content": "hi"}],
                "max_tokens": 100,
                "stream": true,
            })
        );
    }

    #[test]
    fn thinking_and_system_serialize() {
        assert_eq!(
            serde_json::to_value(ThinkingConfig::enabled(4096)).unwrap(),
            json!({"type": "enabled", "budget_tokens": 4096})
        );
        assert_eq!(
            serde_json::to_value(SystemPromptBlock::text_cached("be brief")).unwrap(),
            json!({"type": "text", "text": "be brief", "cache_control": {"type": "ephemeral"}})
        );
    }

    #[test]
    fn tool_result_always_carries_is_error() {
        let block = tool_result_block("t1", json!("ok"), false);
        assert_eq!(block["is_error"], json!(false));
    }
}
