//! Message types for the conversation model.
//!
//! Messages form the conversation history replayed to the model. Three roles:
//! user, assistant, and tool result. An assistant message records which
//! backend produced it so reasoning signatures are only replayed to the same
//! model.

use serde::{Deserialize, Serialize};

use crate::content::{ContentBlock, ContentPart, ToolCall};
use crate::text::sanitize_json_surrogate_escapes;
use crate::tools::Tool;

// ─────────────────────────────────────────────────────────────────────────────
// Model identity
// ─────────────────────────────────────────────────────────────────────────────

/// The (provider, api, model) triple identifying which backend produced a turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelIdentity {
    /// Provider name (e.g. `"vertex-anthropic"`).
    pub provider: String,
    /// Wire API name (e.g. `"vertex-anthropic-api"`).
    pub api: String,
    /// Model ID.
    pub model: String,
}

impl ModelIdentity {
    /// Create a model identity.
    #[must_use]
    pub fn new(provider: impl Into<String>, api: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            api: api.into(),
            model: model.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token and cost tracking
// ─────────────────────────────────────────────────────────────────────────────

/// Cost breakdown in USD.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCost {
    /// Cost of uncached input tokens.
    pub input: f64,
    /// Cost of output tokens.
    pub output: f64,
    /// Cost of cache reads.
    pub cache_read: f64,
    /// Cost of cache writes.
    pub cache_write: f64,
    /// Sum of the above.
    pub total: f64,
}

/// Token usage for one assistant turn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    /// Input tokens.
    pub input: u64,
    /// Output tokens.
    pub output: u64,
    /// Tokens read from prompt cache.
    pub cache_read: u64,
    /// Tokens written to prompt cache.
    pub cache_write: u64,
    /// Sum of all four counters.
    pub total_tokens: u64,
    /// Cost computed from the counters.
    pub cost: UsageCost,
}

impl Usage {
    /// Recompute `total_tokens` from the individual counters.
    pub fn refresh_total(&mut self) {
        self.total_tokens = self.input + self.output + self.cache_read + self.cache_write;
    }
}

/// Why an assistant turn ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// Natural end of response.
    #[default]
    Stop,
    /// Hit the output token limit.
    Length,
    /// Model wants to use a tool.
    ToolUse,
    /// The turn failed.
    Error,
    /// The turn was cancelled by the caller.
    Aborted,
}

impl StopReason {
    /// Whether this turn is incomplete and must never be replayed.
    #[must_use]
    pub fn is_incomplete(self) -> bool {
        matches!(self, Self::Error | Self::Aborted)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// User message content: plain text or ordered parts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserMessageContent {
    /// Plain text.
    Text(String),
    /// Ordered text and image parts.
    Parts(Vec<ContentPart>),
}

/// One assistant turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantMessage {
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
    /// Provider that produced this turn.
    pub provider: String,
    /// Wire API that produced this turn.
    pub api: String,
    /// Model that produced this turn.
    pub model: String,
    /// Token usage.
    #[serde(default)]
    pub usage: Usage,
    /// Why the turn ended.
    pub stop_reason: StopReason,
    /// Human-readable failure description for `error`/`aborted` turns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Creation time (milliseconds since epoch).
    #[serde(default)]
    pub timestamp: i64,
}

impl AssistantMessage {
    /// Create an empty turn attributed to `identity`.
    #[must_use]
    pub fn empty(identity: &ModelIdentity) -> Self {
        Self {
            content: Vec::new(),
            provider: identity.provider.clone(),
            api: identity.api.clone(),
            model: identity.model.clone(),
            usage: Usage::default(),
            stop_reason: StopReason::Stop,
            error_message: None,
            timestamp: now_ms(),
        }
    }

    /// Whether this turn was produced by exactly `target`.
    #[must_use]
    pub fn is_same_origin(&self, target: &ModelIdentity) -> bool {
        self.provider == target.provider && self.api == target.api && self.model == target.model
    }

    /// Tool calls in content order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.content.iter().filter_map(ContentBlock::as_tool_call)
    }

    /// Concatenated text of all text blocks.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Result of executing one tool call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultMessage {
    /// ID of the tool call this result answers.
    pub tool_call_id: String,
    /// Name of the tool.
    pub tool_name: String,
    /// Result content.
    pub content: Vec<ContentPart>,
    /// Whether the tool failed.
    #[serde(default)]
    pub is_error: bool,
    /// Creation time (milliseconds since epoch).
    #[serde(default)]
    pub timestamp: i64,
}

/// A conversation message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum Message {
    /// User message.
    #[serde(rename = "user")]
    User {
        /// Message content.
        content: UserMessageContent,
        /// Creation time (milliseconds since epoch).
        #[serde(default)]
        timestamp: i64,
    },
    /// Assistant turn.
    #[serde(rename = "assistant")]
    Assistant(AssistantMessage),
    /// Tool result.
    #[serde(rename = "toolResult")]
    ToolResult(ToolResultMessage),
}

impl Message {
    /// Create a plain-text user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::User {
            content: UserMessageContent::Text(text.into()),
            timestamp: now_ms(),
        }
    }

    /// Create a user message from parts.
    #[must_use]
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self::User {
            content: UserMessageContent::Parts(parts),
            timestamp: now_ms(),
        }
    }

    /// Create a text tool result.
    #[must_use]
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        text: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self::ToolResult(ToolResultMessage {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            content: vec![ContentPart::text(text)],
            is_error,
            timestamp: now_ms(),
        })
    }

    /// Returns `true` for user messages.
    #[must_use]
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }

    /// Returns `true` for assistant messages.
    #[must_use]
    pub fn is_assistant(&self) -> bool {
        matches!(self, Self::Assistant(_))
    }

    /// Returns `true` for tool results.
    #[must_use]
    pub fn is_tool_result(&self) -> bool {
        matches!(self, Self::ToolResult(_))
    }

    /// The assistant turn, if this is one.
    #[must_use]
    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        match self {
            Self::Assistant(msg) => Some(msg),
            _ => None,
        }
    }

    /// The tool result, if this is one.
    #[must_use]
    pub fn as_tool_result(&self) -> Option<&ToolResultMessage> {
        match self {
            Self::ToolResult(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Parse a persisted history, replacing unpaired surrogate escapes first.
///
/// Histories written by UTF-16 runtimes can contain `\uD83D` without its low
/// half; `serde_json` rejects those, so they become U+FFFD before parsing.
pub fn parse_history(json: &str) -> Result<Vec<Message>, serde_json::Error> {
    serde_json::from_str(&sanitize_json_surrogate_escapes(json))
}

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// Everything needed to build one request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// System prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Conversation history.
    pub messages: Vec<Message>,
    /// Available tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

/// Current time in milliseconds since epoch.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
