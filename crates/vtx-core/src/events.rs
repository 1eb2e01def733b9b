//! Turn events.
//!
//! [`AssistantEvent`] is the delta stream emitted while an assistant turn is
//! assembled from the wire. Every event carries a snapshot of the partial turn
//! so a consumer can render from any single event without replaying the
//! stream. Events are transient and never persisted.

use serde::{Deserialize, Serialize};

use crate::content::ToolCall;
use crate::messages::{AssistantMessage, StopReason};

/// Events emitted while an assistant turn is streamed.
///
/// `content_index` is the position of the affected block in
/// `partial.content`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AssistantEvent {
    /// Turn opened.
    #[serde(rename = "start")]
    Start {
        /// Empty turn.
        partial: AssistantMessage,
    },

    /// Text block opened.
    #[serde(rename = "text_start", rename_all = "camelCase")]
    TextStart {
        /// Block position.
        content_index: usize,
        /// Running turn.
        partial: AssistantMessage,
    },

    /// Text fragment appended.
    #[serde(rename = "text_delta", rename_all = "camelCase")]
    TextDelta {
        /// Block position.
        content_index: usize,
        /// Fragment.
        delta: String,
        /// Running turn.
        partial: AssistantMessage,
    },

    /// Text block closed.
    #[serde(rename = "text_end", rename_all = "camelCase")]
    TextEnd {
        /// Block position.
        content_index: usize,
        /// Full block text.
        content: String,
        /// Running turn.
        partial: AssistantMessage,
    },

    /// Thinking block opened.
    #[serde(rename = "thinking_start", rename_all = "camelCase")]
    ThinkingStart {
        /// Block position.
        content_index: usize,
        /// Running turn.
        partial: AssistantMessage,
    },

    /// Thinking fragment appended.
    #[serde(rename = "thinking_delta", rename_all = "camelCase")]
    ThinkingDelta {
        /// Block position.
        content_index: usize,
        /// Fragment.
        delta: String,
        /// Running turn.
        partial: AssistantMessage,
    },

    /// Thinking block closed.
    #[serde(rename = "thinking_end", rename_all = "camelCase")]
    ThinkingEnd {
        /// Block position.
        content_index: usize,
        /// Full thinking text.
        content: String,
        /// Running turn.
        partial: AssistantMessage,
    },

    /// Tool call opened.
    #[serde(rename = "toolcall_start", rename_all = "camelCase")]
    ToolCallStart {
        /// Block position.
        content_index: usize,
        /// Running turn.
        partial: AssistantMessage,
    },

    /// Raw argument JSON fragment appended.
    #[serde(rename = "toolcall_delta", rename_all = "camelCase")]
    ToolCallDelta {
        /// Block position.
        content_index: usize,
        /// Raw JSON fragment.
        delta: String,
        /// Running turn.
        partial: AssistantMessage,
    },

    /// Tool call closed with its final arguments.
    #[serde(rename = "toolcall_end", rename_all = "camelCase")]
    ToolCallEnd {
        /// Block position.
        content_index: usize,
        /// Finished call.
        tool_call: ToolCall,
        /// Running turn.
        partial: AssistantMessage,
    },

    /// Stop reason or usage updated.
    #[serde(rename = "message_delta")]
    MessageDelta {
        /// Running turn.
        partial: AssistantMessage,
    },

    /// Turn finished normally.
    #[serde(rename = "done")]
    Done {
        /// `stop`, `length` or `toolUse`.
        reason: StopReason,
        /// Finished turn.
        message: AssistantMessage,
    },

    /// Turn failed or was cancelled.
    #[serde(rename = "error")]
    Error {
        /// `error` or `aborted`.
        reason: StopReason,
        /// Failed turn with `error_message` set.
        error: AssistantMessage,
    },
}

impl AssistantEvent {
    /// The turn snapshot carried by this event.
    #[must_use]
    pub fn partial(&self) -> &AssistantMessage {
        match self {
            Self::Start { partial }
            | Self::TextStart { partial, .. }
            | Self::TextDelta { partial, .. }
            | Self::TextEnd { partial, .. }
            | Self::ThinkingStart { partial, .. }
            | Self::ThinkingDelta { partial, .. }
            | Self::ThinkingEnd { partial, .. }
            | Self::ToolCallStart { partial, .. }
            | Self::ToolCallDelta { partial, .. }
            | Self::ToolCallEnd { partial, .. }
            | Self::MessageDelta { partial } => partial,
            Self::Done { message, .. } => message,
            Self::Error { error, .. } => error,
        }
    }

    /// Whether this is the last event of a turn.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// Consume a terminal event into its turn.
    #[must_use]
    pub fn into_final(self) -> Option<AssistantMessage> {
        match self {
            Self::Done { message, .. } => Some(message),
            Self::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Wire name of this event.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::TextStart { .. } => "text_start",
            Self::TextDelta { .. } => "text_delta",
            Self::TextEnd { .. } => "text_end",
            Self::ThinkingStart { .. } => "thinking_start",
            Self::ThinkingDelta { .. } => "thinking_delta",
            Self::ThinkingEnd { .. } => "thinking_end",
            Self::ToolCallStart { .. } => "toolcall_start",
            Self::ToolCallDelta { .. } => "toolcall_delta",
            Self::ToolCallEnd { .. } => "toolcall_end",
            Self::MessageDelta { .. } => "message_delta",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}
