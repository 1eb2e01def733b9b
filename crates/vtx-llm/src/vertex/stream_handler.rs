//! Vertex Anthropic SSE stream handler.
//!
//! [`TurnAssembler`] converts raw SSE events (`message_start`,
//! `content_block_delta`, ...) into [`AssistantEvent`]s while building the
//! turn. Blocks in progress are drafts keyed by the server's block index;
//! `content_block_stop` turns a draft into a finished [`ContentBlock`] in
//! place, so block positions never move.

use tracing::{debug, info, warn};
use vtx_core::content::{ContentBlock, ToolCall};
use vtx_core::events::AssistantEvent;
use vtx_core::messages::{AssistantMessage, StopReason};
use vtx_core::models::ModelInfo;
use vtx_tokens::calculate_cost;

use super::types::{SseContentBlock, SseDelta, SseMessage, SseUsageDelta, VertexSseEvent};
use crate::tool_parsing::{PartialJson, ToolCallContext};

/// A content block still receiving deltas.
#[derive(Clone, Debug)]
enum Draft {
    Text {
        index: usize,
        text: String,
    },
    Thinking {
        index: usize,
        thinking: String,
        signature: String,
    },
    ToolCall {
        index: usize,
        id: String,
        name: String,
        args: PartialJson,
    },
}

impl Draft {
    fn index(&self) -> usize {
        match self {
            Self::Text { index, .. } | Self::Thinking { index, .. } | Self::ToolCall { index, .. } => *index,
        }
    }

    /// How the block looks right now. Tool arguments are the last good parse.
    fn preview(&self) -> ContentBlock {
        match self {
            Self::Text { text, .. } => ContentBlock::text(text.clone()),
            Self::Thinking {
                thinking, signature, ..
            } => ContentBlock::Thinking {
                thinking: thinking.clone(),
                signature: non_empty(signature.clone()),
            },
            Self::ToolCall { id, name, args, .. } => {
                ContentBlock::tool_call(id.clone(), name.clone(), args.last_good().cloned().unwrap_or_default())
            }
        }
    }

    fn finish(self) -> ContentBlock {
        match self {
            Self::Text { text, .. } => ContentBlock::text(text),
            Self::Thinking {
                thinking, signature, ..
            } => ContentBlock::Thinking {
                thinking,
                signature: non_empty(signature),
            },
            Self::ToolCall { id, name, args, .. } => {
                let context = ToolCallContext {
                    tool_call_id: Some(id.clone()),
                    tool_name: Some(name.clone()),
                };
                let arguments = args.finish(&context);
                ContentBlock::ToolCall(ToolCall { id, name, arguments })
            }
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

#[derive(Clone, Debug)]
enum Slot {
    Open(Draft),
    Closed(ContentBlock),
}

impl Slot {
    fn block(&self) -> ContentBlock {
        match self {
            Self::Open(draft) => draft.preview(),
            Self::Closed(block) => block.clone(),
        }
    }
}

/// Map a backend stop reason.
pub fn map_stop_reason(reason: &str) -> StopReason {
    match reason {
        "end_turn" | "pause_turn" | "stop_sequence" => StopReason::Stop,
        "max_tokens" => StopReason::Length,
        "tool_use" => StopReason::ToolUse,
        _ => StopReason::Error,
    }
}

/// Builds one assistant turn from SSE events.
#[derive(Debug)]
pub struct TurnAssembler {
    model: ModelInfo,
    slots: Vec<Slot>,
    message: AssistantMessage,
}

impl TurnAssembler {
    /// An empty turn attributed to `model`.
    pub fn new(model: &ModelInfo) -> Self {
        Self {
            model: model.clone(),
            slots: Vec::new(),
            message: AssistantMessage::empty(&model.identity()),
        }
    }

    /// The turn as it stands, with open blocks previewed.
    pub fn snapshot(&self) -> AssistantMessage {
        AssistantMessage {
            content: self.slots.iter().map(Slot::block).collect(),
            ..self.message.clone()
        }
    }

    /// The `start` event.
    pub fn start(&self) -> AssistantEvent {
        AssistantEvent::Start {
            partial: self.snapshot(),
        }
    }

    /// Process one SSE event and return the events it produces.
    pub fn handle(&mut self, event: VertexSseEvent) -> Vec<AssistantEvent> {
        match event {
            VertexSseEvent::MessageStart { message } => {
                self.on_message_start(&message);
                vec![]
            }
            VertexSseEvent::ContentBlockStart { index, content_block } => {
                self.on_block_start(index, content_block).into_iter().collect()
            }
            VertexSseEvent::ContentBlockDelta { index, delta } => self.on_block_delta(index, delta).into_iter().collect(),
            VertexSseEvent::ContentBlockStop { index } => self.on_block_stop(index).into_iter().collect(),
            VertexSseEvent::MessageDelta { delta, usage } => {
                if let Some(reason) = delta.stop_reason.as_deref() {
                    self.message.stop_reason = map_stop_reason(reason);
                }
                if let Some(usage) = usage {
                    self.on_usage_delta(&usage);
                }
                vec![AssistantEvent::MessageDelta {
                    partial: self.snapshot(),
                }]
            }
            VertexSseEvent::Error { error } => {
                warn!(
                    error_type = %error.error_type,
                    message = %error.message,
                    "Vertex SSE error event"
                );
                vec![]
            }
            VertexSseEvent::MessageStop | VertexSseEvent::Ping | VertexSseEvent::Unknown => vec![],
        }
    }

    /// Close the turn normally. Blocks still open are finalized silently.
    pub fn finish(mut self) -> AssistantEvent {
        self.close_all();
        let message = self.snapshot();
        AssistantEvent::Done {
            reason: message.stop_reason,
            message,
        }
    }

    /// Close the turn as failed. `reason` is `Error` or `Aborted`.
    pub fn fail(mut self, reason: StopReason, error_message: impl Into<String>) -> AssistantEvent {
        self.close_all();
        self.message.stop_reason = reason;
        self.message.error_message = Some(error_message.into());
        AssistantEvent::Error {
            reason,
            error: self.snapshot(),
        }
    }

    // ── event handlers ───────────────────────────────────────────────────

    fn on_message_start(&mut self, message: &SseMessage) {
        let usage = &mut self.message.usage;
        usage.input = message.usage.input_tokens.unwrap_or(0);
        usage.output = message.usage.output_tokens.unwrap_or(0);
        usage.cache_read = message.usage.cache_read_input_tokens.unwrap_or(0);
        usage.cache_write = message.usage.cache_creation_input_tokens.unwrap_or(0);
        usage.refresh_total();
        calculate_cost(&self.model, usage);

        info!(
            message_id = message.id.as_deref(),
            input_tokens = usage.input,
            cache_read = usage.cache_read,
            cache_write = usage.cache_write,
            cache_hit = usage.cache_read > 0,
            "[CACHE] message_start"
        );
    }

    fn on_usage_delta(&mut self, delta: &SseUsageDelta) {
        let usage = &mut self.message.usage;
        if let Some(output) = delta.output_tokens.filter(|&n| n > 0) {
            usage.output = output;
        }
        usage.refresh_total();
        calculate_cost(&self.model, usage);
    }

    fn on_block_start(&mut self, index: usize, block: SseContentBlock) -> Option<AssistantEvent> {
        let draft = match block {
            SseContentBlock::Text => Draft::Text {
                index,
                text: String::new(),
            },
            SseContentBlock::Thinking => Draft::Thinking {
                index,
                thinking: String::new(),
                signature: String::new(),
            },
            SseContentBlock::ToolUse { id, name } => Draft::ToolCall {
                index,
                id,
                name,
                args: PartialJson::new(),
            },
            SseContentBlock::Unknown => {
                debug!(index, "ignoring unsupported content block type");
                return None;
            }
        };

        let started: fn(usize, AssistantMessage) -> AssistantEvent = match draft {
            Draft::Text { .. } => |content_index, partial| AssistantEvent::TextStart { content_index, partial },
            Draft::Thinking { .. } => {
                |content_index, partial| AssistantEvent::ThinkingStart { content_index, partial }
            }
            Draft::ToolCall { .. } => {
                |content_index, partial| AssistantEvent::ToolCallStart { content_index, partial }
            }
        };
        let content_index = self.slots.len();
        self.slots.push(Slot::Open(draft));
        Some(started(content_index, self.snapshot()))
    }

    fn on_block_delta(&mut self, index: usize, delta: SseDelta) -> Option<AssistantEvent> {
        enum Emit {
            Text(String),
            Thinking(String),
            ToolCall(String),
        }

        let Some(content_index) = self.open_position(index) else {
            debug!(index, "delta for unknown block index");
            return None;
        };
        let Slot::Open(draft) = &mut self.slots[content_index] else {
            return None;
        };

        let emit = match (draft, delta) {
            (Draft::Text { text, .. }, SseDelta::TextDelta { text: fragment }) => {
                text.push_str(&fragment);
                Emit::Text(fragment)
            }
            (Draft::Thinking { thinking, .. }, SseDelta::ThinkingDelta { thinking: fragment }) => {
                thinking.push_str(&fragment);
                Emit::Thinking(fragment)
            }
            (Draft::Thinking { signature, .. }, SseDelta::SignatureDelta { signature: fragment }) => {
                signature.push_str(&fragment);
                return None;
            }
            (Draft::ToolCall { args, .. }, SseDelta::InputJsonDelta { partial_json }) => {
                let _ = args.push(&partial_json);
                Emit::ToolCall(partial_json)
            }
            _ => return None,
        };

        let partial = self.snapshot();
        Some(match emit {
            Emit::Text(delta) => AssistantEvent::TextDelta {
                content_index,
                delta,
                partial,
            },
            Emit::Thinking(delta) => AssistantEvent::ThinkingDelta {
                content_index,
                delta,
                partial,
            },
            Emit::ToolCall(delta) => AssistantEvent::ToolCallDelta {
                content_index,
                delta,
                partial,
            },
        })
    }

    fn on_block_stop(&mut self, index: usize) -> Option<AssistantEvent> {
        let Some(content_index) = self.open_position(index) else {
            debug!(index, "stop for unknown block index");
            return None;
        };
        let block = self.close(content_index)?;
        let partial = self.snapshot();
        Some(match block {
            ContentBlock::Text { text } => AssistantEvent::TextEnd {
                content_index,
                content: text,
                partial,
            },
            ContentBlock::Thinking { thinking, .. } => AssistantEvent::ThinkingEnd {
                content_index,
                content: thinking,
                partial,
            },
            ContentBlock::ToolCall(tool_call) => AssistantEvent::ToolCallEnd {
                content_index,
                tool_call,
                partial,
            },
        })
    }

    // ── slot bookkeeping ─────────────────────────────────────────────────

    fn open_position(&self, index: usize) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Slot::Open(draft) if draft.index() == index))
    }

    /// Finalize the draft at `pos`, returning the finished block.
    fn close(&mut self, pos: usize) -> Option<ContentBlock> {
        let slot = self.slots.get_mut(pos)?;
        let Slot::Open(draft) = slot else {
            return None;
        };
        let block = draft.clone().finish();
        *slot = Slot::Closed(block.clone());
        Some(block)
    }

    fn close_all(&mut self) {
        for pos in 0..self.slots.len() {
            let _ = self.close(pos);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
