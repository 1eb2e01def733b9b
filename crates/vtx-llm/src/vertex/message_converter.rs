//! # Message Converter
//!
//! Converts a normalized conversation into the Anthropic wire format.
//! Handles:
//! - User text and image parts (blank text and empty part lists are dropped)
//! - Assistant blocks: signed thinking stays thinking, unsigned thinking
//!   becomes text, blank text is skipped, turns with no parts are omitted
//! - Consecutive tool results merged into one user message
//! - A cache breakpoint on the last part of a trailing user message
//! - Tool definitions with a complete `object` input schema

use serde_json::{Value, json};
use vtx_core::content::{ContentBlock, ContentPart};
use vtx_core::messages::{Message, ModelIdentity, ToolResultMessage, UserMessageContent};
use vtx_core::tools::Tool;

use super::types::{
    AnthropicTool, CacheControl, SystemPromptBlock, WireMessage, image_block, text_block,
    thinking_block, tool_result_block, tool_use_block,
};
use crate::id_remapping::normalize_anthropic_tool_call_id;
use crate::transform::normalize_history;

/// Placeholder text for a tool result that carries only images.
pub const IMAGE_ONLY_RESULT_TEXT: &str = "(see attached image)";

// ─────────────────────────────────────────────────────────────────────────────
// Message conversion
// ─────────────────────────────────────────────────────────────────────────────

/// Normalize `messages` for `target` and convert them to wire messages.
pub fn convert_messages(messages: &[Message], target: &ModelIdentity) -> Vec<WireMessage> {
    let normalized = normalize_history(messages, target, normalize_anthropic_tool_call_id);
    let mut params = encode_messages(&normalized);
    apply_cache_breakpoint(&mut params);
    params
}

fn encode_messages(messages: &[Message]) -> Vec<WireMessage> {
    let mut params = Vec::with_capacity(messages.len());
    let mut iter = messages.iter().peekable();

    while let Some(msg) = iter.next() {
        match msg {
            Message::User { content, .. } => {
                if let Some(param) = convert_user_message(content) {
                    params.push(param);
                }
            }
            Message::Assistant(turn) => {
                let blocks: Vec<Value> = turn.content.iter().filter_map(convert_assistant_block).collect();
                if !blocks.is_empty() {
                    params.push(WireMessage::assistant(Value::Array(blocks)));
                }
            }
            Message::ToolResult(result) => {
                let mut results = vec![convert_tool_result(result)];
                while let Some(Message::ToolResult(next)) = iter.peek() {
                    results.push(convert_tool_result(next));
                    let _ = iter.next();
                }
                params.push(WireMessage::user(Value::Array(results)));
            }
        }
    }

    params
}

fn convert_user_message(content: &UserMessageContent) -> Option<WireMessage> {
    match content {
        UserMessageContent::Text(text) => {
            (!text.trim().is_empty()).then(|| WireMessage::user(Value::String(text.clone())))
        }
        UserMessageContent::Parts(parts) => {
            let blocks: Vec<Value> = parts.iter().map(convert_content_part).collect();
            (!blocks.is_empty()).then(|| WireMessage::user(Value::Array(blocks)))
        }
    }
}

fn convert_content_part(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text { text } => text_block(text),
        ContentPart::Image { data, mime_type } => image_block(data, mime_type),
    }
}

fn convert_assistant_block(block: &ContentBlock) -> Option<Value> {
    match block {
        ContentBlock::Text { text } => (!text.trim().is_empty()).then(|| text_block(text)),
        ContentBlock::Thinking { thinking, signature } => {
            if thinking.trim().is_empty() {
                return None;
            }
            match signature.as_deref() {
                Some(sig) if !sig.is_empty() => Some(thinking_block(thinking, sig)),
                _ => Some(text_block(thinking)),
            }
        }
        ContentBlock::ToolCall(call) => Some(tool_use_block(&call.id, &call.name, &call.arguments)),
    }
}

fn convert_tool_result(result: &ToolResultMessage) -> Value {
    tool_result_block(
        &result.tool_call_id,
        convert_result_content(&result.content),
        result.is_error,
    )
}

/// Tool result content: a newline-joined string when there are no images,
/// otherwise a part list (with a placeholder text part if none is present).
pub fn convert_result_content(parts: &[ContentPart]) -> Value {
    if !parts.iter().any(ContentPart::is_image) {
        let text = parts
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("\n");
        return Value::String(text);
    }

    let mut blocks: Vec<Value> = parts.iter().map(convert_content_part).collect();
    if !parts.iter().any(ContentPart::is_text) {
        blocks.insert(0, text_block(IMAGE_ONLY_RESULT_TEXT));
    }
    Value::Array(blocks)
}

fn apply_cache_breakpoint(params: &mut [WireMessage]) {
    let Some(last) = params.last_mut() else {
        return;
    };
    if last.role != "user" {
        return;
    }
    if let Some(block) = last.content.as_array_mut().and_then(|blocks| blocks.last_mut()) {
        block["cache_control"] = json!(CacheControl::ephemeral());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tools and system prompt
// ─────────────────────────────────────────────────────────────────────────────

/// Convert tool definitions.
pub fn convert_tools(tools: &[Tool]) -> Vec<AnthropicTool> {
    tools
        .iter()
        .map(|tool| AnthropicTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: json!({
                "type": "object",
                "properties": tool.parameters.properties.clone().unwrap_or_default(),
                "required": tool.parameters.required.clone().unwrap_or_default(),
            }),
        })
        .collect()
}

/// The system prompt as one cached text block.
pub fn build_system_prompt(system_prompt: Option<&str>) -> Option<Vec<SystemPromptBlock>> {
    system_prompt.map(|text| vec![SystemPromptBlock::text_cached(text)])
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
