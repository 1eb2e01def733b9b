//! # History Normalizer
//!
//! Rewrites a conversation so a strict backend accepts it on replay.
//!
//! Pass 1 rewrites content per message:
//! - thinking from another model degrades to text (empty thinking is dropped);
//!   signed thinking from the target model is kept verbatim
//! - tool call IDs from another model go through the ID normalizer, and
//!   results that answer a rewritten call follow the new ID
//!
//! Pass 2 repairs tool call pairing:
//! - before an assistant or user message, calls from the previous assistant
//!   turn that never got a result receive a synthetic error result
//! - assistant turns that ended in `error` or `aborted` are dropped
//! - calls still pending at the end of history are flushed the same way

use std::collections::HashSet;

use tracing::debug;
use vtx_core::content::{ContentBlock, ContentPart, ToolCall};
use vtx_core::messages::{AssistantMessage, Message, ModelIdentity, ToolResultMessage};

use crate::id_remapping::{IdNormalizer, IdRemap};

/// Text of the result injected for a tool call that never got one.
pub const MISSING_TOOL_RESULT_TEXT: &str = "No result provided";

/// Normalize `messages` for replay against `target`.
///
/// Pure: the same input always yields the same output.
pub fn normalize_history(
    messages: &[Message],
    target: &ModelIdentity,
    id_normalizer: IdNormalizer,
) -> Vec<Message> {
    let transformed = transform_content(messages, target, id_normalizer);
    repair_tool_pairing(transformed)
}

// ─────────────────────────────────────────────────────────────────────────────
// Pass 1: content
// ─────────────────────────────────────────────────────────────────────────────

fn transform_content(
    messages: &[Message],
    target: &ModelIdentity,
    id_normalizer: IdNormalizer,
) -> Vec<Message> {
    let mut remap = IdRemap::new();

    let out: Vec<Message> = messages
        .iter()
        .map(|msg| match msg {
            Message::User { .. } => msg.clone(),
            Message::ToolResult(result) => {
                let mut result = result.clone();
                result.tool_call_id = remap.resolve(&result.tool_call_id).to_owned();
                Message::ToolResult(result)
            }
            Message::Assistant(turn) => {
                let same_origin = turn.is_same_origin(target);
                let content = turn
                    .content
                    .iter()
                    .filter_map(|block| transform_block(block, same_origin, &mut remap, id_normalizer))
                    .collect();
                Message::Assistant(AssistantMessage {
                    content,
                    ..turn.clone()
                })
            }
        })
        .collect();

    if !remap.is_empty() {
        debug!(remapped = remap.len(), "normalized foreign tool call ids");
    }
    out
}

fn transform_block(
    block: &ContentBlock,
    same_origin: bool,
    remap: &mut IdRemap,
    id_normalizer: IdNormalizer,
) -> Option<ContentBlock> {
    match block {
        ContentBlock::Thinking { thinking, signature } => {
            if same_origin && signature.as_deref().is_some_and(|s| !s.is_empty()) {
                return Some(block.clone());
            }
            if thinking.trim().is_empty() {
                return None;
            }
            if same_origin {
                return Some(block.clone());
            }
            Some(ContentBlock::text(thinking.clone()))
        }
        ContentBlock::Text { .. } => Some(block.clone()),
        ContentBlock::ToolCall(call) => {
            if same_origin {
                return Some(block.clone());
            }
            Some(ContentBlock::ToolCall(ToolCall {
                id: remap.normalize(&call.id, id_normalizer),
                ..call.clone()
            }))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pass 2: tool call pairing
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct PendingCalls {
    calls: Vec<ToolCall>,
    satisfied: HashSet<String>,
    timestamp: i64,
}

impl PendingCalls {
    fn flush_into(&mut self, out: &mut Vec<Message>) {
        for call in self.calls.drain(..) {
            if self.satisfied.contains(&call.id) {
                continue;
            }
            debug!(tool_call_id = %call.id, tool_name = %call.name, "injecting missing tool result");
            out.push(Message::ToolResult(ToolResultMessage {
                tool_call_id: call.id,
                tool_name: call.name,
                content: vec![ContentPart::text(MISSING_TOOL_RESULT_TEXT)],
                is_error: true,
                timestamp: self.timestamp,
            }));
        }
        self.satisfied.clear();
    }
}

fn repair_tool_pairing(messages: Vec<Message>) -> Vec<Message> {
    let mut out = Vec::with_capacity(messages.len());
    let mut pending = PendingCalls::default();

    for msg in messages {
        match msg {
            Message::Assistant(turn) => {
                pending.flush_into(&mut out);
                if turn.stop_reason.is_incomplete() {
                    debug!(stop_reason = ?turn.stop_reason, "dropping incomplete assistant turn");
                    continue;
                }
                pending.calls = turn.tool_calls().cloned().collect();
                pending.timestamp = turn.timestamp;
                out.push(Message::Assistant(turn));
            }
            Message::ToolResult(result) => {
                let _ = pending.satisfied.insert(result.tool_call_id.clone());
                out.push(Message::ToolResult(result));
            }
            Message::User { .. } => {
                pending.flush_into(&mut out);
                out.push(msg);
            }
        }
    }
    pending.flush_into(&mut out);
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id_remapping::normalize_anthropic_tool_call_id;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use serde_json::Map;
    use vtx_core::messages::StopReason;

    fn target() -> ModelIdentity {
        ModelIdentity::new("vertex-anthropic", "vertex-anthropic-api", "claude-sonnet-4-5@20250929")
    }

    fn other() -> ModelIdentity {
        ModelIdentity::new("openai", "openai-responses", "gpt-5")
    }

    fn assistant(origin: &ModelIdentity, content: Vec<ContentBlock>, stop: StopReason) -> Message {
        let mut turn = AssistantMessage::empty(origin);
        turn.content = content;
        turn.stop_reason = stop;
        turn.timestamp = 7;
        Message::Assistant(turn)
    }

    fn call(id: &str) -> ContentBlock {
        ContentBlock::tool_call(id, "bash", Map::new())
    }

    fn result(id: &str) -> Message {
        Message::tool_result(id, "bash", "ok", false)
    }

    fn normalize(history: &[Message]) -> Vec<Message> {
        normalize_history(history, &target(), normalize_anthropic_tool_call_id)
    }

    // ── pass 1 ───────────────────────────────────────────────────────────

    #[test]
    fn foreign_thinking_becomes_text() {
        let out = normalize(&[assistant(
            &other(),
            vec![ContentBlock::signed_thinking("plan", "sig"), ContentBlock::thinking("  ")],
            StopReason::Stop,
        )]);
        let turn = out[0].as_assistant().unwrap();
        assert_eq!(turn.content, vec![ContentBlock::text("plan")]);
    }

    #[test]
    fn same_origin_signed_thinking_is_verbatim() {
        let block = ContentBlock::signed_thinking("", "sig");
        let out = normalize(&[assistant(&target(), vec![block.clone()], StopReason::Stop)]);
        assert_eq!(out[0].as_assistant().unwrap().content, vec![block]);
    }

    #[test]
    fn same_origin_unsigned_thinking_kept_unless_blank() {
        let out = normalize(&[assistant(
            &target(),
            vec![ContentBlock::thinking("idea"), ContentBlock::thinking("")],
            StopReason::Stop,
        )]);
        assert_eq!(out[0].as_assistant().unwrap().content, vec![ContentBlock::thinking("idea")]);
    }

    #[test]
    fn weird_foreign_id_is_remapped_with_its_result() {
        let out = normalize(&[
            Message::user("go"),
            assistant(&other(), vec![call("weird id!!")], StopReason::ToolUse),
            result("weird id!!"),
        ]);
        assert_eq!(out.len(), 3);
        let turn = out[1].as_assistant().unwrap();
        assert_eq!(turn.tool_calls().next().unwrap().id, "weird_id__");
        assert_eq!(out[2].as_tool_result().unwrap().tool_call_id, "weird_id__");
    }

    #[test]
    fn same_origin_ids_untouched() {
        let out = normalize(&[
            assistant(&target(), vec![call("weird id!!")], StopReason::ToolUse),
            result("weird id!!"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].as_tool_result().unwrap().tool_call_id, "weird id!!");
    }

    // ── pass 2 ───────────────────────────────────────────────────────────

    #[test]
    fn orphan_before_user_gets_synthetic_result() {
        let out = normalize(&[
            assistant(&target(), vec![call("a"), call("b")], StopReason::ToolUse),
            result("b"),
            Message::user("next"),
        ]);
        assert_eq!(out.len(), 4);
        assert_eq!(out[1].as_tool_result().unwrap().tool_call_id, "b");
        let synthetic = out[2].as_tool_result().unwrap();
        assert_eq!(synthetic.tool_call_id, "a");
        assert_eq!(synthetic.tool_name, "bash");
        assert!(synthetic.is_error);
        assert_eq!(synthetic.content, vec![ContentPart::text(MISSING_TOOL_RESULT_TEXT)]);
        assert!(out[3].is_user());
    }

    #[test]
    fn orphans_flushed_in_call_order_before_next_assistant() {
        let out = normalize(&[
            assistant(&target(), vec![call("x"), call("y")], StopReason::ToolUse),
            assistant(&target(), vec![ContentBlock::text("hi")], StopReason::Stop),
        ]);
        let ids: Vec<&str> = out
            .iter()
            .filter_map(Message::as_tool_result)
            .map(|r| r.tool_call_id.as_str())
            .collect();
        assert_eq!(ids, vec!["x", "y"]);
        assert!(out[3].is_assistant());
    }

    #[test]
    fn pending_calls_flushed_at_end_of_history() {
        let out = normalize(&[assistant(&target(), vec![call("t1")], StopReason::ToolUse)]);
        assert_eq!(out.len(), 2);
        assert_matches!(&out[1], Message::ToolResult(r) if r.tool_call_id == "t1" && r.is_error);
    }

    #[test]
    fn error_and_aborted_turns_dropped() {
        let out = normalize(&[
            Message::user("q"),
            assistant(&target(), vec![call("e1")], StopReason::Error),
            assistant(&target(), vec![ContentBlock::text("partial")], StopReason::Aborted),
            Message::user("again"),
        ]);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(Message::is_user));
    }

    #[test]
    fn output_is_deterministic() {
        let history = vec![
            assistant(&other(), vec![call("a.b")], StopReason::ToolUse),
            Message::user("x"),
        ];
        assert_eq!(normalize(&history), normalize(&history));
    }

    // ── properties ───────────────────────────────────────────────────────

    #[derive(Clone, Debug)]
    enum Step {
        User,
        Assistant {
            foreign: bool,
            stop: StopReason,
            calls: Vec<u8>,
            signed: bool,
        },
        Result(u8),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            Just(Step::User),
            (
                any::<bool>(),
                prop_oneof![
                    Just(StopReason::Stop),
                    Just(StopReason::ToolUse),
                    Just(StopReason::Error),
                    Just(StopReason::Aborted),
                ],
                proptest::collection::vec(0u8..6, 0..3),
                any::<bool>(),
            )
                .prop_map(|(foreign, stop, calls, signed)| Step::Assistant {
                    foreign,
                    stop,
                    calls,
                    signed,
                }),
            (0u8..6).prop_map(Step::Result),
        ]
    }

    fn call_id(n: u8) -> String {
        format!("id {n}")
    }

    fn build(steps: &[Step]) -> Vec<Message> {
        steps
            .iter()
            .map(|s| match s {
                Step::User => Message::user("u"),
                Step::Result(n) => result(&call_id(*n)),
                Step::Assistant {
                    foreign,
                    stop,
                    calls,
                    signed,
                } => {
                    let origin = if *foreign { other() } else { target() };
                    let mut content = Vec::new();
                    if *signed {
                        content.push(ContentBlock::signed_thinking("t", "sig"));
                    }
                    content.extend(calls.iter().map(|n| call(&call_id(*n))));
                    assistant(&origin, content, *stop)
                }
            })
            .collect()
    }

    fn history() -> impl Strategy<Value = Vec<Step>> {
        proptest::collection::vec(step(), 0..20)
    }

    proptest! {
        #[test]
        fn every_call_is_answered_before_next_turn(steps in history()) {
            let out = normalize(&build(&steps));
            let mut open: Vec<String> = Vec::new();
            for msg in &out {
                match msg {
                    Message::Assistant(turn) => {
                        prop_assert!(open.is_empty(), "unanswered before assistant: {:?}", open);
                        open = turn.tool_calls().map(|c| c.id.clone()).collect();
                    }
                    Message::ToolResult(r) => open.retain(|id| id != &r.tool_call_id),
                    Message::User { .. } => {
                        prop_assert!(open.is_empty(), "unanswered before user: {:?}", open);
                    }
                }
            }
            prop_assert!(open.is_empty());
        }

        #[test]
        fn no_incomplete_turn_survives(steps in history()) {
            let out = normalize(&build(&steps));
            prop_assert!(out
                .iter()
                .filter_map(Message::as_assistant)
                .all(|t| !t.stop_reason.is_incomplete()));
        }

        #[test]
        fn signed_thinking_survives_only_for_same_origin(steps in history()) {
            let input = build(&steps);
            let out = normalize(&input);
            let kept_in: Vec<&AssistantMessage> = input
                .iter()
                .filter_map(Message::as_assistant)
                .filter(|t| !t.stop_reason.is_incomplete())
                .collect();
            let kept_out: Vec<&AssistantMessage> = out.iter().filter_map(Message::as_assistant).collect();
            prop_assert_eq!(kept_in.len(), kept_out.len());

            let signed = ContentBlock::signed_thinking("t", "sig");
            for (before, after) in kept_in.iter().zip(&kept_out) {
                let had = before.content.contains(&signed);
                let has = after.content.contains(&signed);
                if before.is_same_origin(&target()) {
                    prop_assert_eq!(had, has);
                } else {
                    prop_assert!(!has);
                    prop_assert_eq!(had, after.content.first() == Some(&ContentBlock::text("t")));
                }
            }
        }

        #[test]
        fn results_follow_remapped_ids(steps in history()) {
            let input = build(&steps);
            let out = normalize(&input);

            let mut rewritten: HashSet<String> = HashSet::new();
            let mut expected = Vec::new();
            for msg in &input {
                match msg {
                    Message::Assistant(turn) if !turn.is_same_origin(&target()) => {
                        rewritten.extend(turn.tool_calls().map(|c| c.id.clone()));
                    }
                    Message::ToolResult(r) if rewritten.contains(&r.tool_call_id) => {
                        expected.push(normalize_anthropic_tool_call_id(&r.tool_call_id));
                    }
                    Message::ToolResult(r) => expected.push(r.tool_call_id.clone()),
                    _ => {}
                }
            }
            let actual: Vec<String> = out
                .iter()
                .filter_map(Message::as_tool_result)
                .filter(|r| !r.is_error)
                .map(|r| r.tool_call_id.clone())
                .collect();
            prop_assert_eq!(actual, expected);

            for turn in out.iter().filter_map(Message::as_assistant) {
                if !turn.is_same_origin(&target()) {
                    for c in turn.tool_calls() {
                        prop_assert_eq!(normalize_anthropic_tool_call_id(&c.id), c.id.clone());
                    }
                }
            }
        }
    }
}
