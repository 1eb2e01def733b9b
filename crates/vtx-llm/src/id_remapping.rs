//! # Tool Call ID Remapping
//!
//! Tool call IDs minted by another backend may not satisfy Anthropic's
//! `^[a-zA-Z0-9_-]{1,64}$` rule. During normalization, foreign IDs go through
//! an ID normalizer; every rewrite is recorded so the matching tool results
//! can follow.

use std::collections::HashMap;

/// Longest tool call ID Anthropic accepts.
pub const ANTHROPIC_MAX_ID_LEN: usize = 64;

/// Rewrites a tool call ID into a form the target backend accepts.
pub type IdNormalizer = fn(&str) -> String;

/// Replace characters outside `[A-Za-z0-9_-]` with `_` and cap at 64 chars.
pub fn normalize_anthropic_tool_call_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .take(ANTHROPIC_MAX_ID_LEN)
        .collect()
}

/// Record of IDs rewritten during one normalization pass.
#[derive(Clone, Debug, Default)]
pub struct IdRemap {
    mapping: HashMap<String, String>,
}

impl IdRemap {
    /// Create an empty remap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `normalizer` to `id`, recording the rewrite if it changed.
    pub fn normalize(&mut self, id: &str, normalizer: IdNormalizer) -> String {
        let normalized = normalizer(id);
        if normalized != id {
            let _ = self.mapping.insert(id.to_owned(), normalized.clone());
        }
        normalized
    }

    /// The rewritten ID, or `id` unchanged.
    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.mapping.get(id).map_or(id, String::as_str)
    }

    /// Number of recorded rewrites.
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Whether nothing was rewritten.
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn replaces_disallowed_chars() {
        assert_eq!(normalize_anthropic_tool_call_id("weird id!!"), "weird_id__");
        assert_eq!(normalize_anthropic_tool_call_id("call|abc.1"), "call_abc_1");
    }

    #[test]
    fn keeps_valid_ids() {
        assert_eq!(normalize_anthropic_tool_call_id("toolu_01-AbC"), "toolu_01-AbC");
    }

    #[test]
    fn truncates_to_64() {
        let long = "a".repeat(100);
        assert_eq!(normalize_anthropic_tool_call_id(&long).len(), 64);
    }

    #[test]
    fn non_ascii_is_one_underscore_per_char() {
        assert_eq!(normalize_anthropic_tool_call_id("é1"), "_1");
    }

    #[test]
    fn remap_records_only_changes() {
        let mut remap = IdRemap::new();
        assert_eq!(remap.normalize("ok_id", normalize_anthropic_tool_call_id), "ok_id");
        assert!(remap.is_empty());
        assert_eq!(remap.normalize("bad id", normalize_anthropic_tool_call_id), "bad_id");
        assert_eq!(remap.len(), 1);
        assert_eq!(remap.resolve("bad id"), "bad_id");
        assert_eq!(remap.resolve("unknown"), "unknown");
    }

    proptest! {
        #[test]
        fn output_always_matches_anthropic_pattern(id in ".{0,200}") {
            let out = normalize_anthropic_tool_call_id(&id);
            prop_assert!(out.chars().count() <= ANTHROPIC_MAX_ID_LEN);
            prop_assert!(out.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
            prop_assert_eq!(normalize_anthropic_tool_call_id(&out), out.clone());
        }
    }
}
