//! # Model Types
//!
//! Registry entries for the models the pipeline can target, plus the
//! reasoning-effort vocabulary and its thinking-token budgets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::messages::ModelIdentity;

/// Provider name for Anthropic models served through Vertex AI.
pub const VERTEX_ANTHROPIC_PROVIDER: &str = "vertex-anthropic";

/// Wire API name for the Vertex `:streamRawPredict` Anthropic surface.
pub const VERTEX_ANTHROPIC_API: &str = "vertex-anthropic-api";

/// Claude Sonnet 4.5 on Vertex.
pub const CLAUDE_SONNET_4_5_VERTEX: &str = "claude-sonnet-4-5@20250929";

// ─────────────────────────────────────────────────────────────────────────────
// Model info
// ─────────────────────────────────────────────────────────────────────────────

/// Input modality a model accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Text input.
    Text,
    /// Image input.
    Image,
}

/// Per-million-token prices in USD.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCost {
    /// Uncached input.
    pub input: f64,
    /// Output.
    pub output: f64,
    /// Cache reads.
    pub cache_read: f64,
    /// Cache writes.
    pub cache_write: f64,
}

/// A model registry entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Model ID recorded on produced turns.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Provider that serves this model.
    pub provider: String,
    /// Wire API used to reach it.
    pub api: String,
    /// Whether the model supports extended thinking.
    pub reasoning: bool,
    /// Accepted input modalities.
    pub input: Vec<Modality>,
    /// Prices per million tokens.
    pub cost: ModelCost,
    /// Context window size in tokens.
    pub context_window: u64,
    /// Maximum output tokens.
    pub max_tokens: u64,
    /// Model ID used in the Vertex endpoint path when it differs from `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex_model_id: Option<String>,
}

impl ModelInfo {
    /// The identity stamped on turns produced by this model.
    #[must_use]
    pub fn identity(&self) -> ModelIdentity {
        ModelIdentity::new(&self.provider, &self.api, &self.id)
    }

    /// Model ID to put in the endpoint path.
    #[must_use]
    pub fn endpoint_model_id(&self) -> &str {
        self.vertex_model_id.as_deref().unwrap_or(&self.id)
    }
}

/// Claude Sonnet 4.5 served through Vertex AI.
#[must_use]
pub fn claude_sonnet_4_5_vertex() -> ModelInfo {
    ModelInfo {
        id: CLAUDE_SONNET_4_5_VERTEX.into(),
        name: "Claude Sonnet 4.5 (Vertex)".into(),
        provider: VERTEX_ANTHROPIC_PROVIDER.into(),
        api: VERTEX_ANTHROPIC_API.into(),
        reasoning: true,
        input: vec![Modality::Text, Modality::Image],
        cost: ModelCost {
            input: 3.0,
            output: 15.0,
            cache_read: 0.3,
            cache_write: 3.75,
        },
        context_window: 200_000,
        max_tokens: 64_000,
        vertex_model_id: None,
    }
}

/// Built-in model catalogue.
#[must_use]
pub fn builtin_models() -> Vec<ModelInfo> {
    vec![claude_sonnet_4_5_vertex()]
}

/// Look up a model by ID in `models`.
#[must_use]
pub fn find_model<'a>(models: &'a [ModelInfo], id: &str) -> Option<&'a ModelInfo> {
    models.iter().find(|m| m.id == id)
}

// ─────────────────────────────────────────────────────────────────────────────
// Reasoning effort
// ─────────────────────────────────────────────────────────────────────────────

/// Requested reasoning effort.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    /// Smallest budget.
    Minimal,
    /// Low budget.
    Low,
    /// Medium budget.
    Medium,
    /// High budget.
    High,
}

impl ReasoningEffort {
    /// All levels, smallest first.
    pub const ALL: [Self; 4] = [Self::Minimal, Self::Low, Self::Medium, Self::High];

    /// Lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Thinking budget used when no override is configured.
    #[must_use]
    pub fn default_budget(self) -> u32 {
        match self {
            Self::Minimal => 1024,
            Self::Low => 4096,
            Self::Medium => 10240,
            Self::High => 20480,
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown effort label.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown reasoning effort: {0}")]
pub struct UnknownEffort(pub String);

impl FromStr for ReasoningEffort {
    type Err = UnknownEffort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(UnknownEffort(s.to_owned())),
        }
    }
}

/// Per-level thinking budget overrides. Unset levels use the defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinkingBudgets {
    /// Override for `minimal`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimal: Option<u32>,
    /// Override for `low`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<u32>,
    /// Override for `medium`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<u32>,
    /// Override for `high`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<u32>,
}

impl ThinkingBudgets {
    /// The override slot for `effort`.
    pub fn slot_mut(&mut self, effort: ReasoningEffort) -> &mut Option<u32> {
        match effort {
            ReasoningEffort::Minimal => &mut self.minimal,
            ReasoningEffort::Low => &mut self.low,
            ReasoningEffort::Medium => &mut self.medium,
            ReasoningEffort::High => &mut self.high,
        }
    }

    /// Budget for `effort`: the override if set, else the default.
    #[must_use]
    pub fn resolve(&self, effort: ReasoningEffort) -> u32 {
        let over = match effort {
            ReasoningEffort::Minimal => self.minimal,
            ReasoningEffort::Low => self.low,
            ReasoningEffort::Medium => self.medium,
            ReasoningEffort::High => self.high,
        };
        over.unwrap_or_else(|| effort.default_budget())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budgets() {
        let budgets = ThinkingBudgets::default();
        let resolved: Vec<u32> = ReasoningEffort::ALL.iter().map(|e| budgets.resolve(*e)).collect();
        assert_eq!(resolved, vec![1024, 4096, 10240, 20480]);
    }

    #[test]
    fn override_one_level() {
        let budgets = ThinkingBudgets {
            medium: Some(8000),
            ..ThinkingBudgets::default()
        };
        assert_eq!(budgets.resolve(ReasoningEffort::Medium), 8000);
        assert_eq!(budgets.resolve(ReasoningEffort::High), 20480);
    }

    #[test]
    fn parse_effort() {
        assert_eq!("HIGH".parse::<ReasoningEffort>(), Ok(ReasoningEffort::High));
        assert_eq!(" minimal ".parse::<ReasoningEffort>(), Ok(ReasoningEffort::Minimal));
        assert!("extreme".parse::<ReasoningEffort>().is_err());
        assert_eq!(ReasoningEffort::Low.to_string(), "low");
    }

    #[test]
    fn sonnet_entry() {
        let model = claude_sonnet_4_5_vertex();
        assert!(model.reasoning);
        assert!(model.input.contains(&Modality::Image));
        assert_eq!(model.max_tokens, 64_000);
        assert_eq!(model.endpoint_model_id(), CLAUDE_SONNET_4_5_VERTEX);
        assert_eq!(model.identity().provider, VERTEX_ANTHROPIC_PROVIDER);
    }

    #[test]
    fn vertex_model_id_override() {
        let mut model = claude_sonnet_4_5_vertex();
        model.vertex_model_id = Some("claude-sonnet-4-5-v2".into());
        assert_eq!(model.endpoint_model_id(), "claude-sonnet-4-5-v2");
    }

    #[test]
    fn find_in_catalogue() {
        let models = builtin_models();
        assert!(find_model(&models, CLAUDE_SONNET_4_5_VERTEX).is_some());
        assert!(find_model(&models, "gpt-5").is_none());
    }

    #[test]
    fn model_info_deserializes_camel_case() {
        let json = serde_json::to_value(claude_sonnet_4_5_vertex()).unwrap();
        assert_eq!(json["contextWindow"], 200_000);
        assert_eq!(json["cost"]["cacheWrite"], 3.75);
        let back: ModelInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, claude_sonnet_4_5_vertex());
    }
}
