//! Settings types.

use serde::{Deserialize, Serialize};
use vtx_core::models::{ModelInfo, ThinkingBudgets, builtin_models, find_model};

use crate::errors::{Result, SettingsError};

/// Anthropic API version string Vertex expects in the request body.
pub const VERTEX_ANTHROPIC_VERSION: &str = "vertex-2023-10-16";

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east5";

/// Settings for the Vertex AI Anthropic pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VertexSettings {
    /// GCP project ID. Required before any URL can be built.
    pub project: String,
    /// Vertex AI region.
    pub region: String,
    /// Base URL override. Defaults to the regional `aiplatform` host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// `anthropic_version` sent in request bodies.
    pub anthropic_version: String,
    /// Default log filter for `vtx_core::logging::init_subscriber`.
    pub log_level: String,
    /// Model used when the caller does not pick one.
    pub default_model: String,
    /// Per-level thinking budget overrides.
    pub thinking_budgets: ThinkingBudgets,
    /// Model catalogue.
    pub models: Vec<ModelInfo>,
}

impl Default for VertexSettings {
    fn default() -> Self {
        Self {
            project: String::new(),
            region: DEFAULT_REGION.into(),
            base_url: None,
            anthropic_version: VERTEX_ANTHROPIC_VERSION.into(),
            log_level: "warn".into(),
            default_model: vtx_core::models::CLAUDE_SONNET_4_5_VERTEX.into(),
            thinking_budgets: ThinkingBudgets::default(),
            models: builtin_models(),
        }
    }
}

impl VertexSettings {
    /// Base URL of the Vertex AI endpoint.
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_owned(),
            None => format!("https://{}-aiplatform.googleapis.com", self.region),
        }
    }

    /// Streaming endpoint for `model`.
    ///
    /// Fails when no project is configured.
    pub fn stream_url(&self, model: &ModelInfo) -> Result<String> {
        if self.project.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "project is not set (settings.json `project` or VTX_PROJECT)".into(),
            ));
        }
        Ok(format!(
            "{}/v1/projects/{}/locations/{}/publishers/anthropic/models/{}:streamRawPredict",
            self.base_url(),
            self.project,
            self.region,
            model.endpoint_model_id(),
        ))
    }

    /// Look up a configured model by ID.
    pub fn model(&self, id: &str) -> Option<&ModelInfo> {
        find_model(&self.models, id)
    }

    /// The configured default model.
    pub fn default_model(&self) -> Result<&ModelInfo> {
        self.model(&self.default_model).ok_or_else(|| {
            SettingsError::InvalidValue(format!("unknown default model: {}", self.default_model))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
