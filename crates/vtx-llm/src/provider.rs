//! # Provider Types
//!
//! Error type, per-request options, and the access-token seam shared by the
//! Vertex pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vtx_core::models::{ReasoningEffort, ThinkingBudgets};
use vtx_settings::VertexSettings;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while building a request or consuming a stream.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request or body read failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Access token could not be obtained.
    #[error("Auth error: {message}")]
    Auth {
        /// Error description.
        message: String,
    },

    /// Settings are incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] vtx_settings::SettingsError),

    /// Backend answered with a non-2xx status.
    #[error("Vertex AI error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The byte stream failed mid-read.
    #[error("Stream error: {message}")]
    Stream {
        /// Error description.
        message: String,
    },

    /// Stream was cancelled.
    #[error("Request was aborted")]
    Cancelled,

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl ProviderError {
    /// Error category string for diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) | Self::Stream { .. } => "network",
            Self::Json(_) => "parse",
            Self::Auth { .. } => "auth",
            Self::Config(_) => "config",
            Self::Api { .. } => "api",
            Self::Cancelled => "cancelled",
            Self::Other { .. } => "unknown",
        }
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(e: std::io::Error) -> Self {
        Self::Stream {
            message: e.to_string(),
        }
    }
}

/// Options for one streamed turn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamOptions {
    /// Maximum tokens to generate. Defaults to a third of the model maximum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,

    /// Requested reasoning effort. `None` disables extended thinking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningEffort>,

    /// Per-level budget overrides.
    #[serde(default)]
    pub thinking_budgets: ThinkingBudgets,
}

impl StreamOptions {
    /// Options carrying the configured budget overrides.
    pub fn from_settings(settings: &VertexSettings) -> Self {
        Self {
            thinking_budgets: settings.thinking_budgets,
            ..Self::default()
        }
    }

    /// Set the reasoning effort.
    #[must_use]
    pub fn with_reasoning(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning = Some(effort);
        self
    }

    /// Set the output token limit.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Source of OAuth bearer tokens for Vertex AI.
///
/// Token acquisition (gcloud CLI, metadata server, service account) lives
/// outside this crate.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// A currently valid bearer token.
    async fn access_token(&self) -> ProviderResult<String>;
}

/// A fixed token, for tests and short-lived tools.
#[derive(Clone, Debug)]
pub struct StaticAccessToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticAccessToken {
    async fn access_token(&self) -> ProviderResult<String> {
        if self.0.trim().is_empty() {
            return Err(ProviderError::Auth {
                message: "empty access token".into(),
            });
        }
        Ok(self.0.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
