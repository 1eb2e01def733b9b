//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`VertexSettings::default()`]
//! 2. If `~/.vtx/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `VTX_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};
use vtx_core::models::ReasoningEffort;

use crate::errors::Result;
use crate::types::VertexSettings;

/// Upper bound accepted for a thinking budget override.
const MAX_THINKING_BUDGET: u32 = 128_000;

/// Resolve the path to the settings file (`~/.vtx/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".vtx").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<VertexSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<VertexSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<VertexSettings> {
    let defaults = serde_json::to_value(VertexSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut VertexSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Recognized keys:
/// - `VTX_PROJECT`, `VTX_REGION`, `VTX_BASE_URL`, `VTX_LOG_LEVEL`, `VTX_DEFAULT_MODEL`
/// - `VTX_THINKING_BUDGET_{MINIMAL,LOW,MEDIUM,HIGH}`: integer in `1..=128000`
///
/// Empty and invalid values are ignored (invalid ones with a warning).
pub fn apply_overrides_from(settings: &mut VertexSettings, lookup: impl Fn(&str) -> Option<String>) {
    let read_string = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = read_string("VTX_PROJECT") {
        settings.project = v;
    }
    if let Some(v) = read_string("VTX_REGION") {
        settings.region = v;
    }
    if let Some(v) = read_string("VTX_BASE_URL") {
        settings.base_url = Some(v);
    }
    if let Some(v) = read_string("VTX_LOG_LEVEL") {
        settings.log_level = v;
    }
    if let Some(v) = read_string("VTX_DEFAULT_MODEL") {
        settings.default_model = v;
    }

    for effort in ReasoningEffort::ALL {
        let name = format!("VTX_THINKING_BUDGET_{}", effort.as_str().to_ascii_uppercase());
        let Some(val) = lookup(&name) else {
            continue;
        };
        match parse_u32_range(&val, 1, MAX_THINKING_BUDGET) {
            Some(budget) => *settings.thinking_budgets.slot_mut(effort) = Some(budget),
            None => warn!(key = %name, value = %val, "invalid thinking budget env var, ignoring"),
        }
    }
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
