//! # vtx-settings
//!
//! Configuration for the Vertex AI Anthropic pipeline.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`VertexSettings::default()`]
//! 2. **User file**: `~/.vtx/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `VTX_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, load_file_layer, load_settings,
    load_settings_from_path, settings_path,
};
pub use types::{DEFAULT_REGION, VERTEX_ANTHROPIC_VERSION, VertexSettings};
