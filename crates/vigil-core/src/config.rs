//! Configuration management for Vigil.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`VIGIL_` prefix)
//! 2. Config file (`vigil.toml`)
//! 3. Defaults

use serde::Deserialize;

use crate::error::{Result, VigilError};

/// Framework-wide settings.
#[derive(Debug, Clone, Deserialize)]
pub struct VigilConfig {
    /// Default bound for counting queries: counters stop once this many
    /// matches are confirmed.
    #[serde(default = "default_count_limit")]
    pub count_limit: u64,

    /// When true, a malformed result-row field aborts materialization
    /// instead of being skipped with a warning.
    #[serde(default)]
    pub strict: bool,

    /// Whether counters consult and update their key-value cache.
    #[serde(default = "default_true")]
    pub cache_counts: bool,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            count_limit: default_count_limit(),
            strict: false,
            cache_counts: true,
        }
    }
}

impl VigilConfig {
    /// Load configuration from `vigil.toml` and `VIGIL_` environment
    /// variables, falling back to defaults.
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("vigil").required(false))
            .add_source(config::Environment::with_prefix("VIGIL"))
            .build()
            .map_err(|e| VigilError::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| VigilError::Config(e.to_string()))
    }
}

fn default_count_limit() -> u64 {
    4
}

fn default_true() -> bool {
    true
}
