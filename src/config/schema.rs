//! Configuration schema for querykit
//!
//! Configuration is stored at `~/.config/querykit/config.toml`

use crate::gate::GatePolicy;
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Query cache defaults
    pub query: QueryDefaults,

    /// Energy gate settings
    pub gate: GateConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Defaults applied to every query before per-call config
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDefaults {
    /// How long a fetched entry counts as fresh, in milliseconds (0 = always refetch)
    pub stale_time_ms: u64,

    /// Whether queries run unless a caller disables them
    pub enabled: bool,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            stale_time_ms: 0,
            enabled: true,
        }
    }
}

/// Energy gate configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// What happens to a wait created while energy is already positive
    pub policy: GatePolicy,
}
