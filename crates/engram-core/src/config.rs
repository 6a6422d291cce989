//! Memory subsystem configuration.

use log::warn;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Credential for the hosted memory service.
pub const ENV_API_KEY: &str = "ENGRAM_API_KEY";
/// Master enable/disable switch.
pub const ENV_ENABLED: &str = "ENGRAM_MEMORY_ENABLED";
/// Local cache capacity.
pub const ENV_MAX_ENTRIES: &str = "ENGRAM_MAX_ENTRIES";
/// Local cache retention window in days.
pub const ENV_RETENTION_DAYS: &str = "ENGRAM_RETENTION_DAYS";
/// Importance level treated as critical.
pub const ENV_IMPORTANT_THRESHOLD: &str = "ENGRAM_IMPORTANT_THRESHOLD";
/// Cross-tab context sharing toggle.
pub const ENV_CROSS_TAB: &str = "ENGRAM_CROSS_TAB";
/// Learning feature toggle.
pub const ENV_LEARNING: &str = "ENGRAM_LEARNING";

/// User-facing configuration for the memory subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Credential for the hosted memory service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Local cache capacity.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Local cache retention window in days; 0 disables the window.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_auto_cleanup")]
    pub auto_cleanup: bool,
    /// Entries at or above this importance are treated as critical.
    #[serde(default = "default_important_threshold")]
    pub important_threshold: f64,
    #[serde(default = "default_enable_cross_tab")]
    pub enable_cross_tab: bool,
    #[serde(default = "default_enable_learning")]
    pub enable_learning: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_max_entries() -> usize {
    1000
}

fn default_retention_days() -> u32 {
    30
}

fn default_auto_cleanup() -> bool {
    true
}

fn default_important_threshold() -> f64 {
    0.7
}

fn default_enable_cross_tab() -> bool {
    true
}

fn default_enable_learning() -> bool {
    true
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            api_key: None,
            max_entries: default_max_entries(),
            retention_days: default_retention_days(),
            auto_cleanup: default_auto_cleanup(),
            important_threshold: default_important_threshold(),
            enable_cross_tab: default_enable_cross_tab(),
            enable_learning: default_enable_learning(),
        }
    }
}

impl MemoryConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> MemoryConfigBuilder {
        MemoryConfigBuilder::new()
    }

    /// Config assembled from `ENGRAM_*` environment variables.
    ///
    /// Unparseable values are logged and fall back to the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = std::env::var(ENV_API_KEY).ok().filter(|key| !key.is_empty());
        if let Some(enabled) = read_bool(ENV_ENABLED) {
            config.enabled = enabled;
        }
        if let Some(max_entries) = read_parsed(ENV_MAX_ENTRIES) {
            config.max_entries = max_entries;
        }
        if let Some(retention_days) = read_parsed(ENV_RETENTION_DAYS) {
            config.retention_days = retention_days;
        }
        if let Some(threshold) = read_parsed(ENV_IMPORTANT_THRESHOLD) {
            config.important_threshold = threshold;
        }
        if let Some(cross_tab) = read_bool(ENV_CROSS_TAB) {
            config.enable_cross_tab = cross_tab;
        }
        if let Some(learning) = read_bool(ENV_LEARNING) {
            config.enable_learning = learning;
        }
        config
    }
}

/// Builder for assembling a `MemoryConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct MemoryConfigBuilder {
    config: MemoryConfig,
}

impl MemoryConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: MemoryConfig::default(),
        }
    }

    /// Enable or disable the subsystem.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Set the hosted-service credential.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    /// Set the local cache capacity.
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.config.max_entries = max_entries;
        self
    }

    /// Set the local cache retention window in days.
    pub fn retention_days(mut self, retention_days: u32) -> Self {
        self.config.retention_days = retention_days;
        self
    }

    /// Set the importance level treated as critical.
    pub fn important_threshold(mut self, threshold: f64) -> Self {
        self.config.important_threshold = threshold;
        self
    }

    /// Toggle automatic cleanup.
    pub fn auto_cleanup(mut self, auto_cleanup: bool) -> Self {
        self.config.auto_cleanup = auto_cleanup;
        self
    }

    /// Toggle cross-tab context sharing.
    pub fn enable_cross_tab(mut self, enable_cross_tab: bool) -> Self {
        self.config.enable_cross_tab = enable_cross_tab;
        self
    }

    /// Toggle learning features.
    pub fn enable_learning(mut self, enable_learning: bool) -> Self {
        self.config.enable_learning = enable_learning;
        self
    }

    /// Finalize and return the built `MemoryConfig`.
    pub fn build(self) -> MemoryConfig {
        self.config
    }
}

fn read_bool(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse_bool(&raw);
    if parsed.is_none() {
        warn!("ignoring unparseable boolean (var={name}, value={raw})");
    }
    parsed
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read_parsed<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        warn!("ignoring unparseable value (var={name}, value={raw})");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::{MemoryConfig, parse_bool};
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_documented_values() {
        let config = MemoryConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.retention_days, 30);
        assert!(config.auto_cleanup);
        assert_eq!(config.important_threshold, 0.7);
        assert!(config.enable_cross_tab);
        assert!(config.enable_learning);
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn builder_overrides_selected_fields() {
        let config = MemoryConfig::builder()
            .enabled(false)
            .api_key("k")
            .max_entries(5)
            .retention_days(1)
            .build();
        assert!(!config.enabled);
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.max_entries, 5);
        assert_eq!(config.retention_days, 1);
        assert_eq!(config.important_threshold, 0.7);
    }

    #[test]
    fn boolean_values_parse_in_common_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" ON "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
