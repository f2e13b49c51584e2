//! Bootstrap configuration loading and config-file discovery
//!
//! Configuration sources, highest priority first:
//! 1. Explicit path (command-line argument)
//! 2. `CLUES_CONFIG` environment variable
//! 3. User config file (`~/.config/clues/config.toml` or platform equivalent)
//! 4. System config file (`/etc/clues/config.toml`, Linux only)
//! 5. Built-in defaults
//!
//! A missing config file is never fatal: defaults are used and a warning is
//! logged. A config file that exists but does not parse is a configuration
//! error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CLUES_CONFIG";

/// Environment variable carrying the web-search API key
pub const SEARCH_API_KEY_ENV_VAR: &str = "CLUES_SEARCH_API_KEY";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Web-search provider configuration (optional)
    #[serde(default)]
    pub search: SearchConfig,

    /// Arbitration policy configuration (optional)
    #[serde(default)]
    pub arbitration: ArbitrationConfig,

    /// Free-text taxonomy configuration (optional)
    #[serde(default)]
    pub taxonomy: TaxonomyConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Web-search provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// API key (ENV takes priority, see [`resolve_search_api_key`])
    #[serde(default)]
    pub api_key: Option<String>,

    /// Search endpoint URL
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Per-query timeout in seconds
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,

    /// Results requested per query
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Client-side rate limit
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Per-field search configuration file (built-in table when absent)
    #[serde(default)]
    pub field_config: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_search_endpoint(),
            timeout_secs: default_search_timeout_secs(),
            max_results: default_max_results(),
            requests_per_second: default_requests_per_second(),
            field_config: None,
        }
    }
}

/// Arbitration policy settings
#[derive(Debug, Clone, Deserialize)]
pub struct ArbitrationConfig {
    /// `last-writer-wins` or `tier-precedence`
    #[serde(default = "default_policy")]
    pub policy: String,

    /// Minimum agreeing LLMs for quorum voting
    #[serde(default = "default_min_quorum")]
    pub min_llm_quorum: usize,
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            min_llm_quorum: default_min_quorum(),
        }
    }
}

/// Remarks taxonomy settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaxonomyConfig {
    /// Taxonomy TOML file (built-in taxonomy when absent)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_search_endpoint() -> String {
    "https://api.tavily.com/search".to_string()
}

fn default_search_timeout_secs() -> u64 {
    30
}

fn default_max_results() -> u32 {
    5
}

fn default_requests_per_second() -> u32 {
    5
}

fn default_policy() -> String {
    "last-writer-wins".to_string()
}

fn default_min_quorum() -> usize {
    2
}

/// Load TOML config from an explicit path
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Resolve and load configuration, falling back to defaults
///
/// An explicit path that does not exist is an error; a discovered path that
/// fails to parse is an error; no file at all yields defaults.
pub fn load_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        info!(path = %path.display(), "Loading config from explicit path");
        return load_toml_config(path);
    }

    match locate_config_file() {
        Some(path) => {
            info!(path = %path.display(), "Loading config");
            load_toml_config(&path)
        }
        None => {
            warn!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Find the config file per the priority order in the module docs
pub fn locate_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!(path = %path.display(), "{} points at a missing file", CONFIG_ENV_VAR);
    }

    if let Some(user_config) = dirs::config_dir().map(|d| d.join("clues").join("config.toml")) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/clues/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolve the web-search API key
///
/// **Priority:** ENV → TOML
pub fn resolve_search_api_key(toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var(SEARCH_API_KEY_ENV_VAR).ok();
    let toml_key = toml_config.search.api_key.as_ref();

    let env_valid = env_key.as_deref().map(is_valid_key).unwrap_or(false);
    let toml_valid = toml_key.map(|k| is_valid_key(k)).unwrap_or(false);

    if env_valid && toml_valid {
        warn!("Search API key found in both environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        if is_valid_key(&key) {
            info!("Search API key loaded from environment variable");
            return Ok(key);
        }
    }

    if let Some(key) = toml_key {
        if is_valid_key(key) {
            info!("Search API key loaded from TOML config");
            return Ok(key.clone());
        }
    }

    Err(Error::Config(format!(
        "Search API key not configured. Set {} or [search] api_key in the config file",
        SEARCH_API_KEY_ENV_VAR
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.search.timeout_secs, 30);
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.arbitration.policy, "last-writer-wins");
        assert_eq!(config.arbitration.min_llm_quorum, 2);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [search]
            timeout_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.search.timeout_secs, 10);
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }
}
