//! Unit tests for configuration loading and graceful degradation
//!
//! Covers:
//! - Missing TOML files SHALL NOT cause termination
//! - Priority order ENV → TOML for the search API key
//! - Explicit config path handling
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate CLUES_CONFIG or CLUES_SEARCH_API_KEY are marked with
//! #[serial] to ensure they run sequentially, not in parallel.

use clues_common::config::{
    load_or_default, load_toml_config, resolve_search_api_key, TomlConfig, CONFIG_ENV_VAR,
    SEARCH_API_KEY_ENV_VAR,
};
use clues_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"
        [logging]
        level = "debug"

        [search]
        api_key = "tvly-test"
        timeout_secs = 12
        max_results = 3

        [arbitration]
        policy = "tier-precedence"
        min_llm_quorum = 3
        "#,
    );

    let config = load_toml_config(file.path()).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.search.api_key.as_deref(), Some("tvly-test"));
    assert_eq!(config.search.timeout_secs, 12);
    assert_eq!(config.search.max_results, 3);
    assert_eq!(config.arbitration.policy, "tier-precedence");
    assert_eq!(config.arbitration.min_llm_quorum, 3);
}

#[test]
fn test_malformed_config_is_config_error() {
    let file = write_config("[search\nnot toml");
    let result = load_toml_config(file.path());
    assert!(matches!(result, Err(Error::Toml(_))));
}

#[test]
fn test_explicit_missing_path_is_error() {
    let result = load_or_default(Some(std::path::Path::new("/nonexistent/clues.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_env_config_path_is_used() {
    let file = write_config("[logging]\nlevel = \"warn\"\n");
    env::set_var(CONFIG_ENV_VAR, file.path());

    let config = load_or_default(None).unwrap();
    assert_eq!(config.logging.level, "warn");

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_search_key_env_wins_over_toml() {
    env::set_var(SEARCH_API_KEY_ENV_VAR, "from-env");
    let mut config = TomlConfig::default();
    config.search.api_key = Some("from-toml".to_string());

    assert_eq!(resolve_search_api_key(&config).unwrap(), "from-env");

    env::remove_var(SEARCH_API_KEY_ENV_VAR);
}

#[test]
#[serial]
fn test_search_key_falls_back_to_toml() {
    env::remove_var(SEARCH_API_KEY_ENV_VAR);
    let mut config = TomlConfig::default();
    config.search.api_key = Some("from-toml".to_string());

    assert_eq!(resolve_search_api_key(&config).unwrap(), "from-toml");
}

#[test]
#[serial]
fn test_blank_keys_are_not_configured() {
    env::set_var(SEARCH_API_KEY_ENV_VAR, "   ");
    let mut config = TomlConfig::default();
    config.search.api_key = Some(String::new());

    let result = resolve_search_api_key(&config);
    assert!(matches!(result, Err(Error::Config(_))));

    env::remove_var(SEARCH_API_KEY_ENV_VAR);
}
