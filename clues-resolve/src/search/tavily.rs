//! Tavily search client
//!
//! POSTs `{api_key, query, search_depth, include_raw_content, max_results}`
//! to the configured endpoint. Requests pass through a client-side rate
//! limiter shared by all concurrent queries.

use super::{SearchProvider, SearchResult};
use crate::error::SearchError;
use async_trait::async_trait;
use clues_common::config::{resolve_search_api_key, TomlConfig};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'static str,
    include_raw_content: bool,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

pub struct TavilyClient {
    http_client: Client,
    endpoint: String,
    api_key: String,
    max_results: u32,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl TavilyClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        max_results: u32,
        requests_per_second: u32,
    ) -> Result<Self, SearchError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| SearchError::Network(format!("Failed to build HTTP client: {}", e)))?;

        let rate_limiter = RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN),
        ));

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            max_results: max_results.max(1),
            rate_limiter,
        })
    }

    /// Build from `[search]` settings; the key follows ENV → TOML priority
    ///
    /// # Errors
    /// `SearchError::NotConfigured` when no key is set.
    pub fn from_config(config: &TomlConfig) -> Result<Self, SearchError> {
        let api_key =
            resolve_search_api_key(config).map_err(|e| SearchError::NotConfigured(e.to_string()))?;
        let search = &config.search;
        Self::new(
            search.endpoint.clone(),
            api_key,
            Duration::from_secs(search.timeout_secs),
            search.max_results,
            search.requests_per_second,
        )
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        self.rate_limiter.until_ready().await;

        let body = TavilyRequest {
            api_key: &self.api_key,
            query,
            search_depth: "basic",
            include_raw_content: true,
            max_results: self.max_results,
        };

        let response = self.http_client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SearchError::Api(format!("HTTP {}: {}", status, text)));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))?;

        debug!(query = %query, results = parsed.results.len(), "Tavily query complete");
        Ok(parsed.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_config_without_key_is_not_configured() {
        std::env::remove_var(clues_common::config::SEARCH_API_KEY_ENV_VAR);
        let result = TavilyClient::from_config(&TomlConfig::default());
        assert!(matches!(result, Err(SearchError::NotConfigured(_))));
    }

    #[test]
    #[serial]
    fn test_from_config_uses_toml_key() {
        std::env::remove_var(clues_common::config::SEARCH_API_KEY_ENV_VAR);
        let mut config = TomlConfig::default();
        config.search.api_key = Some("tvly-test".to_string());
        config.search.max_results = 0;

        let client = TavilyClient::from_config(&config).unwrap();
        assert_eq!(client.api_key, "tvly-test");
        assert_eq!(client.max_results, 1);
    }

    #[test]
    fn test_response_decoding_tolerates_missing_fields() {
        let parsed: TavilyResponse = serde_json::from_str(
            r#"{"results": [{"url": "https://redfin.com/x", "content": "3 beds", "score": 0.9}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.results[0].raw_content, None);

        let empty: TavilyResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.results.is_empty());
    }
}
