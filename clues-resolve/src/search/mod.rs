//! Web-Search Field Fetcher
//!
//! Configuration-driven adapter that resolves individual fields by issuing
//! search queries and mining the returned pages.
//!
//! # Architecture
//! - [`config`] - per-field query templates, trusted domains and patterns
//! - [`strategies`] - structured data, pattern and label-proximity extraction
//! - [`tavily`] - reqwest-backed [`SearchProvider`]
//!
//! # Parallel Execution
//! Every query template of a field is issued concurrently, each under its own
//! timeout. A failed or timed-out query is logged and dropped; it never
//! cancels its siblings and is not retried. Fields are fetched concurrently
//! as well.

pub mod config;
pub mod strategies;
pub mod tavily;

#[cfg(test)]
pub mod mock;

use crate::adapters::{AdapterContext, AdapterOutput, SourceAdapter};
use crate::error::{AdapterResult, SearchError};
use crate::schema::SchemaRegistry;
use crate::types::{FieldId, SourceTuple};
use async_trait::async_trait;
use config::{FieldSearchConfig, SearchFieldTable};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Source label when a result URL has no usable host
pub const WEB_SEARCH_SOURCE: &str = "Web Search";

pub const NO_MATCH_NOTE: &str = "No matching data found in search results";
pub const NO_RESULTS_NOTE: &str = "No search results returned";

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    /// Snippet or summary text
    #[serde(default)]
    pub content: String,
    /// Full page content, when the provider returns it
    #[serde(default)]
    pub raw_content: Option<String>,
}

/// Web search backend
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run one query
    ///
    /// # Errors
    /// `SearchError` on network, API or decoding failure.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

/// Outcome of fetching one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFetch {
    Found(SourceTuple),
    NotFound { field: FieldId, note: String },
    /// Calculation-only or unconfigured; nothing was queried
    Skipped,
}

/// Concurrent per-field search executor
pub struct WebSearchFetcher {
    provider: Arc<dyn SearchProvider>,
    table: Arc<SearchFieldTable>,
    registry: Arc<SchemaRegistry>,
    timeout: Duration,
}

impl WebSearchFetcher {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        table: Arc<SearchFieldTable>,
        registry: Arc<SchemaRegistry>,
    ) -> Self {
        Self {
            provider,
            table,
            registry,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Per-query timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn table(&self) -> &SearchFieldTable {
        &self.table
    }

    /// Issue every query of one field, then try results in order
    pub async fn fetch_field(&self, config: &FieldSearchConfig, ctx: &AdapterContext) -> FieldFetch {
        if config.calculation_only {
            debug!(field = %config.id, "Calculation-only field, no search issued");
            return FieldFetch::Skipped;
        }

        let queries = config.render_queries(ctx);
        let futures = queries.iter().map(|query| {
            let provider = Arc::clone(&self.provider);
            let timeout = self.timeout;
            async move {
                match tokio::time::timeout(timeout, provider.search(query)).await {
                    Ok(Ok(results)) => {
                        debug!(field = %config.id, query = %query, results = results.len(), "Query returned");
                        Some(results)
                    }
                    Ok(Err(e)) => {
                        warn!(field = %config.id, query = %query, error = %e, "Search query failed");
                        None
                    }
                    Err(_) => {
                        let e = SearchError::Timeout(timeout.as_secs());
                        warn!(field = %config.id, query = %query, error = %e, "Search query timed out");
                        None
                    }
                }
            }
        });

        // Query order first, then provider order within a query
        let results: Vec<SearchResult> = join_all(futures)
            .await
            .into_iter()
            .flatten()
            .flatten()
            .collect();

        if results.is_empty() {
            return FieldFetch::NotFound {
                field: config.id,
                note: NO_RESULTS_NOTE.to_string(),
            };
        }

        match strategies::extract_from_results(config, &results) {
            Some(found) => {
                let source = if found.domain.is_empty() {
                    WEB_SEARCH_SOURCE.to_string()
                } else {
                    found.domain
                };
                let tuple = SourceTuple::new(self.token_for(config.id), found.value, source, found.confidence)
                    .with_method(found.method)
                    .with_url(found.url);
                FieldFetch::Found(tuple)
            }
            None => FieldFetch::NotFound {
                field: config.id,
                note: NO_MATCH_NOTE.to_string(),
            },
        }
    }

    /// Fetch the wanted fields (every searchable field when none are named)
    pub async fn fetch_all(&self, ctx: &AdapterContext) -> AdapterOutput {
        let configs: Vec<&FieldSearchConfig> = if ctx.wanted.is_empty() {
            self.table.searchable().collect()
        } else {
            ctx.wanted
                .iter()
                .filter_map(|id| {
                    let config = self.table.get(*id);
                    if config.is_none() {
                        debug!(field = %id, "No search config for wanted field");
                    }
                    config
                })
                .collect()
        };

        let outcomes = join_all(configs.iter().map(|c| self.fetch_field(c, ctx))).await;

        let mut output = AdapterOutput::default();
        for outcome in outcomes {
            match outcome {
                FieldFetch::Found(tuple) => output.tuples.push(tuple),
                FieldFetch::NotFound { field, note } => output.not_found.push((field, note)),
                FieldFetch::Skipped => {}
            }
        }

        info!(
            provider = self.provider.name(),
            fields = configs.len(),
            found = output.tuples.len(),
            not_found = output.not_found.len(),
            "Web search complete"
        );
        output
    }

    fn token_for(&self, id: FieldId) -> String {
        self.registry
            .by_id(id)
            .map(|def| def.token())
            .unwrap_or_else(|| id.to_string())
    }
}

#[async_trait]
impl SourceAdapter for WebSearchFetcher {
    fn name(&self) -> &'static str {
        "search"
    }

    /// The payload is unused; queries come from the context's address
    async fn adapt(&self, _payload: &Value, ctx: &AdapterContext) -> AdapterResult<AdapterOutput> {
        Ok(self.fetch_all(ctx).await)
    }
}
