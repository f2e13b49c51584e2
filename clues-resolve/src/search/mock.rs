//! Scripted search provider for tests

use super::{SearchProvider, SearchResult};
use crate::error::SearchError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Answers queries by substring match against scripted responses
///
/// Unmatched queries return no results.
#[derive(Default)]
pub struct MockSearchProvider {
    responses: Vec<(String, Vec<SearchResult>)>,
    delays: Vec<(String, Duration)>,
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockSearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every query fails with a network error
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn respond(mut self, needle: &str, results: Vec<SearchResult>) -> Self {
        self.responses.push((needle.to_string(), results));
        self
    }

    pub fn delay_for(mut self, needle: &str, delay: Duration) -> Self {
        self.delays.push((needle.to_string(), delay));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some((_, delay)) = self.delays.iter().find(|(n, _)| query.contains(n.as_str())) {
            tokio::time::sleep(*delay).await;
        }
        if self.should_fail {
            return Err(SearchError::Network("Mock failure".to_string()));
        }

        Ok(self
            .responses
            .iter()
            .find(|(n, _)| query.contains(n.as_str()))
            .map(|(_, results)| results.clone())
            .unwrap_or_default())
    }
}
