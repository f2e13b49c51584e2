//! Error types for clues-resolve
//!
//! Only configuration errors (`clues_common::Error::Config`) are fatal. The
//! errors here are local to one adapter invocation or one search query; the
//! pipeline logs them and carries on with a full-shaped record.

use thiserror::Error;

/// Adapter input error
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Payload has the wrong shape (not an object, wrong-typed attribute)
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Adapter configuration could not be loaded
    #[error("Adapter configuration error: {0}")]
    Config(#[from] clues_common::Error),

    /// Search stage failed as a whole
    #[error("Search error: {0}")]
    Search(#[from] SearchError),
}

impl From<serde_json::Error> for AdapterError {
    fn from(e: serde_json::Error) -> Self {
        AdapterError::MalformedPayload(e.to_string())
    }
}

/// Web-search provider error, dropped per query
#[derive(Debug, Error)]
pub enum SearchError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Provider returned a non-success status
    #[error("API error: {0}")]
    Api(String),

    /// Response could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Query exceeded its timeout
    #[error("Search timed out after {0}s")]
    Timeout(u64),

    /// No API key configured
    #[error("Search provider not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SearchError::Network(format!("Request timed out: {}", e))
        } else if e.is_decode() {
            SearchError::Parse(e.to_string())
        } else {
            SearchError::Network(e.to_string())
        }
    }
}

/// Result type for adapters
pub type AdapterResult<T> = Result<T, AdapterError>;
