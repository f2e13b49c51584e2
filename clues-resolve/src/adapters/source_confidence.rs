//! Source-name classification
//!
//! Maps a free-form source label (`Stellar MLS`, `Zillow API`,
//! `LLM:Perplexity`, `zillow.com`) to a default confidence and a trust tier.
//!
//! # Tiers
//! 1. MLS and internal calculation
//! 2. Primary APIs (Google, government, scoring services)
//! 3. Web search extraction
//! 4. LLMs with web search
//! 5. LLMs without web search

use crate::types::Confidence;
use serde::Serialize;

/// Source label of values computed by the resolver
pub const INTERNAL_CALCULATION: &str = "Internal Calculation";

/// Source label of the MLS adapter
pub const STELLAR_MLS: &str = "Stellar MLS";

const HIGH_CONFIDENCE: &[&str] = &[
    "tavily",
    "google",
    "walkscore",
    "fema",
    "weather",
    "schooldigger",
    "airnow",
    "stellar",
    "mls",
    "calculation",
];

const MEDIUM_CONFIDENCE: &[&str] = &["claude-opus", "opus", "howloud", "fbi", "crime"];

const TIER_1: &[&str] = &["stellar", "mls", "calculation", "backend"];

const TIER_2: &[&str] = &[
    "google",
    "walkscore",
    "schooldigger",
    "fema",
    "airnow",
    "howloud",
    "weather",
    "fbi",
];

const WEB_SEARCH_LLMS: &[&str] = &["perplexity", "gemini", "gpt", "sonnet", "grok"];

const OTHER_LLMS: &[&str] = &["opus", "claude", "anthropic", "openai"];

/// Trust tier, 1 (most trusted) to 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SourceTier(pub u8);

impl SourceTier {
    pub const MLS: SourceTier = SourceTier(1);
    pub const API: SourceTier = SourceTier(2);
    pub const WEB_SEARCH: SourceTier = SourceTier(3);
    pub const WEB_LLM: SourceTier = SourceTier(4);
    pub const OFFLINE_LLM: SourceTier = SourceTier(5);

    /// True when `self` is more trusted than `other`
    pub fn outranks(&self, other: SourceTier) -> bool {
        self.0 < other.0
    }

    pub fn is_llm(&self) -> bool {
        self.0 >= 4
    }
}

/// Default confidence for a source, assuming LLM answers carry citations
pub fn source_confidence(source: &str) -> Confidence {
    source_confidence_with_citations(source, true)
}

/// Default confidence for a source
///
/// Perplexity and Grok are High only with citations, Medium otherwise.
/// Gemini is Medium when web-grounded and Low otherwise. Any label naming an
/// API is treated as a primary source.
pub fn source_confidence_with_citations(source: &str, has_citations: bool) -> Confidence {
    let key = source.to_lowercase();

    if key.contains("gemini") {
        return if has_citations || key.contains("2.0") || key.contains("search") {
            Confidence::Medium
        } else {
            Confidence::Low
        };
    }

    if key.contains("perplexity") || key.contains("grok") {
        return if has_citations {
            Confidence::High
        } else {
            Confidence::Medium
        };
    }

    if HIGH_CONFIDENCE.iter().any(|s| key.contains(s)) || mentions_api(&key) {
        return Confidence::High;
    }

    if MEDIUM_CONFIDENCE.iter().any(|s| key.contains(s)) {
        return Confidence::Medium;
    }

    Confidence::Low
}

/// Trust tier of a source label
pub fn source_tier(source: &str) -> SourceTier {
    let key = source.to_lowercase();

    if key.starts_with("llm:") {
        return if OTHER_LLMS.iter().any(|s| key.contains(s))
            && !WEB_SEARCH_LLMS.iter().any(|s| key.contains(s))
        {
            SourceTier::OFFLINE_LLM
        } else {
            SourceTier::WEB_LLM
        };
    }
    if TIER_1.iter().any(|s| key.contains(s)) {
        return SourceTier::MLS;
    }
    if key.contains("tavily") || key.contains("web search") {
        return SourceTier::WEB_SEARCH;
    }
    if (TIER_2.iter().any(|s| key.contains(s)) || mentions_api(&key)) && !is_llm_name(&key) {
        return SourceTier::API;
    }
    if WEB_SEARCH_LLMS.iter().any(|s| key.contains(s)) {
        return SourceTier::WEB_LLM;
    }
    if OTHER_LLMS.iter().any(|s| key.contains(s)) {
        return SourceTier::OFFLINE_LLM;
    }
    // Bare domains come from the web-search fetcher
    if key.contains('.') && !key.contains(' ') {
        return SourceTier::WEB_SEARCH;
    }
    SourceTier::WEB_LLM
}

/// True for `LLM:<name>` labels and known model names
pub fn is_llm_source(source: &str) -> bool {
    source_tier(source).is_llm()
}

fn is_llm_name(key: &str) -> bool {
    WEB_SEARCH_LLMS.iter().chain(OTHER_LLMS).any(|s| key.contains(s))
}

/// `api` as a word (`Zillow API`, `census-api`), not inside `capital`
fn mentions_api(key: &str) -> bool {
    key.split(|c: char| !c.is_ascii_alphanumeric()).any(|w| w == "api")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_by_label() {
        assert_eq!(source_confidence("Stellar MLS"), Confidence::High);
        assert_eq!(source_confidence("Zillow API"), Confidence::High);
        assert_eq!(source_confidence("Google Places"), Confidence::High);
        assert_eq!(source_confidence("HowLoud"), Confidence::Medium);
        assert_eq!(source_confidence("LLM:Claude Opus"), Confidence::Medium);
        assert_eq!(source_confidence("GPT-4o"), Confidence::Low);
        assert_eq!(source_confidence("Capital Records"), Confidence::Low);
        assert_eq!(source_confidence(INTERNAL_CALCULATION), Confidence::High);
    }

    #[test]
    fn test_citations_matter_for_search_llms() {
        assert_eq!(source_confidence_with_citations("Perplexity", true), Confidence::High);
        assert_eq!(source_confidence_with_citations("Perplexity", false), Confidence::Medium);
        assert_eq!(source_confidence_with_citations("Gemini", false), Confidence::Low);
        assert_eq!(
            source_confidence_with_citations("Gemini 2.0 Search", false),
            Confidence::Medium
        );
    }

    #[test]
    fn test_tiers() {
        assert_eq!(source_tier(STELLAR_MLS), SourceTier::MLS);
        assert_eq!(source_tier(INTERNAL_CALCULATION), SourceTier::MLS);
        assert_eq!(source_tier("Google Geocode"), SourceTier::API);
        assert_eq!(source_tier("Zillow API"), SourceTier::API);
        assert_eq!(source_tier("zillow.com"), SourceTier::WEB_SEARCH);
        assert_eq!(source_tier("Tavily Web Search"), SourceTier::WEB_SEARCH);
        assert_eq!(source_tier("LLM:Perplexity"), SourceTier::WEB_LLM);
        assert_eq!(source_tier("LLM:Claude Opus"), SourceTier::OFFLINE_LLM);
        assert_eq!(source_tier("Claude Sonnet"), SourceTier::WEB_LLM);
        assert!(is_llm_source("Grok"));
        assert!(!is_llm_source("FEMA"));
        assert!(SourceTier::MLS.outranks(SourceTier::API));
    }
}
