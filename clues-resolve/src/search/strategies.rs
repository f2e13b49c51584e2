//! Extraction strategies for search results
//!
//! Each result is tried in fixed order: structured data (JSON-LD), then
//! configured patterns, then label proximity. The first strategy that yields
//! a value wins; the caller moves to the next result only when all three
//! fail.

use super::config::FieldSearchConfig;
use super::SearchResult;
use crate::types::{Confidence, ExtractionMethod};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Characters scanned after a label
pub const LABEL_WINDOW: usize = 200;

static JSON_LD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script[^>]*type=["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("JSON-LD pattern is valid")
});

/// Value shapes looked for near a label, in order
static LABEL_VALUE_RES: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        Regex::new(r"\$[\d,]+").expect("currency pattern is valid"),
        Regex::new(r"[\d.]+%").expect("percent pattern is valid"),
        Regex::new(r"(?i)\d[\d,]*\s*(?:sq\s*ft|sqft|miles?|mi|years?|yr)\b")
            .expect("unit pattern is valid"),
        Regex::new(r"\d[\d,]*").expect("number pattern is valid"),
    ]
});

/// Value pulled from one search result
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub value: Value,
    pub method: ExtractionMethod,
    pub confidence: Confidence,
    pub url: String,
    /// Host without `www.`; empty when the URL does not parse
    pub domain: String,
}

// ============================================================================
// Source ranking
// ============================================================================

/// URL host without a leading `www.`
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.trim_start_matches("www.").to_lowercase())
}

/// Index of the first trusted domain where either contains the other
pub fn rank(domain: &str, trusted: &[String]) -> Option<usize> {
    if domain.is_empty() {
        return None;
    }
    trusted.iter().position(|t| {
        let t = t.to_lowercase();
        !t.is_empty() && (domain.contains(&t) || t.contains(domain))
    })
}

pub fn confidence_for_rank(rank: Option<usize>) -> Confidence {
    match rank {
        Some(0..=1) => Confidence::High,
        Some(2..=3) => Confidence::Medium,
        _ => Confidence::Low,
    }
}

// ============================================================================
// Structured data
// ============================================================================

/// Walk a dot path (`offers.price`, `address.0.zip`) through JSON
///
/// Missing keys or out-of-range indices yield `None`.
pub fn walk_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|seg| !seg.is_empty())
        .try_fold(root, |node, seg| match node {
            Value::Object(map) => map.get(seg),
            Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// First truthy value at any configured path in any JSON-LD block
pub fn extract_json_ld(html: &str, paths: &[String]) -> Option<Value> {
    if paths.is_empty() {
        return None;
    }

    for caps in JSON_LD_RE.captures_iter(html) {
        let Ok(doc) = serde_json::from_str::<Value>(caps[1].trim()) else {
            continue;
        };
        // A block may hold a single object or an array of them
        let roots: Vec<&Value> = match &doc {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        for root in roots {
            if let Some(found) = paths
                .iter()
                .filter_map(|p| walk_path(root, p))
                .find(|v| is_truthy(v))
            {
                return Some(found.clone());
            }
        }
    }
    None
}

// ============================================================================
// Patterns and labels
// ============================================================================

/// First match across patterns: capture group 1 if present, else whole match
pub fn extract_pattern(text: &str, patterns: &[Regex]) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text).map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default()
        })
    })
}

/// Value found in the window following the first label present
pub fn extract_near_label(text: &str, labels: &[String]) -> Option<String> {
    let lowered = text.to_lowercase();

    let start = labels
        .iter()
        .filter(|l| !l.is_empty())
        .find_map(|l| lowered.find(&l.to_lowercase()))?;
    // Lowercasing can shift byte offsets for non-ASCII text
    let start = (0..=start.min(text.len()))
        .rev()
        .find(|i| text.is_char_boundary(*i))
        .unwrap_or(0);

    let window: String = text[start..].chars().take(LABEL_WINDOW).collect();
    LABEL_VALUE_RES
        .iter()
        .find_map(|re| re.find(&window))
        .map(|m| m.as_str().trim().to_string())
}

/// Run every strategy against one result
pub fn extract_from_result(config: &FieldSearchConfig, result: &SearchResult) -> Option<Extraction> {
    let domain = domain_of(&result.url).unwrap_or_default();
    let ranked = confidence_for_rank(rank(&domain, &config.trusted_domains));
    let text = result.raw_content.as_deref().unwrap_or(&result.content);

    let (value, method, confidence) = if let Some(value) =
        extract_json_ld(text, &config.json_ld_paths)
    {
        (value, ExtractionMethod::StructuredData, Confidence::High)
    } else if let Some(found) = extract_pattern(text, &config.patterns)
        .or_else(|| extract_pattern(&result.content, &config.patterns))
    {
        (Value::String(found), ExtractionMethod::Pattern, ranked)
    } else if let Some(found) = extract_near_label(text, &config.labels)
        .or_else(|| extract_near_label(&result.content, &config.labels))
    {
        (Value::String(found), ExtractionMethod::LabelProximity, ranked)
    } else {
        return None;
    };

    debug!(field = %config.id, url = %result.url, method = ?method, "Search result matched");
    Some(Extraction {
        value,
        method,
        confidence,
        url: result.url.clone(),
        domain,
    })
}

/// Results tried in returned order; first extraction wins
pub fn extract_from_results(
    config: &FieldSearchConfig,
    results: &[SearchResult],
) -> Option<Extraction> {
    results.iter().find_map(|r| extract_from_result(config, r))
}
