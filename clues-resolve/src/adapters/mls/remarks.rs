//! Listing-remarks mining
//!
//! Free-text remarks back-fill attributes the structured payload lacks:
//! - interior condition, by an ordered tier taxonomy loaded from TOML
//! - smart-home, accessibility and special-assessment mentions, recording
//!   every contributing sentence so it can be excised from the remarks shown
//!   to users
//! - dated renovation mentions for field 59

use clues_common::{Error, Result};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Built-in taxonomy
pub const DEFAULT_TAXONOMY: &str = include_str!("../../../config/remarks_taxonomy.toml");

/// Sentences shorter than this are never mined or kept
const MIN_SENTENCE_LEN: usize = 10;

/// Most renovation mentions kept for field 59
const MAX_RENOVATIONS: usize = 3;

static SENTENCE_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+").expect("sentence split pattern is valid"));

/// Action + area + year: "renovated kitchen in 2021"
static RENOVATION_ACTION_FIRST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(renovated|remodeled|updated|new|replaced)\s+([^.!?]*?)\b(kitchen|bathroom|bath|flooring|floor|roof|hvac|ac|air|appliances|cabinets|countertops|counters|windows|doors|paint)\b([^.!?]*?)\b(20\d{2})\b",
    )
    .expect("renovation pattern is valid")
});

/// Area + action + year: "roof replaced 2019"
static RENOVATION_AREA_FIRST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(kitchen|bathroom|bath|flooring|floor|roof|hvac|ac|air|appliances|cabinets|countertops|counters|windows|doors)\b([^.!?]*?)\b(renovated|remodeled|updated|new|replaced|installed)\b([^.!?]*?)\b(20\d{2})\b",
    )
    .expect("renovation pattern is valid")
});

/// Year first: "2022 kitchen remodel"
static RENOVATION_YEAR_FIRST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(20\d{2})\s+([^.!?]*?)\b(kitchen|bathroom|flooring|roof|hvac|remodel|renovation|update)",
    )
    .expect("renovation pattern is valid")
});

/// Roof work with a year, for the roof permit fallback
static ROOF_WORK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\broof\b[^.!?]*?\b(?:permit|replace\w*|install\w*|new)\b[^.!?]*?\b(20\d{2})\b")
        .expect("roof work pattern is valid")
});

// ============================================================================
// Taxonomy
// ============================================================================

#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    condition: Vec<TierFile>,
    #[serde(default)]
    mining: MiningFile,
}

#[derive(Debug, Deserialize)]
struct TierFile {
    tier: String,
    patterns: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MiningFile {
    #[serde(default)]
    smart_home: Vec<String>,
    #[serde(default)]
    accessibility: Vec<String>,
    #[serde(default)]
    special_assessments: Vec<String>,
    #[serde(default)]
    listing_conditions: Vec<String>,
}

/// One condition tier and its patterns
#[derive(Debug, Clone)]
pub struct ConditionTier {
    pub tier: String,
    patterns: Vec<Regex>,
}

impl ConditionTier {
    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

/// Keyword matched on word boundaries
#[derive(Debug, Clone)]
pub struct Keyword {
    pub label: String,
    pattern: Regex,
}

impl Keyword {
    fn new(label: &str) -> Result<Self> {
        let pattern = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(label)))
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Config(format!("Invalid keyword {:?}: {}", label, e)))?;
        Ok(Self {
            label: label.to_string(),
            pattern,
        })
    }

    pub fn is_in(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Immutable remarks taxonomy, shared by `Arc`
#[derive(Debug, Clone)]
pub struct RemarksTaxonomy {
    condition: Vec<ConditionTier>,
    pub smart_home: Vec<Keyword>,
    pub accessibility: Vec<Keyword>,
    pub special_assessments: Vec<Keyword>,
    /// Matched against `SpecialListingConditions` entries
    pub listing_conditions: Vec<Keyword>,
}

impl RemarksTaxonomy {
    /// Built-in taxonomy
    pub fn standard() -> Result<Self> {
        Self::from_toml_str(DEFAULT_TAXONOMY)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let taxonomy = Self::from_toml_str(&content)?;
        info!(path = %path.display(), tiers = taxonomy.condition.len(), "Remarks taxonomy loaded");
        Ok(taxonomy)
    }

    /// Built-in taxonomy unless a path is configured
    pub fn load_or_standard(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::standard(),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TaxonomyFile = toml::from_str(content)?;
        if file.condition.is_empty() {
            return Err(Error::Config("Remarks taxonomy declares no condition tiers".into()));
        }

        let mut condition = Vec::with_capacity(file.condition.len());
        for tier in file.condition {
            let patterns = tier
                .patterns
                .iter()
                .map(|p| {
                    RegexBuilder::new(p).case_insensitive(true).build().map_err(|e| {
                        Error::Config(format!("Invalid {} pattern {:?}: {}", tier.tier, p, e))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            condition.push(ConditionTier {
                tier: tier.tier,
                patterns,
            });
        }

        let keywords = |labels: &[String]| -> Result<Vec<Keyword>> {
            labels.iter().map(|l| Keyword::new(l)).collect()
        };

        Ok(Self {
            condition,
            smart_home: keywords(&file.mining.smart_home)?,
            accessibility: keywords(&file.mining.accessibility)?,
            special_assessments: keywords(&file.mining.special_assessments)?,
            listing_conditions: keywords(&file.mining.listing_conditions)?,
        })
    }

    /// Tier names in priority order
    pub fn tiers(&self) -> Vec<&str> {
        self.condition.iter().map(|t| t.tier.as_str()).collect()
    }

    /// First tier, in declared order, with any matching pattern
    pub fn classify_condition(&self, remarks: &str) -> Option<&str> {
        self.condition
            .iter()
            .find(|tier| tier.matches(remarks))
            .map(|tier| tier.tier.as_str())
    }
}

// ============================================================================
// Sentence mining
// ============================================================================

/// Keywords found and the sentences they came from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mined {
    pub found: Vec<String>,
    pub sentences: Vec<String>,
}

impl Mined {
    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }
}

/// Sentences of at least [`MIN_SENTENCE_LEN`] characters, trimmed
pub fn sentences(text: &str) -> Vec<&str> {
    SENTENCE_SPLIT_RE
        .split(text)
        .map(str::trim)
        .filter(|s| s.len() > MIN_SENTENCE_LEN)
        .collect()
}

/// Every keyword hit, in keyword order, with its sentences
pub fn mine_keywords(remarks: &str, keywords: &[Keyword]) -> Mined {
    let mut mined = Mined::default();
    for sentence in sentences(remarks) {
        for keyword in keywords {
            if keyword.is_in(sentence) {
                if !mined.found.contains(&keyword.label) {
                    mined.found.push(keyword.label.clone());
                }
                if !mined.sentences.iter().any(|s| s == sentence) {
                    mined.sentences.push(sentence.to_string());
                }
            }
        }
    }
    // Report keywords in taxonomy order
    mined
        .found
        .sort_by_key(|f| keywords.iter().position(|k| &k.label == f));
    mined
}

/// First sentence containing any keyword
pub fn first_sentence_with(remarks: &str, keywords: &[Keyword]) -> Option<String> {
    sentences(remarks)
        .into_iter()
        .find(|s| keywords.iter().any(|k| k.is_in(s)))
        .map(str::to_string)
}

/// Remarks with every mined sentence removed
///
/// Sentences are compared case-insensitively, either containing the other.
/// Kept sentences retain their terminating punctuation.
pub fn excise(remarks: &str, mined: &[String]) -> String {
    if mined.is_empty() {
        return remarks.trim().to_string();
    }
    let mined: Vec<String> = mined.iter().map(|s| s.to_lowercase()).collect();

    let mut kept = Vec::new();
    let mut start = 0;
    let mut pieces: Vec<(&str, &str)> = Vec::new();
    for m in SENTENCE_SPLIT_RE.find_iter(remarks) {
        pieces.push((&remarks[start..m.start()], m.as_str()));
        start = m.end();
    }
    if start < remarks.len() {
        pieces.push((&remarks[start..], ""));
    }

    for (sentence, punctuation) in pieces {
        let sentence = sentence.trim();
        if sentence.len() <= MIN_SENTENCE_LEN {
            continue;
        }
        let lower = sentence.to_lowercase();
        let extracted = mined
            .iter()
            .any(|m| lower.contains(m.as_str()) || m.contains(lower.as_str()));
        if !extracted {
            kept.push(format!("{}{}", sentence, punctuation));
        }
    }
    kept.join(" ")
}

// ============================================================================
// Renovations
// ============================================================================

/// Dated renovation mentions
///
/// Years equal to `year_built` or after `current_year` are ignored. At most
/// three distinct mentions are returned.
pub fn renovation_mentions(remarks: &str, year_built: Option<i32>, current_year: i32) -> Vec<String> {
    let plausible = |year: &str| {
        year.parse::<i32>()
            .map(|y| y >= current_year - 8 && y <= current_year && Some(y) != year_built)
            .unwrap_or(false)
    };

    let mut mentions: Vec<String> = Vec::new();
    let mut push = |text: &str| {
        let text = text.trim();
        let lower = text.to_lowercase();
        if !mentions.iter().any(|m| m.to_lowercase().contains(&lower)) {
            mentions.push(text.to_string());
        }
    };

    for caps in RENOVATION_ACTION_FIRST_RE.captures_iter(remarks) {
        if plausible(&caps[5]) {
            push(&caps[0]);
        }
    }
    for caps in RENOVATION_AREA_FIRST_RE.captures_iter(remarks) {
        if plausible(&caps[5]) {
            push(&caps[0]);
        }
    }
    for caps in RENOVATION_YEAR_FIRST_RE.captures_iter(remarks) {
        if plausible(&caps[1]) {
            push(&caps[0]);
        }
    }

    mentions.truncate(MAX_RENOVATIONS);
    mentions
}

/// "Roof work mentioned: ..." fallback for the roof permit field
pub fn roof_work_mention(remarks: &str) -> Option<String> {
    ROOF_WORK_RE
        .find(remarks)
        .map(|m| format!("Roof work mentioned: {}", m.as_str().trim()))
}
