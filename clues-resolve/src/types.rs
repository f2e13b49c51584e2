//! Core types shared by the schema, adapters, arbitration and aggregation
//!
//! # Value flow
//! Adapters emit [`SourceTuple`]s carrying raw JSON values. The raw value is
//! coerced into a typed [`FieldValue`] exactly once, by
//! [`crate::schema::coerce::coerce_value`], when the Arbitration Engine
//! applies the tuple.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Field identifiers
// ============================================================================

/// Canonical field id
///
/// Numeric ids (`10`) with an optional alphanumeric subfield suffix
/// (`16a`, `31A`). Subfields order directly after their parent number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId {
    pub num: u16,
    pub sub: Option<char>,
}

impl FieldId {
    pub const fn new(num: u16) -> Self {
        Self { num, sub: None }
    }

    pub const fn sub(num: u16, sub: char) -> Self {
        Self { num, sub: Some(sub) }
    }

    /// True for `16a`-style subfields
    pub fn is_subfield(&self) -> bool {
        self.sub.is_some()
    }
}

impl Ord for FieldId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.num
            .cmp(&other.num)
            .then_with(|| self.sub.cmp(&other.sub))
    }
}

impl PartialOrd for FieldId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub {
            Some(c) => write!(f, "{}{}", self.num, c),
            None => write!(f, "{}", self.num),
        }
    }
}

impl FromStr for FieldId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits_end = s
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(s.len());

        if digits_end == 0 {
            return Err(format!("Field id must start with a number: {:?}", s));
        }

        let num: u16 = s[..digits_end]
            .parse()
            .map_err(|e| format!("Invalid field number {:?}: {}", s, e))?;

        let rest = &s[digits_end..];
        let mut chars = rest.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Ok(FieldId::new(num)),
            (Some(c), None) if c.is_ascii_alphabetic() => Ok(FieldId::sub(num, c)),
            _ => Err(format!("Invalid field id suffix: {:?}", s)),
        }
    }
}

impl Serialize for FieldId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(u16),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Num(n) => Ok(FieldId::new(n)),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

// ============================================================================
// Field types and values
// ============================================================================

/// Declared value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Select,
    Multiselect,
    Date,
    Currency,
    Percentage,
}

impl FieldType {
    /// Number, currency and percentage all carry `FieldValue::Number`
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Number | FieldType::Currency | FieldType::Percentage)
    }

    pub fn is_enumerated(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Multiselect)
    }
}

/// Typed, resolved field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Boolean(bool),
    Date(chrono::NaiveDate),
    EnumSingle(String),
    EnumMulti(Vec<String>),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::EnumSingle(s) => Some(s),
            _ => None,
        }
    }

    /// Empty strings (after trimming) and empty lists count as unpopulated
    pub fn is_populated(&self) -> bool {
        match self {
            FieldValue::Text(s) | FieldValue::EnumSingle(s) => !s.trim().is_empty(),
            FieldValue::EnumMulti(items) => !items.is_empty(),
            FieldValue::Number(n) => n.is_finite(),
            FieldValue::Boolean(_) | FieldValue::Date(_) => true,
        }
    }

    /// JSON form used by the flat payload shape
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Number(n) => serde_json::json!(n),
            FieldValue::Text(s) | FieldValue::EnumSingle(s) => serde_json::json!(s),
            FieldValue::Boolean(b) => serde_json::json!(b),
            FieldValue::Date(d) => serde_json::json!(d.format("%Y-%m-%d").to_string()),
            FieldValue::EnumMulti(items) => serde_json::json!(items),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) | FieldValue::EnumSingle(s) => write!(f, "{}", s),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::EnumMulti(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

// ============================================================================
// Confidence
// ============================================================================

/// Ordered trust label: `Low < Medium < MediumHigh < High`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    #[serde(rename = "Medium-High")]
    MediumHigh,
    High,
}

impl Confidence {
    /// Lenient parse of provider confidence labels
    ///
    /// `verified` maps to High; `unverified` and anything unrecognised to Low.
    pub fn parse_label(label: &str) -> Confidence {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" | "verified" => Confidence::High,
            "medium-high" | "medium_high" | "mediumhigh" => Confidence::MediumHigh,
            "medium" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    /// Weight used by the composite score
    pub fn weight(&self) -> f64 {
        match self {
            Confidence::High => 1.0,
            Confidence::MediumHigh => 0.85,
            Confidence::Medium => 0.7,
            Confidence::Low => 0.5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::MediumHigh => "Medium-High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Source tuples
// ============================================================================

/// How a value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    /// Structured provider payload (MLS, API)
    Direct,
    /// Embedded machine-readable block (JSON-LD)
    StructuredData,
    Pattern,
    LabelProximity,
    Calculation,
    NotFound,
}

/// Validation verdict attached to a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Passed,
    Warning,
    Failed,
    SingleSourceWarning,
}

impl ValidationStatus {
    pub fn parse_label(label: &str) -> Option<ValidationStatus> {
        match label.trim().to_ascii_lowercase().as_str() {
            "passed" | "valid" => Some(ValidationStatus::Passed),
            "warning" => Some(ValidationStatus::Warning),
            "failed" => Some(ValidationStatus::Failed),
            "single_source_warning" => Some(ValidationStatus::SingleSourceWarning),
            _ => None,
        }
    }
}

/// Unit emitted by an adapter and consumed by the Arbitration Engine
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTuple {
    /// Field token: `10`, `16a`, `listing_price` or `10_listing_price`
    pub token: String,
    /// Raw, uncoerced value
    pub value: serde_json::Value,
    /// Provider/domain, `LLM:<name>`, or `Internal Calculation`
    pub source: String,
    pub confidence: Confidence,
    pub method: Option<ExtractionMethod>,
    pub url: Option<String>,
    pub note: Option<String>,
    pub llm_sources: Vec<String>,
    pub validation: Option<(ValidationStatus, Option<String>)>,
}

impl SourceTuple {
    pub fn new(
        token: impl Into<String>,
        value: impl Into<serde_json::Value>,
        source: impl Into<String>,
        confidence: Confidence,
    ) -> Self {
        Self {
            token: token.into(),
            value: value.into(),
            source: source.into(),
            confidence,
            method: None,
            url: None,
            note: None,
            llm_sources: Vec::new(),
            validation: None,
        }
    }

    pub fn with_method(mut self, method: ExtractionMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_llm_sources(mut self, llm_sources: Vec<String>) -> Self {
        self.llm_sources = llm_sources;
        self
    }

    pub fn with_validation(mut self, status: ValidationStatus, message: Option<String>) -> Self {
        self.validation = Some((status, message));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_id_parse_and_display() {
        assert_eq!("10".parse::<FieldId>().unwrap(), FieldId::new(10));
        assert_eq!("16a".parse::<FieldId>().unwrap(), FieldId::sub(16, 'a'));
        assert_eq!("31A".parse::<FieldId>().unwrap(), FieldId::sub(31, 'A'));
        assert_eq!(FieldId::sub(16, 'f').to_string(), "16f");
        assert!("abc".parse::<FieldId>().is_err());
        assert!("16ab".parse::<FieldId>().is_err());
        assert!("".parse::<FieldId>().is_err());
    }

    #[test]
    fn test_field_id_ordering() {
        let mut ids = vec![
            FieldId::new(17),
            FieldId::sub(16, 'b'),
            FieldId::new(16),
            FieldId::sub(16, 'a'),
            FieldId::new(2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                FieldId::new(2),
                FieldId::new(16),
                FieldId::sub(16, 'a'),
                FieldId::sub(16, 'b'),
                FieldId::new(17),
            ]
        );
    }

    #[test]
    fn test_confidence_order_and_labels() {
        assert!(Confidence::High > Confidence::MediumHigh);
        assert!(Confidence::MediumHigh > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
        assert_eq!(Confidence::parse_label("Verified"), Confidence::High);
        assert_eq!(Confidence::parse_label("medium-high"), Confidence::MediumHigh);
        assert_eq!(Confidence::parse_label("Unverified"), Confidence::Low);
        assert_eq!(
            serde_json::to_string(&Confidence::MediumHigh).unwrap(),
            "\"Medium-High\""
        );
    }

    #[test]
    fn test_populated() {
        assert!(!FieldValue::Text("   ".into()).is_populated());
        assert!(!FieldValue::EnumMulti(vec![]).is_populated());
        assert!(FieldValue::Boolean(false).is_populated());
        assert!(FieldValue::Number(0.0).is_populated());
    }
}
