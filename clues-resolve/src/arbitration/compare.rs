//! Semantic value comparison and conflict reports
//!
//! Two sources only disagree when their values differ in meaning:
//! - numbers within 1% relative tolerance (0.01 absolute below 10) are equal
//! - text compares after lowercasing, stripping punctuation and collapsing
//!   whitespace (`"Fee Simple."` == `"fee  simple"`)
//! - lists compare as sets of normalised items

use crate::record::FieldSlot;
use crate::types::{FieldId, FieldValue};
use serde::Serialize;

/// Relative tolerance for numeric agreement
pub const NUMBER_TOLERANCE: f64 = 0.01;

/// True when `a` and `b` mean the same thing
pub fn values_agree(a: &FieldValue, b: &FieldValue) -> bool {
    match (a, b) {
        (FieldValue::Number(x), FieldValue::Number(y)) => numbers_agree(*x, *y, NUMBER_TOLERANCE),
        (FieldValue::Boolean(x), FieldValue::Boolean(y)) => x == y,
        (FieldValue::Date(x), FieldValue::Date(y)) => x == y,
        (FieldValue::EnumMulti(x), FieldValue::EnumMulti(y)) => {
            let mut x: Vec<String> = x.iter().map(|s| normalize_text(s)).collect();
            let mut y: Vec<String> = y.iter().map(|s| normalize_text(s)).collect();
            x.sort();
            x.dedup();
            y.sort();
            y.dedup();
            x == y
        }
        _ => normalize_text(&a.to_string()) == normalize_text(&b.to_string()),
    }
}

fn numbers_agree(x: f64, y: f64, tolerance: f64) -> bool {
    if x == y {
        return true;
    }
    if x.abs() < 10.0 || y.abs() < 10.0 {
        return (x - y).abs() <= tolerance;
    }
    (x - y).abs() / x.abs().max(y.abs()) <= tolerance
}

/// Lowercase, drop punctuation, collapse whitespace
pub fn normalize_text(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pairwise disagreement between two sources for one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictReport {
    pub field: FieldId,
    pub source1: String,
    pub value1: String,
    pub source2: String,
    pub value2: String,
    /// Normalised Levenshtein similarity of the two renderings (0.0-1.0)
    pub similarity: f64,
}

/// Every disagreeing pair recorded on a conflicted slot
pub fn conflict_reports(field: FieldId, slot: &FieldSlot) -> Vec<ConflictReport> {
    let values = &slot.conflict_values;
    let mut reports = Vec::new();

    for i in 0..values.len() {
        for j in (i + 1)..values.len() {
            let (a, b) = (&values[i], &values[j]);
            if values_agree(&a.value, &b.value) {
                continue;
            }
            let value1 = a.value.to_string();
            let value2 = b.value.to_string();
            let similarity = strsim::normalized_levenshtein(&value1, &value2);
            reports.push(ConflictReport {
                field,
                source1: a.source.clone(),
                value1,
                source2: b.source.clone(),
                value2,
                similarity,
            });
        }
    }
    reports
}
