//! Raw value → typed [`FieldValue`] coercion
//!
//! The single place raw adapter values become typed. A value that cannot be
//! coerced, or a numeric value outside the field's validation range, yields
//! `None` and the field is treated as absent (never clamped).

use super::FieldDefinition;
use crate::types::{FieldType, FieldValue};
use chrono::NaiveDate;
use serde_json::Value;

/// Why a raw value was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum CoerceRejection {
    /// null, empty string, empty list
    Empty,
    /// Value present but not convertible to the field's type
    Unparseable,
    /// Numeric value outside the inclusive validation range
    OutOfRange { value: f64, min: f64, max: f64 },
}

/// Coerce a raw value for `def`, `None` when absent or invalid
pub fn coerce_value(def: &FieldDefinition, raw: &Value) -> Option<FieldValue> {
    try_coerce(def, raw).ok()
}

/// Like [`coerce_value`] but reports why a value was rejected
pub fn try_coerce(def: &FieldDefinition, raw: &Value) -> Result<FieldValue, CoerceRejection> {
    if is_empty(raw) {
        return Err(CoerceRejection::Empty);
    }

    let value = match def.field_type {
        FieldType::Number | FieldType::Currency | FieldType::Percentage => {
            let n = to_number(raw).ok_or(CoerceRejection::Unparseable)?;
            if let Some((min, max)) = def.range {
                if n < min || n > max {
                    return Err(CoerceRejection::OutOfRange { value: n, min, max });
                }
            }
            FieldValue::Number(n)
        }
        FieldType::Boolean => FieldValue::Boolean(to_bool(raw).ok_or(CoerceRejection::Unparseable)?),
        FieldType::Date => FieldValue::Date(to_date(raw).ok_or(CoerceRejection::Unparseable)?),
        FieldType::Select => {
            let text = to_text(raw).ok_or(CoerceRejection::Unparseable)?;
            FieldValue::EnumSingle(canonical_option(def, &text))
        }
        FieldType::Multiselect => {
            let items: Vec<String> = to_list(raw)
                .ok_or(CoerceRejection::Unparseable)?
                .iter()
                .map(|item| canonical_option(def, item))
                .collect();
            if items.is_empty() {
                return Err(CoerceRejection::Empty);
            }
            FieldValue::EnumMulti(items)
        }
        FieldType::Text => FieldValue::Text(to_text(raw).ok_or(CoerceRejection::Unparseable)?),
    };

    if value.is_populated() {
        Ok(value)
    } else {
        Err(CoerceRejection::Empty)
    }
}

fn is_empty(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Parse a number, stripping `$`, `,` and `%` and reading the leading
/// numeric prefix (`"450,000 USD"` → 450000)
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%'))
        .collect();
    let cleaned = cleaned.trim_start();

    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = cleaned.as_bytes();

    while end < bytes.len() {
        let c = bytes[end] as char;
        match c {
            '0'..='9' => seen_digit = true,
            '+' | '-' if end == 0 => {}
            '+' | '-' if seen_exp && matches!(bytes[end - 1] as char, 'e' | 'E') => {}
            '.' if !seen_dot && !seen_exp => seen_dot = true,
            'e' | 'E' if seen_digit && !seen_exp => {
                // Only an exponent when digits follow
                let rest = &cleaned[end + 1..];
                let rest = rest.strip_prefix(['+', '-']).unwrap_or(rest);
                if !rest.starts_with(|c: char| c.is_ascii_digit()) {
                    break;
                }
                seen_exp = true;
            }
            _ => break,
        }
        end += 1;
    }

    if !seen_digit {
        return None;
    }
    cleaned[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

fn to_number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

pub(crate) fn to_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            match s.as_str() {
                "true" | "yes" | "y" | "1" => Some(true),
                "false" | "no" | "n" | "0" => Some(false),
                _ => None,
            }
        }
        _ => None,
    }
}

fn to_date(raw: &Value) -> Option<NaiveDate> {
    let s = raw.as_str()?.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| s.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
        .or_else(|| NaiveDate::parse_from_str(s, "%m/%d/%Y").ok())
}

fn to_text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "Yes" } else { "No" }.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(to_text).filter(|s| !s.is_empty()).collect();
            Some(parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

fn to_list(raw: &Value) -> Option<Vec<String>> {
    match raw {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(to_text)
                .filter(|s| !s.is_empty())
                .collect(),
        ),
        Value::String(s) => Some(
            s.split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect(),
        ),
        _ => None,
    }
}

/// Case-insensitive match against declared options; unmatched text is kept
fn canonical_option(def: &FieldDefinition, text: &str) -> String {
    let text = text.trim();
    def.options
        .iter()
        .find(|opt| opt.eq_ignore_ascii_case(text))
        .cloned()
        .unwrap_or_else(|| text.to_string())
}
