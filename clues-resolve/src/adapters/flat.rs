//! Flat key-value adapter
//!
//! Accepts `{"<id>_<key>": {value, source?, confidence?, llmSources?,
//! validationStatus?, validationMessage?}}` payloads, the shape LLM
//! orchestrators and earlier resolutions produce. A bare value in place of
//! the entry object is accepted too.

use super::address::AddressParts;
use super::mls::payload::StringList;
use super::source_confidence::source_confidence;
use super::{AdapterContext, AdapterOutput, SourceAdapter, PASSTHROUGH_KEYS};
use crate::error::{AdapterError, AdapterResult};
use crate::schema::SchemaRegistry;
use crate::types::{Confidence, FieldId, SourceTuple, ValidationStatus};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Source label used when an entry names none
pub const UNKNOWN_SOURCE: &str = "Unknown";

const FULL_ADDRESS: FieldId = FieldId::new(1);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatEntry {
    #[serde(default)]
    value: Value,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    llm_sources: StringList,
    #[serde(default)]
    validation_status: Option<String>,
    #[serde(default)]
    validation_message: Option<String>,
}

impl FlatEntry {
    /// Entry object, or a bare value wrapped as one
    fn from_value(raw: &Value) -> Result<Self, serde_json::Error> {
        match raw {
            Value::Object(map) if map.contains_key("value") => serde_json::from_value(raw.clone()),
            other => Ok(FlatEntry {
                value: other.clone(),
                source: None,
                confidence: None,
                llm_sources: StringList::default(),
                validation_status: None,
                validation_message: None,
            }),
        }
    }
}

/// Flat `{token: entry}` adapter
#[derive(Debug, Clone)]
pub struct FlatAdapter {
    registry: Arc<SchemaRegistry>,
    default_source: String,
}

impl FlatAdapter {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            default_source: UNKNOWN_SOURCE.to_string(),
        }
    }

    /// Label applied to entries without a `source`
    pub fn with_default_source(mut self, source: impl Into<String>) -> Self {
        self.default_source = source.into();
        self
    }

    /// Map a flat payload
    ///
    /// Entries with unreadable metadata are dropped one by one.
    ///
    /// # Errors
    /// `MalformedPayload` when the payload is not a JSON object.
    pub fn adapt_value(&self, payload: &Value) -> AdapterResult<AdapterOutput> {
        let Value::Object(entries) = payload else {
            return Err(AdapterError::MalformedPayload(
                "Flat payload must be a JSON object keyed by field token".into(),
            ));
        };

        let mut output = AdapterOutput::default();
        let mut dropped = 0usize;

        for (key, raw) in entries {
            if PASSTHROUGH_KEYS.contains(&key.as_str()) {
                let value = unwrap_value(raw);
                if !value.is_null() {
                    output.passthrough.insert(key.clone(), value.clone());
                }
                continue;
            }
            if key == "coordinates" {
                insert_coordinates(unwrap_value(raw), &mut output);
                continue;
            }

            let Some(def) = self.registry.resolve_token(key) else {
                warn!(token = %key, "Dropping unknown field token");
                dropped += 1;
                continue;
            };

            let entry = match FlatEntry::from_value(raw) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(token = %key, error = %e, "Dropping flat entry with unreadable metadata");
                    dropped += 1;
                    continue;
                }
            };
            let source = entry
                .source
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(self.default_source.as_str())
                .to_string();
            let confidence = entry
                .confidence
                .as_deref()
                .map(Confidence::parse_label)
                .unwrap_or_else(|| source_confidence(&source));

            if def.id == FULL_ADDRESS {
                if let Some(full) = entry.value.as_str().filter(|s| !s.trim().is_empty()) {
                    output.address = Some(AddressParts::parse(full));
                }
            }

            let mut tuple = SourceTuple::new(def.token(), entry.value, source, confidence)
                .with_llm_sources(entry.llm_sources.items().map(str::to_string).collect());
            if let Some(status) = entry
                .validation_status
                .as_deref()
                .and_then(ValidationStatus::parse_label)
            {
                tuple = tuple.with_validation(status, entry.validation_message);
            }
            debug!(field = %def.id, source = %tuple.source, confidence = %tuple.confidence, "Flat entry mapped");
            output.tuples.push(tuple);
        }

        info!(
            tuples = output.tuples.len(),
            dropped,
            passthrough = output.passthrough.len(),
            "Flat payload mapped"
        );
        Ok(output)
    }
}

#[async_trait]
impl SourceAdapter for FlatAdapter {
    fn name(&self) -> &'static str {
        "flat"
    }

    async fn adapt(&self, payload: &Value, _ctx: &AdapterContext) -> AdapterResult<AdapterOutput> {
        self.adapt_value(payload)
    }
}

/// `{value: x}` → `x`, anything else unchanged
fn unwrap_value(raw: &Value) -> &Value {
    match raw {
        Value::Object(map) if map.contains_key("value") => &map["value"],
        other => other,
    }
}

/// `{lat, lon|lng}` → latitude / longitude passthrough
fn insert_coordinates(coords: &Value, output: &mut AdapterOutput) {
    let Some(map) = coords.as_object() else {
        return;
    };
    let pick = |map: &Map<String, Value>, keys: &[&str]| {
        keys.iter().find_map(|k| map.get(*k).filter(|v| v.is_number()).cloned())
    };
    if let Some(lat) = pick(map, &["lat", "latitude"]) {
        output.passthrough.insert("latitude".into(), lat);
    }
    if let Some(lon) = pick(map, &["lon", "lng", "longitude"]) {
        output.passthrough.insert("longitude".into(), lon);
    }
}
