//! Property records and field slots
//!
//! A [`PropertyRecord`] always holds exactly one [`FieldSlot`] per registry
//! field. Slots are created empty and only ever overwritten, by the
//! arbitration engine or the calculated-field resolver.

use crate::adapters::address::AddressParts;
use crate::schema::SchemaRegistry;
use crate::types::{Confidence, ExtractionMethod, FieldId, FieldValue, ValidationStatus};
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// Slots
// ============================================================================

/// A disagreeing `(source, value)` pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictValue {
    pub source: String,
    #[serde(serialize_with = "serialize_value")]
    pub value: FieldValue,
}

/// Resolved state of one field for one property
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSlot {
    #[serde(serialize_with = "serialize_opt_value")]
    pub value: Option<FieldValue>,
    pub confidence: Option<Confidence>,
    pub notes: Option<String>,
    /// Source of the current value
    #[serde(rename = "source")]
    pub value_source: Option<String>,
    /// Contributing sources, in arrival order
    pub sources: Vec<String>,
    pub llm_sources: Vec<String>,
    pub has_conflict: bool,
    pub conflict_values: Vec<ConflictValue>,
    pub updated_at: Option<DateTime<Utc>>,
    pub validation_status: Option<ValidationStatus>,
    pub validation_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ExtractionMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl FieldSlot {
    pub fn is_populated(&self) -> bool {
        self.value.as_ref().is_some_and(FieldValue::is_populated)
    }

    pub fn number(&self) -> Option<f64> {
        self.value.as_ref().and_then(FieldValue::as_number)
    }

    /// Source of the current value, else the most recent contributor
    pub fn last_source(&self) -> Option<&str> {
        self.value_source
            .as_deref()
            .or_else(|| self.sources.last().map(String::as_str))
    }
}

fn serialize_value<S: Serializer>(value: &FieldValue, s: S) -> Result<S::Ok, S::Error> {
    value.to_json().serialize(s)
}

fn serialize_opt_value<S: Serializer>(value: &Option<FieldValue>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => v.to_json().serialize(s),
        None => s.serialize_none(),
    }
}

// ============================================================================
// Audit trail
// ============================================================================

/// What happened to one incoming value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditAction {
    /// Empty slot populated
    Set,
    /// Same value re-reported; source appended
    Corroborate,
    /// Different value replaced the previous one
    Overwrite,
    /// Different value recorded as a conflict but not applied
    Conflict,
    /// Null or empty value ignored
    Skip,
    /// Value failed coercion or range validation
    ValidationFailed,
    /// Token not in the schema
    UnknownField,
    /// Search attempted, nothing extracted
    NotFound,
    /// Calculation lacked inputs
    Insufficient,
    /// Calculated value written
    Calculated,
}

/// One attempt against one field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub field: Option<FieldId>,
    pub token: String,
    pub source: String,
    pub action: AuditAction,
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

// ============================================================================
// Record
// ============================================================================

/// Canonical per-property record
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    slots: BTreeMap<FieldId, FieldSlot>,
    pub address: AddressParts,
    /// Non-numbered keys carried through untouched (photos, coordinates)
    pub passthrough: BTreeMap<String, Value>,
    /// Listing remarks with mined feature sentences removed
    pub remarks_excised: Option<String>,
    pub audit: Vec<AuditEntry>,
    pub completeness: Option<f64>,
    pub composite_score: Option<f64>,
}

impl PropertyRecord {
    /// Fresh record with one empty slot per registry field
    pub fn new(registry: &SchemaRegistry) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            slots: registry
                .fields()
                .iter()
                .map(|def| (def.id, FieldSlot::default()))
                .collect(),
            address: AddressParts::default(),
            passthrough: BTreeMap::new(),
            remarks_excised: None,
            audit: Vec::new(),
            completeness: None,
            composite_score: None,
        }
    }

    pub fn slot(&self, id: FieldId) -> Option<&FieldSlot> {
        self.slots.get(&id)
    }

    pub(crate) fn slot_mut(&mut self, id: FieldId) -> Option<&mut FieldSlot> {
        self.slots.get_mut(&id)
    }

    pub fn slots(&self) -> impl Iterator<Item = (&FieldId, &FieldSlot)> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn value(&self, id: FieldId) -> Option<&FieldValue> {
        self.slot(id).and_then(|s| s.value.as_ref())
    }

    pub fn number(&self, id: FieldId) -> Option<f64> {
        self.slot(id).and_then(FieldSlot::number)
    }

    pub fn populated_count(&self) -> usize {
        self.slots.values().filter(|s| s.is_populated()).count()
    }

    pub(crate) fn push_audit(
        &mut self,
        field: Option<FieldId>,
        token: &str,
        source: &str,
        action: AuditAction,
        detail: Option<String>,
    ) {
        self.audit.push(AuditEntry {
            field,
            token: token.to_string(),
            source: source.to_string(),
            action,
            detail,
            at: Utc::now(),
        });
    }

    /// Audit entries for one field, oldest first
    pub fn attempts(&self, id: FieldId) -> Vec<&AuditEntry> {
        self.audit.iter().filter(|e| e.field == Some(id)).collect()
    }

    /// True when any source has reported on the field, including "not found"
    pub fn was_attempted(&self, id: FieldId) -> bool {
        self.audit.iter().any(|e| e.field == Some(id))
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// JSON view grouped by field group, slots keyed by `<id>_<key>`
    pub fn to_grouped_json(&self, registry: &SchemaRegistry) -> Value {
        let mut groups = Map::new();
        for group in registry.groups() {
            let mut fields = Map::new();
            for def in registry.fields_in_group(group) {
                if let Some(slot) = self.slots.get(&def.id) {
                    fields.insert(
                        def.token(),
                        serde_json::to_value(slot).unwrap_or(Value::Null),
                    );
                }
            }
            groups.insert(group.label().to_string(), Value::Object(fields));
        }

        json!({
            "id": self.id,
            "createdAt": self.created_at,
            "updatedAt": self.updated_at,
            "address": self.address,
            "groups": groups,
            "passthrough": self.passthrough,
            "remarksExcised": self.remarks_excised,
            "completeness": self.completeness,
            "compositeScore": self.composite_score,
        })
    }

    /// Flat `{token: {value, source, confidence, ...}}` payload of populated
    /// slots, accepted back by the flat adapter
    pub fn to_flat_fields(&self, registry: &SchemaRegistry) -> Map<String, Value> {
        let mut out = Map::new();
        for def in registry.fields() {
            let Some(slot) = self.slots.get(&def.id) else {
                continue;
            };
            let Some(value) = slot.value.as_ref().filter(|v| v.is_populated()) else {
                continue;
            };

            let mut entry = Map::new();
            entry.insert("value".into(), value.to_json());
            if let Some(source) = slot.last_source() {
                entry.insert("source".into(), json!(source));
            }
            if let Some(confidence) = slot.confidence {
                entry.insert("confidence".into(), json!(confidence.label()));
            }
            if !slot.llm_sources.is_empty() {
                entry.insert("llmSources".into(), json!(slot.llm_sources));
            }
            if let Some(status) = slot.validation_status {
                entry.insert("validationStatus".into(), json!(status));
            }
            if let Some(message) = &slot.validation_message {
                entry.insert("validationMessage".into(), json!(message));
            }
            out.insert(def.token(), Value::Object(entry));
        }

        for (key, value) in &self.passthrough {
            out.insert(key.clone(), json!({ "value": value }));
        }
        out
    }
}

/// Field-keyed map serialisation: `{"10": slot, "16a": slot}`
impl Serialize for PropertyRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(9))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("createdAt", &self.created_at)?;
        map.serialize_entry("updatedAt", &self.updated_at)?;
        map.serialize_entry("address", &self.address)?;
        map.serialize_entry("slots", &self.slots)?;
        map.serialize_entry("passthrough", &self.passthrough)?;
        map.serialize_entry("remarksExcised", &self.remarks_excised)?;
        map.serialize_entry("completeness", &self.completeness)?;
        map.serialize_entry("compositeScore", &self.composite_score)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldGroup;

    #[test]
    fn test_new_record_has_one_slot_per_field() {
        let registry = SchemaRegistry::standard().unwrap();
        let record = PropertyRecord::new(&registry);
        assert_eq!(record.len(), registry.len());
        assert_eq!(record.populated_count(), 0);
        assert!(record.slots().all(|(_, s)| s.value.is_none() && !s.has_conflict));
    }

    #[test]
    fn test_flat_fields_only_carry_populated_slots() {
        let registry = SchemaRegistry::standard().unwrap();
        let mut record = PropertyRecord::new(&registry);
        let slot = record.slot_mut(FieldId::new(17)).unwrap();
        slot.value = Some(FieldValue::Number(3.0));
        slot.confidence = Some(Confidence::High);
        slot.sources.push("Stellar MLS".into());
        slot.value_source = Some("Stellar MLS".into());
        record.slot_mut(FieldId::new(6)).unwrap().value = Some(FieldValue::Text("  ".into()));

        let flat = record.to_flat_fields(&registry);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat["17_bedrooms"]["value"], json!(3.0));
        assert_eq!(flat["17_bedrooms"]["source"], json!("Stellar MLS"));
        assert_eq!(flat["17_bedrooms"]["confidence"], json!("High"));
    }

    #[test]
    fn test_grouped_json_has_every_group() {
        let registry = SchemaRegistry::standard().unwrap();
        let record = PropertyRecord::new(&registry);
        let json = record.to_grouped_json(&registry);
        let groups = json["groups"].as_object().unwrap();
        assert_eq!(groups.len(), FieldGroup::ALL.len());
        assert!(groups["Pricing & Value"]
            .as_object()
            .unwrap()
            .contains_key("16a_zestimate"));
    }
}
