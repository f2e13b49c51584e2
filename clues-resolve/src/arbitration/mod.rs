//! Field Resolution & Arbitration Engine
//!
//! Merges [`SourceTuple`]s into a [`PropertyRecord`], one slot at a time.
//!
//! # Slot state machine
//! `Empty → Populated → [Conflicted]`
//! - the first tuple with a usable coerced value populates an empty slot
//! - a later disagreeing tuple overwrites the value (**last writer wins**);
//!   both `(source, value)` pairs are kept in `conflict_values`, which grows
//!   on every further disagreement
//! - an agreeing tuple only appends its source (corroboration)
//! - null, empty or invalid values never change a slot
//!
//! # Ordering
//! The engine applies no priority between sources under the default policy:
//! call order is the tie-break. Callers must feed sources from least to most
//! authoritative (see [`crate::pipeline::ResolutionPipeline`]), or opt into
//! [`ArbitrationPolicy::TierPrecedence`], which keeps a more trusted tier's
//! value and records the newcomer as a conflict.
//!
//! # Concurrency
//! Application to one record is serialised through [`SharedRecord`]; the
//! registry is shared read-only.

pub mod compare;
pub mod quorum;

use crate::adapters::source_confidence::{is_llm_source, source_tier};
use crate::record::{AuditAction, ConflictValue, PropertyRecord};
use crate::schema::coerce::{try_coerce, CoerceRejection};
use crate::schema::SchemaRegistry;
use crate::types::{Confidence, FieldId, FieldValue, SourceTuple};
use chrono::Utc;
use clues_common::{Error, Result};
use compare::values_agree;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

// ============================================================================
// Policy
// ============================================================================

/// How a disagreeing value is arbitrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArbitrationPolicy {
    /// Newest value wins; disagreement is recorded as a conflict
    #[default]
    LastWriterWins,
    /// A less trusted source tier never replaces a more trusted one
    TierPrecedence,
}

impl FromStr for ArbitrationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-writer-wins" | "lww" => Ok(ArbitrationPolicy::LastWriterWins),
            "tier-precedence" | "tier" => Ok(ArbitrationPolicy::TierPrecedence),
            other => Err(Error::Config(format!(
                "Unknown arbitration policy: {:?} (expected last-writer-wins or tier-precedence)",
                other
            ))),
        }
    }
}

/// Counts for one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub set: usize,
    pub corroborated: usize,
    pub overwritten: usize,
    pub conflicts: usize,
    pub skipped: usize,
    pub invalid: usize,
    pub unknown: usize,
}

impl ApplySummary {
    fn count(&mut self, action: AuditAction) {
        match action {
            AuditAction::Set => self.set += 1,
            AuditAction::Corroborate => self.corroborated += 1,
            AuditAction::Overwrite => self.overwritten += 1,
            AuditAction::Conflict => self.conflicts += 1,
            AuditAction::ValidationFailed => self.invalid += 1,
            AuditAction::UnknownField => self.unknown += 1,
            _ => self.skipped += 1,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Applies source tuples to property records
#[derive(Debug, Clone)]
pub struct ArbitrationEngine {
    registry: Arc<SchemaRegistry>,
    policy: ArbitrationPolicy,
}

impl ArbitrationEngine {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_policy(registry, ArbitrationPolicy::default())
    }

    pub fn with_policy(registry: Arc<SchemaRegistry>, policy: ArbitrationPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> ArbitrationPolicy {
        self.policy
    }

    /// Apply a batch in order; one bad tuple never aborts the rest
    pub fn apply_all(
        &self,
        record: &mut PropertyRecord,
        tuples: impl IntoIterator<Item = SourceTuple>,
    ) -> ApplySummary {
        let mut summary = ApplySummary::default();
        for tuple in tuples {
            summary.count(self.apply(record, tuple));
        }
        summary
    }

    /// Apply one tuple and report what happened
    pub fn apply(&self, record: &mut PropertyRecord, tuple: SourceTuple) -> AuditAction {
        let Some(def) = self.registry.resolve_token(&tuple.token) else {
            warn!(token = %tuple.token, source = %tuple.source, "Unknown field token dropped");
            record.push_audit(None, &tuple.token, &tuple.source, AuditAction::UnknownField, None);
            return AuditAction::UnknownField;
        };
        let field = def.id;

        let value = match try_coerce(def, &tuple.value) {
            Ok(value) => value,
            Err(CoerceRejection::Empty) => {
                debug!(field = %field, source = %tuple.source, "Empty value skipped");
                record.push_audit(Some(field), &tuple.token, &tuple.source, AuditAction::Skip, None);
                return AuditAction::Skip;
            }
            Err(rejection) => {
                let detail = match rejection {
                    CoerceRejection::OutOfRange { value, min, max } => {
                        format!("{} outside {}..={}", value, min, max)
                    }
                    _ => format!("Cannot read {} as {:?}", tuple.value, def.field_type),
                };
                debug!(field = %field, source = %tuple.source, reason = %detail, "Value rejected");
                record.push_audit(
                    Some(field),
                    &tuple.token,
                    &tuple.source,
                    AuditAction::ValidationFailed,
                    Some(detail),
                );
                return AuditAction::ValidationFailed;
            }
        };

        let policy = self.policy;
        let Some(slot) = record.slot_mut(field) else {
            warn!(field = %field, "Record has no slot for registry field");
            record.push_audit(Some(field), &tuple.token, &tuple.source, AuditAction::UnknownField, None);
            return AuditAction::UnknownField;
        };

        let now = Utc::now();
        let mut llm_names = tuple.llm_sources.clone();
        if is_llm_source(&tuple.source) {
            llm_names.push(tuple.source.clone());
        }

        let action = match slot.value.clone().filter(|v| v.is_populated()) {
            None => {
                slot.value = Some(value);
                slot.confidence = Some(tuple.confidence);
                slot.value_source = Some(tuple.source.clone());
                slot.method = tuple.method;
                slot.source_url = tuple.url.clone();
                if tuple.note.is_some() {
                    slot.notes = tuple.note.clone();
                }
                AuditAction::Set
            }
            Some(previous) if values_agree(&previous, &value) => {
                slot.confidence = slot.confidence.max(Some(tuple.confidence));
                if slot.has_conflict {
                    record_vote(&mut slot.conflict_values, &tuple.source, &value);
                }
                AuditAction::Corroborate
            }
            Some(previous) => {
                let previous_source = slot.last_source().unwrap_or_default().to_string();
                let keeps_previous = policy == ArbitrationPolicy::TierPrecedence
                    && source_tier(&previous_source).outranks(source_tier(&tuple.source));

                if !slot.has_conflict {
                    // Every source so far agreed with the current value
                    let mut earlier = slot.sources.clone();
                    if earlier.is_empty() {
                        earlier.push(previous_source);
                    }
                    for source in &earlier {
                        record_vote(&mut slot.conflict_values, source, &previous);
                    }
                }
                record_vote(&mut slot.conflict_values, &tuple.source, &value);
                slot.has_conflict = true;

                if keeps_previous {
                    AuditAction::Conflict
                } else {
                    slot.value = Some(value);
                    slot.confidence = Some(tuple.confidence);
                    slot.value_source = Some(tuple.source.clone());
                    slot.method = tuple.method;
                    slot.source_url = tuple.url.clone();
                    if tuple.note.is_some() {
                        slot.notes = tuple.note.clone();
                    }
                    AuditAction::Overwrite
                }
            }
        };

        slot.sources.push(tuple.source.clone());
        for name in llm_names {
            if !slot.llm_sources.contains(&name) {
                slot.llm_sources.push(name);
            }
        }
        if let Some((status, message)) = tuple.validation.clone() {
            slot.validation_status = Some(status);
            slot.validation_message = message;
        }
        slot.updated_at = Some(now);

        debug!(
            field = %field,
            source = %tuple.source,
            action = ?action,
            "Tuple applied"
        );
        record.push_audit(Some(field), &tuple.token, &tuple.source, action, None);
        record.touch();
        action
    }

    /// Record a "tried, nothing found" outcome without touching the value
    ///
    /// An empty slot takes the note and Low confidence; a populated slot only
    /// gains the audit entry.
    pub fn record_absent(
        &self,
        record: &mut PropertyRecord,
        field: FieldId,
        source: &str,
        note: &str,
    ) {
        if let Some(slot) = record.slot_mut(field) {
            if !slot.is_populated() {
                slot.notes = Some(note.to_string());
                slot.confidence = Some(Confidence::Low);
            }
        }
        record.push_audit(
            Some(field),
            &field.to_string(),
            source,
            AuditAction::NotFound,
            Some(note.to_string()),
        );
    }
}

/// Append `(source, value)` unless that exact vote is already recorded
fn record_vote(votes: &mut Vec<ConflictValue>, source: &str, value: &FieldValue) {
    if !votes
        .iter()
        .any(|c| c.source == source && values_agree(&c.value, value))
    {
        votes.push(ConflictValue {
            source: source.to_string(),
            value: value.clone(),
        });
    }
}

// ============================================================================
// Shared record
// ============================================================================

/// One property record behind an async mutex
///
/// Adapters may finish in any order; every batch is applied inside the lock
/// so no update is lost.
#[derive(Debug, Clone)]
pub struct SharedRecord {
    inner: Arc<Mutex<PropertyRecord>>,
}

impl SharedRecord {
    pub fn new(record: PropertyRecord) -> Self {
        Self {
            inner: Arc::new(Mutex::new(record)),
        }
    }

    /// Apply a batch atomically with respect to other batches
    pub async fn apply(
        &self,
        engine: &ArbitrationEngine,
        tuples: Vec<SourceTuple>,
    ) -> ApplySummary {
        let mut record = self.inner.lock().await;
        let summary = engine.apply_all(&mut record, tuples);
        info!(
            record = %record.id,
            set = summary.set,
            overwritten = summary.overwritten,
            conflicts = summary.conflicts,
            unknown = summary.unknown,
            "Batch applied"
        );
        summary
    }

    /// Run `f` with exclusive access to the record
    pub async fn with<R>(&self, f: impl FnOnce(&mut PropertyRecord) -> R) -> R {
        let mut record = self.inner.lock().await;
        f(&mut record)
    }

    /// Clone of the current state
    pub async fn snapshot(&self) -> PropertyRecord {
        self.inner.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExtractionMethod;
    use serde_json::json;

    fn engine(policy: ArbitrationPolicy) -> (ArbitrationEngine, PropertyRecord) {
        let registry = Arc::new(SchemaRegistry::standard().unwrap());
        let record = PropertyRecord::new(&registry);
        (ArbitrationEngine::with_policy(registry, policy), record)
    }

    fn price() -> FieldId {
        FieldId::new(10)
    }

    #[test]
    fn test_last_writer_wins_with_conflict() {
        let (engine, mut record) = engine(ArbitrationPolicy::LastWriterWins);
        engine.apply(&mut record, SourceTuple::new("10", 450000, "A", Confidence::High));
        let action =
            engine.apply(&mut record, SourceTuple::new("10", 465000, "B", Confidence::Low));
        assert_eq!(action, AuditAction::Overwrite);

        let slot = record.slot(price()).unwrap();
        assert_eq!(slot.value, Some(FieldValue::Number(465000.0)));
        assert_eq!(slot.sources, vec!["A", "B"]);
        assert!(slot.has_conflict);
        assert_eq!(slot.conflict_values.len(), 2);
        assert_eq!(slot.conflict_values[0].source, "A");
        assert_eq!(slot.conflict_values[1].source, "B");
        assert_eq!(slot.confidence, Some(Confidence::Low));
    }

    #[test]
    fn test_conflict_list_grows_on_each_disagreement() {
        let (engine, mut record) = engine(ArbitrationPolicy::LastWriterWins);
        for (value, source) in [(450000, "A"), (465000, "B"), (480000, "C")] {
            engine.apply(&mut record, SourceTuple::new("10", value, source, Confidence::High));
        }
        let slot = record.slot(price()).unwrap();
        let sources: Vec<&str> = slot.conflict_values.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_agreeing_value_corroborates() {
        let (engine, mut record) = engine(ArbitrationPolicy::LastWriterWins);
        engine.apply(&mut record, SourceTuple::new("10", 450000, "A", Confidence::Medium));
        let action =
            engine.apply(&mut record, SourceTuple::new("10", "$451,000", "B", Confidence::High));
        assert_eq!(action, AuditAction::Corroborate);

        let slot = record.slot(price()).unwrap();
        assert_eq!(slot.value, Some(FieldValue::Number(450000.0)));
        assert!(!slot.has_conflict);
        assert_eq!(slot.sources, vec!["A", "B"]);
        assert_eq!(slot.confidence, Some(Confidence::High));
    }

    #[test]
    fn test_null_and_invalid_never_change_slot() {
        let (engine, mut record) = engine(ArbitrationPolicy::LastWriterWins);
        assert_eq!(
            engine.apply(&mut record, SourceTuple::new("10", json!(null), "A", Confidence::High)),
            AuditAction::Skip
        );
        assert!(record.slot(price()).unwrap().value.is_none());

        engine.apply(&mut record, SourceTuple::new("10", 450000, "A", Confidence::High));
        assert_eq!(
            engine.apply(&mut record, SourceTuple::new("10", "", "B", Confidence::High)),
            AuditAction::Skip
        );
        assert_eq!(
            engine.apply(&mut record, SourceTuple::new("10", "call agent", "C", Confidence::High)),
            AuditAction::ValidationFailed
        );
        assert_eq!(
            engine.apply(&mut record, SourceTuple::new("10", -1, "D", Confidence::High)),
            AuditAction::ValidationFailed
        );
        let slot = record.slot(price()).unwrap();
        assert_eq!(slot.value, Some(FieldValue::Number(450000.0)));
        assert_eq!(slot.sources, vec!["A"]);
    }

    #[test]
    fn test_unknown_token_is_dropped_and_audited() {
        let (engine, mut record) = engine(ArbitrationPolicy::LastWriterWins);
        let before = record.clone();
        let summary = engine.apply_all(
            &mut record,
            vec![
                SourceTuple::new("999_mystery", 1, "A", Confidence::High),
                SourceTuple::new("17", 3, "A", Confidence::High),
            ],
        );
        assert_eq!(summary.unknown, 1);
        assert_eq!(summary.set, 1);
        assert_eq!(record.len(), before.len());
        assert_eq!(record.audit[0].action, AuditAction::UnknownField);
    }

    #[test]
    fn test_tier_precedence_keeps_trusted_value() {
        let (engine, mut record) = engine(ArbitrationPolicy::TierPrecedence);
        engine.apply(&mut record, SourceTuple::new("10", 450000, "Stellar MLS", Confidence::High));
        let action = engine.apply(
            &mut record,
            SourceTuple::new("10", 500000, "LLM:Perplexity", Confidence::Medium),
        );
        assert_eq!(action, AuditAction::Conflict);

        let slot = record.slot(price()).unwrap();
        assert_eq!(slot.value, Some(FieldValue::Number(450000.0)));
        assert!(slot.has_conflict);
        assert_eq!(slot.conflict_values.len(), 2);
        assert_eq!(slot.llm_sources, vec!["LLM:Perplexity"]);

        // A more trusted tier still replaces a less trusted one
        engine.apply(&mut record, SourceTuple::new("12", 440000, "LLM:Grok", Confidence::Low));
        let action =
            engine.apply(&mut record, SourceTuple::new("12", 470000, "Zillow API", Confidence::High));
        assert_eq!(action, AuditAction::Overwrite);
    }

    #[test]
    fn test_extraction_metadata_and_absent_notes() {
        let (engine, mut record) = engine(ArbitrationPolicy::LastWriterWins);
        engine.apply(
            &mut record,
            SourceTuple::new("16a", "$400,000", "zillow.com", Confidence::High)
                .with_method(ExtractionMethod::StructuredData)
                .with_url("https://www.zillow.com/homedetails/1"),
        );
        let slot = record.slot(FieldId::sub(16, 'a')).unwrap();
        assert_eq!(slot.method, Some(ExtractionMethod::StructuredData));
        assert!(slot.source_url.as_deref().unwrap().contains("zillow"));

        engine.record_absent(&mut record, FieldId::sub(16, 'b'), "Web Search", "No search results returned");
        let slot = record.slot(FieldId::sub(16, 'b')).unwrap();
        assert!(slot.value.is_none());
        assert_eq!(slot.confidence, Some(Confidence::Low));
        assert!(record.was_attempted(FieldId::sub(16, 'b')));
        assert!(!record.was_attempted(FieldId::sub(16, 'c')));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "tier-precedence".parse::<ArbitrationPolicy>().unwrap(),
            ArbitrationPolicy::TierPrecedence
        );
        assert!("most-votes".parse::<ArbitrationPolicy>().is_err());
    }

    #[tokio::test]
    async fn test_shared_record_serialises_batches() {
        let registry = Arc::new(SchemaRegistry::standard().unwrap());
        let engine = Arc::new(ArbitrationEngine::new(registry.clone()));
        let shared = SharedRecord::new(PropertyRecord::new(&registry));

        let mut handles = Vec::new();
        for i in 0..8 {
            let engine = engine.clone();
            let shared = shared.clone();
            handles.push(tokio::spawn(async move {
                let tuples = vec![SourceTuple::new(
                    "10",
                    400000 + i * 50000,
                    format!("source-{}", i),
                    Confidence::High,
                )];
                shared.apply(&engine, tuples).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = shared.snapshot().await;
        let slot = record.slot(FieldId::new(10)).unwrap();
        assert_eq!(slot.sources.len(), 8);
        assert_eq!(slot.conflict_values.len(), 8);
    }
}
