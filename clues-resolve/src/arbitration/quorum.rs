//! LLM quorum voting and cross-field validation
//!
//! Post-passes over an arbitrated record:
//! - [`apply_llm_quorum`] replaces a last-writer value with the value shared by
//!   at least `min_quorum` LLMs, when every contributor was an LLM
//! - [`flag_single_source_llm_fields`] marks LLM-only values nobody
//!   corroborated
//! - [`validate_bathroom_math`] checks `20 ≈ 18 + 0.5 × 19`

use super::compare::values_agree;
use crate::adapters::source_confidence::is_llm_source;
use crate::record::{AuditAction, PropertyRecord};
use crate::types::{Confidence, FieldId, FieldValue, ValidationStatus};
use serde::Serialize;
use tracing::{debug, info};

/// Allowed gap between stated and computed total bathrooms
pub const BATHROOM_TOLERANCE: f64 = 0.5;

/// Source label recorded on quorum winners
pub const LLM_QUORUM: &str = "LLM Quorum";

/// Result of voting on one conflicted field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuorumOutcome {
    pub field: FieldId,
    pub value: FieldValue,
    pub votes: usize,
    pub llm_sources: Vec<String>,
    pub confidence: Confidence,
}

struct Ballot {
    value: FieldValue,
    sources: Vec<String>,
}

/// Resolve LLM-only conflicts by agreement count
///
/// A value wins when it has strictly more distinct supporting sources than any
/// other and at least `min_quorum` of them. Winners get Medium confidence, or
/// High with three or more votes. Fields without a clear winner are left as
/// arbitrated.
pub fn apply_llm_quorum(record: &mut PropertyRecord, min_quorum: usize) -> Vec<QuorumOutcome> {
    let candidates: Vec<FieldId> = record
        .slots()
        .filter(|(_, slot)| {
            slot.has_conflict
                && !slot.conflict_values.is_empty()
                && slot.conflict_values.iter().all(|c| is_llm_source(&c.source))
        })
        .map(|(id, _)| *id)
        .collect();

    let mut outcomes = Vec::new();
    for field in candidates {
        let Some(slot) = record.slot_mut(field) else {
            continue;
        };

        let mut ballots: Vec<Ballot> = Vec::new();
        for entry in &slot.conflict_values {
            match ballots.iter_mut().find(|b| values_agree(&b.value, &entry.value)) {
                Some(ballot) => {
                    if !ballot.sources.contains(&entry.source) {
                        ballot.sources.push(entry.source.clone());
                    }
                }
                None => ballots.push(Ballot {
                    value: entry.value.clone(),
                    sources: vec![entry.source.clone()],
                }),
            }
        }

        let Some(top) = ballots.iter().map(|b| b.sources.len()).max() else {
            continue;
        };
        let mut leaders = ballots.iter().filter(|b| b.sources.len() == top);
        let (Some(winner), None) = (leaders.next(), leaders.next()) else {
            debug!(field = %field, votes = top, "Quorum tie, keeping arbitrated value");
            continue;
        };
        if top < min_quorum {
            continue;
        }

        let confidence = if top >= 3 {
            Confidence::High
        } else {
            Confidence::Medium
        };
        let outcome = QuorumOutcome {
            field,
            value: winner.value.clone(),
            votes: top,
            llm_sources: winner.sources.clone(),
            confidence,
        };

        let unchanged = slot.value.as_ref() == Some(&outcome.value)
            && slot.confidence == Some(confidence)
            && slot.llm_sources == outcome.llm_sources;
        if !unchanged {
            slot.value = Some(outcome.value.clone());
            slot.confidence = Some(confidence);
            slot.llm_sources = outcome.llm_sources.clone();
            slot.value_source = Some(LLM_QUORUM.to_string());
            slot.notes = Some(format!("{} of {} LLM sources agree", top, slot.sources.len()));
            record.push_audit(
                Some(field),
                &field.to_string(),
                LLM_QUORUM,
                AuditAction::Overwrite,
                Some(format!("{} votes", top)),
            );
            record.touch();
        }
        outcomes.push(outcome);
    }

    if !outcomes.is_empty() {
        info!(fields = outcomes.len(), min_quorum, "LLM quorum applied");
    }
    outcomes
}

/// Mark populated fields backed by exactly one LLM and no other source
pub fn flag_single_source_llm_fields(record: &mut PropertyRecord) -> Vec<FieldId> {
    let flagged: Vec<FieldId> = record
        .slots()
        .filter(|(_, slot)| {
            let mut distinct: Vec<&String> = slot.sources.iter().collect();
            distinct.sort();
            distinct.dedup();
            slot.is_populated()
                && !slot.has_conflict
                && distinct.len() == 1
                && is_llm_source(distinct[0])
                && slot.validation_status != Some(ValidationStatus::SingleSourceWarning)
        })
        .map(|(id, _)| *id)
        .collect();

    for field in &flagged {
        if let Some(slot) = record.slot_mut(*field) {
            slot.validation_status = Some(ValidationStatus::SingleSourceWarning);
            slot.validation_message =
                Some("Only one LLM reported this value; verify independently".to_string());
        }
    }
    flagged
}

/// Check total bathrooms against full and half counts
///
/// Returns the warning message when the numbers disagree; the message is also
/// stored on field 20.
pub fn validate_bathroom_math(record: &mut PropertyRecord) -> Option<String> {
    let full = record.number(FieldId::new(18))?;
    let half = record.number(FieldId::new(19))?;
    let total = record.number(FieldId::new(20))?;

    let expected = full + 0.5 * half;
    if (total - expected).abs() <= BATHROOM_TOLERANCE {
        return None;
    }

    let message = format!(
        "Bathroom math mismatch: {} full + {} half = {}, but total is {}",
        full, half, expected, total
    );
    if let Some(slot) = record.slot_mut(FieldId::new(20)) {
        slot.validation_status = Some(ValidationStatus::Warning);
        slot.validation_message = Some(message.clone());
    }
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitration::ArbitrationEngine;
    use crate::schema::SchemaRegistry;
    use crate::types::SourceTuple;
    use std::sync::Arc;

    fn setup() -> (ArbitrationEngine, PropertyRecord) {
        let registry = Arc::new(SchemaRegistry::standard().unwrap());
        let record = PropertyRecord::new(&registry);
        (ArbitrationEngine::new(registry), record)
    }

    #[test]
    fn test_quorum_overrides_last_writer() {
        let (engine, mut record) = setup();
        for (value, source) in [
            (2005, "LLM:Perplexity"),
            (2005, "LLM:Grok"),
            (1998, "LLM:Gemini"),
        ] {
            engine.apply(&mut record, SourceTuple::new("25", value, source, Confidence::Medium));
        }
        assert_eq!(record.number(FieldId::new(25)), Some(1998.0));

        let outcomes = apply_llm_quorum(&mut record, 2);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].votes, 2);
        assert_eq!(outcomes[0].confidence, Confidence::Medium);

        let slot = record.slot(FieldId::new(25)).unwrap();
        assert_eq!(slot.value, Some(FieldValue::Number(2005.0)));
        assert_eq!(slot.llm_sources, vec!["LLM:Perplexity", "LLM:Grok"]);
        assert!(slot.has_conflict);
    }

    #[test]
    fn test_quorum_ignores_fields_with_non_llm_sources() {
        let (engine, mut record) = setup();
        engine.apply(&mut record, SourceTuple::new("25", 2005, "Stellar MLS", Confidence::High));
        engine.apply(&mut record, SourceTuple::new("25", 1998, "LLM:Grok", Confidence::Medium));
        engine.apply(&mut record, SourceTuple::new("25", 1998, "LLM:Gemini", Confidence::Medium));
        assert!(apply_llm_quorum(&mut record, 2).is_empty());
    }

    #[test]
    fn test_quorum_tie_keeps_value() {
        let (engine, mut record) = setup();
        engine.apply(&mut record, SourceTuple::new("25", 2005, "LLM:Grok", Confidence::Medium));
        engine.apply(&mut record, SourceTuple::new("25", 1998, "LLM:Gemini", Confidence::Medium));
        assert!(apply_llm_quorum(&mut record, 1).is_empty());
        assert_eq!(record.number(FieldId::new(25)), Some(1998.0));
    }

    #[test]
    fn test_single_source_llm_warning() {
        let (engine, mut record) = setup();
        engine.apply(&mut record, SourceTuple::new("119", "AE", "LLM:Perplexity", Confidence::High));
        engine.apply(&mut record, SourceTuple::new("17", 3, "Stellar MLS", Confidence::High));

        let flagged = flag_single_source_llm_fields(&mut record);
        assert_eq!(flagged, vec![FieldId::new(119)]);
        assert_eq!(
            record.slot(FieldId::new(119)).unwrap().validation_status,
            Some(ValidationStatus::SingleSourceWarning)
        );
        assert!(flag_single_source_llm_fields(&mut record).is_empty());
    }

    #[test]
    fn test_bathroom_math() {
        let (engine, mut record) = setup();
        engine.apply(&mut record, SourceTuple::new("18", 2, "A", Confidence::High));
        engine.apply(&mut record, SourceTuple::new("19", 1, "A", Confidence::High));
        engine.apply(&mut record, SourceTuple::new("20", 2.5, "A", Confidence::High));
        assert!(validate_bathroom_math(&mut record).is_none());

        engine.apply(&mut record, SourceTuple::new("20", 4, "B", Confidence::High));
        let message = validate_bathroom_math(&mut record).unwrap();
        assert_eq!(message, "Bathroom math mismatch: 2 full + 1 half = 2.5, but total is 4");
        assert_eq!(
            record.slot(FieldId::new(20)).unwrap().validation_status,
            Some(ValidationStatus::Warning)
        );
    }
}
