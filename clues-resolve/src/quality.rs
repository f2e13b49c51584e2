//! Data-Quality & Score Aggregator
//!
//! Computes completeness and a composite score from a resolved record.
//!
//! # Scoring
//! - **Group completeness**: populated slots ÷ slots in the group × 100
//! - **Overall completeness**: populated slots ÷ schema fields × 100
//! - **Composite score**: Σ confidence weight of populated slots ÷ schema
//!   fields × 100, clamped to [0, 100]. A slot without a confidence label
//!   weighs as `Low`.
//!
//! The composite score only grows when a slot is populated or its confidence
//! rises.
//!
//! # Multi-record aggregation
//! Group completeness across records is Σ populated ÷ Σ group total, so
//! records with a larger schema (more subfields) weigh in proportion.

use crate::record::PropertyRecord;
use crate::schema::{FieldGroup, SchemaRegistry};
use crate::types::Confidence;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Named id range used by the section report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionRange {
    pub name: &'static str,
    pub min: u16,
    pub max: u16,
}

pub const DATA_QUALITY_RANGES: [SectionRange; 7] = [
    SectionRange { name: "Core", min: 1, max: 38 },
    SectionRange { name: "Structural", min: 39, max: 62 },
    SectionRange { name: "Location", min: 63, max: 90 },
    SectionRange { name: "Financial", min: 91, max: 116 },
    SectionRange { name: "Environment", min: 117, max: 138 },
    SectionRange { name: "Stellar MLS", min: 139, max: 168 },
    SectionRange { name: "Market Performance", min: 169, max: 181 },
];

/// Populated vs total slot counts for one group or section
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub name: String,
    pub populated: usize,
    pub total: usize,
    pub percent: f64,
}

impl Coverage {
    fn new(name: impl Into<String>, populated: usize, total: usize) -> Self {
        Self {
            name: name.into(),
            populated,
            total,
            percent: percent(populated, total),
        }
    }
}

/// Full quality summary of one record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub overall_completeness: f64,
    pub composite_score: f64,
    pub populated: usize,
    pub total: usize,
    pub conflicts: usize,
    pub low_confidence: usize,
    pub groups: Vec<Coverage>,
    pub sections: Vec<Coverage>,
}

fn percent(populated: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(populated as f64 / total as f64 * 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Quality aggregator over one schema
#[derive(Debug, Clone)]
pub struct QualityAggregator {
    registry: Arc<SchemaRegistry>,
}

impl QualityAggregator {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    fn group_counts(&self, record: &PropertyRecord, group: FieldGroup) -> (usize, usize) {
        let defs = self.registry.fields_in_group(group);
        let populated = defs
            .iter()
            .filter(|d| record.slot(d.id).is_some_and(|s| s.is_populated()))
            .count();
        (populated, defs.len())
    }

    /// Completeness per group, in display order
    pub fn completeness_by_group(&self, record: &PropertyRecord) -> Vec<Coverage> {
        self.registry
            .groups()
            .into_iter()
            .map(|group| {
                let (populated, total) = self.group_counts(record, group);
                Coverage::new(group.label(), populated, total)
            })
            .collect()
    }

    /// Completeness per [`DATA_QUALITY_RANGES`] section
    pub fn completeness_by_section(&self, record: &PropertyRecord) -> Vec<Coverage> {
        DATA_QUALITY_RANGES
            .iter()
            .map(|range| {
                let defs = self.registry.fields_in_range(range.min, range.max);
                let populated = defs
                    .iter()
                    .filter(|d| record.slot(d.id).is_some_and(|s| s.is_populated()))
                    .count();
                Coverage::new(range.name, populated, defs.len())
            })
            .collect()
    }

    pub fn overall_completeness(&self, record: &PropertyRecord) -> f64 {
        percent(record.populated_count(), self.registry.len())
    }

    pub fn composite_score(&self, record: &PropertyRecord) -> f64 {
        let total = self.registry.len();
        if total == 0 {
            return 0.0;
        }
        let weighted: f64 = record
            .slots()
            .filter(|(_, s)| s.is_populated())
            .map(|(_, s)| s.confidence.unwrap_or(Confidence::Low).weight())
            .sum();
        round1(weighted / total as f64 * 100.0).clamp(0.0, 100.0)
    }

    pub fn report(&self, record: &PropertyRecord) -> QualityReport {
        let populated: Vec<_> = record.slots().filter(|(_, s)| s.is_populated()).collect();
        QualityReport {
            overall_completeness: self.overall_completeness(record),
            composite_score: self.composite_score(record),
            populated: populated.len(),
            total: self.registry.len(),
            conflicts: record.slots().filter(|(_, s)| s.has_conflict).count(),
            low_confidence: populated
                .iter()
                .filter(|(_, s)| s.confidence.unwrap_or(Confidence::Low) == Confidence::Low)
                .count(),
            groups: self.completeness_by_group(record),
            sections: self.completeness_by_section(record),
        }
    }

    /// Compute the report and store the summaries on the record
    pub fn finalize(&self, record: &mut PropertyRecord) -> QualityReport {
        let report = self.report(record);
        record.completeness = Some(report.overall_completeness);
        record.composite_score = Some(report.composite_score);
        info!(
            record_id = %record.id,
            completeness = report.overall_completeness,
            composite_score = report.composite_score,
            conflicts = report.conflicts,
            "Record quality computed"
        );
        report
    }

    /// Per-group completeness across several records
    pub fn aggregate(&self, records: &[PropertyRecord]) -> Vec<Coverage> {
        self.registry
            .groups()
            .into_iter()
            .map(|group| {
                let (populated, total) = records
                    .iter()
                    .map(|r| self.group_counts(r, group))
                    .fold((0, 0), |(p, t), (rp, rt)| (p + rp, t + rt));
                Coverage::new(group.label(), populated, total)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitration::ArbitrationEngine;
    use crate::types::SourceTuple;
    use serde_json::json;

    fn setup() -> (Arc<SchemaRegistry>, ArbitrationEngine, QualityAggregator) {
        let registry = Arc::new(SchemaRegistry::standard().unwrap());
        (
            registry.clone(),
            ArbitrationEngine::new(registry.clone()),
            QualityAggregator::new(registry),
        )
    }

    fn tuple(token: &str, value: serde_json::Value, confidence: Confidence) -> SourceTuple {
        SourceTuple::new(token, value, "Stellar MLS", confidence)
    }

    #[test]
    fn test_empty_record_scores_zero() {
        let (registry, _, quality) = setup();
        let record = PropertyRecord::new(&registry);
        let report = quality.report(&record);

        assert_eq!(report.overall_completeness, 0.0);
        assert_eq!(report.composite_score, 0.0);
        assert!(report.groups.iter().all(|g| g.percent == 0.0));
        assert_eq!(report.sections.len(), DATA_QUALITY_RANGES.len());
    }

    #[test]
    fn test_full_group_is_hundred_percent() {
        let (registry, engine, quality) = setup();
        let mut record = PropertyRecord::new(&registry);
        for def in registry.fields_in_group(FieldGroup::AssignedSchools) {
            let value = if def.field_type.is_numeric() { json!(5) } else { json!("Lincoln") };
            let value = def.options.first().map(|o| json!(o)).unwrap_or(value);
            engine.apply(&mut record, tuple(&def.token(), value, Confidence::High));
        }

        let groups = quality.completeness_by_group(&record);
        let schools = groups
            .iter()
            .find(|g| g.name == FieldGroup::AssignedSchools.label())
            .unwrap();
        assert_eq!(schools.populated, schools.total);
        assert_eq!(schools.percent, 100.0);
        assert!(groups.iter().all(|g| (0.0..=100.0).contains(&g.percent)));
    }

    #[test]
    fn test_blank_text_counts_as_empty() {
        let (registry, engine, quality) = setup();
        let mut record = PropertyRecord::new(&registry);
        engine.apply(&mut record, tuple("2_mls_primary", json!("   "), Confidence::High));
        assert_eq!(quality.overall_completeness(&record), 0.0);
    }

    #[test]
    fn test_composite_score_monotonic() {
        let (registry, engine, quality) = setup();
        let mut record = PropertyRecord::new(&registry);

        engine.apply(&mut record, tuple("17_bedrooms", json!(3), Confidence::Low));
        let one_low = quality.composite_score(&record);

        engine.apply(&mut record, tuple("21_living_sqft", json!(1850), Confidence::Medium));
        let two = quality.composite_score(&record);
        assert!(two > one_low);

        engine.apply(&mut record, tuple("17_bedrooms", json!(3), Confidence::High));
        let raised = quality.composite_score(&record);
        assert!(raised >= two);
        assert!((0.0..=100.0).contains(&raised));
    }

    #[test]
    fn test_finalize_stores_summaries() {
        let (registry, engine, quality) = setup();
        let mut record = PropertyRecord::new(&registry);
        engine.apply(&mut record, tuple("10_listing_price", json!(450000), Confidence::High));

        let report = quality.finalize(&mut record);
        assert_eq!(record.completeness, Some(report.overall_completeness));
        assert_eq!(record.composite_score, Some(report.composite_score));
        assert_eq!(report.populated, 1);
        let core = report.sections.iter().find(|s| s.name == "Core").unwrap();
        assert_eq!(core.populated, 1);
    }

    #[test]
    fn test_aggregate_uses_counts_not_percent_average() {
        let (registry, engine, quality) = setup();
        let mut full = PropertyRecord::new(&registry);
        let empty = PropertyRecord::new(&registry);
        for def in registry.fields_in_group(FieldGroup::PricingValue) {
            if !def.calculated {
                engine.apply(&mut full, tuple(&def.token(), json!(100000), Confidence::High));
            }
        }

        let per_record = quality.completeness_by_group(&full);
        let pricing = per_record
            .iter()
            .find(|g| g.name == FieldGroup::PricingValue.label())
            .unwrap();

        let combined = quality.aggregate(&[full.clone(), empty]);
        let pricing_combined = combined
            .iter()
            .find(|g| g.name == FieldGroup::PricingValue.label())
            .unwrap();
        assert_eq!(pricing_combined.total, pricing.total * 2);
        assert_eq!(pricing_combined.populated, pricing.populated);
    }
}
