//! Calculated-Field Resolver
//!
//! Dependency-aware post-pass that derives fields from already-resolved
//! fields. Never issues external queries.
//!
//! # Ownership
//! - Calculation-only fields (16, 94, 99, 101, 181) are flagged `calculated`
//!   in the registry and always take the computed value.
//! - Derivable fields (11, 20, 24, 37, 93) may also arrive from sources; they
//!   are only filled when empty or when the previous value was itself a
//!   calculation.
//!
//! # Idempotence
//! Re-running on an unchanged record writes nothing: a slot is only touched
//! when its value or note would change.

use crate::adapters::source_confidence::INTERNAL_CALCULATION;
use crate::record::{AuditAction, PropertyRecord};
use crate::schema::SchemaRegistry;
use crate::types::{Confidence, ExtractionMethod, FieldId, FieldValue};
use chrono::Utc;
use clues_common::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Minimum AVM inputs for field 16
pub const MIN_AVMS: usize = 2;

/// Expense share assumed by the cap-rate estimate
pub const EXPENSE_RATIO: f64 = 0.4;

const SQFT_PER_ACRE: f64 = 43_560.0;

/// Target and dependencies of one formula, as seen by the schema registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaDeclaration {
    pub target: FieldId,
    pub depends_on: Vec<FieldId>,
}

/// Computed value and its explanatory note
type Computed = Option<(f64, String)>;

/// One formula of the table
struct Formula {
    target: FieldId,
    depends_on: Vec<FieldId>,
    insufficient: &'static str,
    compute: fn(&[Option<f64>]) -> Computed,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// All inputs present and the denominator (by index) non-zero
fn all<const N: usize>(inputs: &[Option<f64>], denominators: [usize; N]) -> Option<Vec<f64>> {
    let values: Vec<f64> = inputs.iter().copied().collect::<Option<Vec<_>>>()?;
    if denominators.iter().any(|&i| values[i] == 0.0) {
        return None;
    }
    Some(values)
}

fn avm_average(inputs: &[Option<f64>]) -> Computed {
    let avms: Vec<f64> = inputs.iter().flatten().copied().filter(|v| *v > 0.0).collect();
    if avms.len() < MIN_AVMS {
        return None;
    }
    let mean = avms.iter().sum::<f64>() / avms.len() as f64;
    Some((mean.round(), format!("Average of {} AVMs", avms.len())))
}

fn price_vs_median(inputs: &[Option<f64>]) -> Computed {
    let v = all(inputs, [1])?;
    let pct = (v[0] / v[1] * 100.0).round();
    let note = if pct > 100.0 {
        "Above median"
    } else if pct < 100.0 {
        "Below median"
    } else {
        "At median"
    };
    Some((pct, note.to_string()))
}

fn rental_yield(inputs: &[Option<f64>]) -> Computed {
    let v = all(inputs, [1])?;
    Some((
        round2(v[0] * 12.0 / v[1] * 100.0),
        "Gross yield from Fields 98 and 10".to_string(),
    ))
}

fn cap_rate(inputs: &[Option<f64>]) -> Computed {
    let v = all(inputs, [1])?;
    let annual_rent = v[0] * 12.0;
    let noi = annual_rent * (1.0 - EXPENSE_RATIO);
    Some((
        round2(noi / v[1] * 100.0),
        "Estimated with 40% expense ratio".to_string(),
    ))
}

fn market_volatility(inputs: &[Option<f64>]) -> Computed {
    let v = all(inputs, [])?;
    let (appreciation, reduced, sale_to_list) = (v[0], v[1], v[2]);
    let score = (appreciation.abs() * 2.0 + reduced.abs() * 3.0 + (sale_to_list - 100.0).abs())
        .round()
        .min(100.0);
    let note = if score > 50.0 {
        "High volatility"
    } else {
        "Low volatility"
    };
    Some((score, note.to_string()))
}

fn price_per_sqft(inputs: &[Option<f64>]) -> Computed {
    let v = all(inputs, [1])?;
    Some((round2(v[0] / v[1]), "Field 10 ÷ Field 21".to_string()))
}

fn total_bathrooms(inputs: &[Option<f64>]) -> Computed {
    let v = all(inputs, [])?;
    Some((v[0] + 0.5 * v[1], "Field 18 + 0.5 × Field 19".to_string()))
}

fn lot_acres(inputs: &[Option<f64>]) -> Computed {
    let v = all(inputs, [])?;
    Some((round2(v[0] / SQFT_PER_ACRE), "Field 23 ÷ 43,560".to_string()))
}

fn tax_rate(inputs: &[Option<f64>]) -> Computed {
    let v = all(inputs, [1])?;
    Some((round2(v[0] / v[1] * 100.0), "Field 35 ÷ Field 15 × 100".to_string()))
}

fn price_to_rent(inputs: &[Option<f64>]) -> Computed {
    let v = all(inputs, [1])?;
    Some((round2(v[0] / (v[1] * 12.0)), "Field 10 ÷ (Field 98 × 12)".to_string()))
}

fn formula_table() -> Vec<Formula> {
    let n = FieldId::new;
    vec![
        Formula {
            target: n(16),
            depends_on: ['a', 'b', 'c', 'd', 'e', 'f']
                .into_iter()
                .map(|c| FieldId::sub(16, c))
                .collect(),
            insufficient: "Insufficient AVMs (require min 2)",
            compute: avm_average,
        },
        Formula {
            target: n(94),
            depends_on: vec![n(12), n(91)],
            insufficient: "Requires Fields 12 and 91",
            compute: price_vs_median,
        },
        Formula {
            target: n(99),
            depends_on: vec![n(98), n(10)],
            insufficient: "Requires Fields 10 and 98",
            compute: rental_yield,
        },
        Formula {
            target: n(101),
            depends_on: vec![n(98), n(12)],
            insufficient: "Requires Fields 12 and 98",
            compute: cap_rate,
        },
        Formula {
            target: n(181),
            depends_on: vec![n(179), n(173), n(176)],
            insufficient: "Requires Fields 173, 176 and 179",
            compute: market_volatility,
        },
        Formula {
            target: n(11),
            depends_on: vec![n(10), n(21)],
            insufficient: "Requires Fields 10 and 21",
            compute: price_per_sqft,
        },
        Formula {
            target: n(20),
            depends_on: vec![n(18), n(19)],
            insufficient: "Requires Fields 18 and 19",
            compute: total_bathrooms,
        },
        Formula {
            target: n(24),
            depends_on: vec![n(23)],
            insufficient: "Requires Field 23",
            compute: lot_acres,
        },
        Formula {
            target: n(37),
            depends_on: vec![n(35), n(15)],
            insufficient: "Requires Fields 15 and 35",
            compute: tax_rate,
        },
        Formula {
            target: n(93),
            depends_on: vec![n(10), n(98)],
            insufficient: "Requires Fields 10 and 98",
            compute: price_to_rent,
        },
    ]
}

/// Targets and dependencies of every formula, for registry validation
pub fn formula_declarations() -> Vec<FormulaDeclaration> {
    formula_table()
        .into_iter()
        .map(|f| FormulaDeclaration {
            target: f.target,
            depends_on: f.depends_on,
        })
        .collect()
}

/// Order formulas so each runs after any formula producing one of its inputs
fn dependency_order(formulas: Vec<Formula>) -> Result<Vec<Formula>> {
    let targets: BTreeSet<FieldId> = formulas.iter().map(|f| f.target).collect();
    let mut pending: BTreeMap<FieldId, Formula> =
        formulas.into_iter().map(|f| (f.target, f)).collect();
    let mut done: BTreeSet<FieldId> = BTreeSet::new();
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let ready: Vec<FieldId> = pending
            .values()
            .filter(|f| {
                f.depends_on
                    .iter()
                    .all(|d| !targets.contains(d) || done.contains(d))
            })
            .map(|f| f.target)
            .collect();

        if ready.is_empty() {
            let cycle: Vec<String> = pending.keys().map(FieldId::to_string).collect();
            return Err(Error::Config(format!(
                "Circular formula dependencies among fields: {}",
                cycle.join(", ")
            )));
        }

        for target in ready {
            if let Some(formula) = pending.remove(&target) {
                done.insert(target);
                ordered.push(formula);
            }
        }
    }
    Ok(ordered)
}

// ============================================================================
// Resolver
// ============================================================================

/// Counts for one resolver pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveSummary {
    pub calculated: usize,
    pub unchanged: usize,
    pub insufficient: usize,
    /// Derivable fields left alone because a source supplied them
    pub sourced: usize,
}

/// Runs the formula table over a record
pub struct CalculatedFieldResolver {
    formulas: Vec<Formula>,
}

impl CalculatedFieldResolver {
    /// Build the resolver for a registry
    ///
    /// # Errors
    /// `Error::Config` when the formula graph has a cycle or a formula targets
    /// a field the registry does not define.
    pub fn new(registry: &SchemaRegistry) -> Result<Self> {
        let formulas = dependency_order(formula_table())?;
        if let Some(missing) = formulas.iter().find(|f| registry.by_id(f.target).is_none()) {
            return Err(Error::Config(format!(
                "Formula target {} is not in the schema",
                missing.target
            )));
        }
        Ok(Self { formulas })
    }

    /// Targets in evaluation order
    pub fn order(&self) -> Vec<FieldId> {
        self.formulas.iter().map(|f| f.target).collect()
    }

    pub fn resolve(&self, registry: &SchemaRegistry, record: &mut PropertyRecord) -> ResolveSummary {
        let mut summary = ResolveSummary::default();

        for formula in &self.formulas {
            let authoritative = registry
                .by_id(formula.target)
                .is_some_and(|def| def.calculated);
            let inputs: Vec<Option<f64>> =
                formula.depends_on.iter().map(|d| record.number(*d)).collect();
            let Some(slot) = record.slot(formula.target) else {
                continue;
            };

            let from_calculation = slot.method == Some(ExtractionMethod::Calculation)
                || slot.value_source.as_deref() == Some(INTERNAL_CALCULATION);
            if !authoritative && slot.is_populated() && !from_calculation {
                debug!(field = %formula.target, "Derivable field already sourced");
                summary.sourced += 1;
                continue;
            }

            match (formula.compute)(&inputs) {
                Some((value, note)) if value.is_finite() => {
                    let value = FieldValue::Number(value);
                    if slot.value.as_ref() == Some(&value) && slot.notes.as_deref() == Some(&note) {
                        summary.unchanged += 1;
                        continue;
                    }
                    self.write(record, formula.target, value, note);
                    summary.calculated += 1;
                }
                _ => {
                    if slot.notes.as_deref() == Some(formula.insufficient) {
                        summary.insufficient += 1;
                        continue;
                    }
                    let target = formula.target;
                    if let Some(slot) = record.slot_mut(target) {
                        slot.notes = Some(formula.insufficient.to_string());
                        if !slot.is_populated() {
                            slot.confidence = Some(Confidence::Low);
                        }
                    }
                    record.push_audit(
                        Some(target),
                        &target.to_string(),
                        INTERNAL_CALCULATION,
                        AuditAction::Insufficient,
                        Some(formula.insufficient.to_string()),
                    );
                    summary.insufficient += 1;
                }
            }
        }

        info!(
            calculated = summary.calculated,
            insufficient = summary.insufficient,
            unchanged = summary.unchanged,
            "Calculated fields resolved"
        );
        summary
    }

    fn write(&self, record: &mut PropertyRecord, target: FieldId, value: FieldValue, note: String) {
        let detail = format!("{} ({})", value, note);
        if let Some(slot) = record.slot_mut(target) {
            slot.value = Some(value);
            slot.confidence = Some(Confidence::High);
            slot.value_source = Some(INTERNAL_CALCULATION.to_string());
            if !slot.sources.iter().any(|s| s == INTERNAL_CALCULATION) {
                slot.sources.push(INTERNAL_CALCULATION.to_string());
            }
            slot.method = Some(ExtractionMethod::Calculation);
            slot.source_url = None;
            slot.notes = Some(note);
            slot.updated_at = Some(Utc::now());
        }
        debug!(field = %target, value = %detail, "Calculated");
        record.push_audit(
            Some(target),
            &target.to_string(),
            INTERNAL_CALCULATION,
            AuditAction::Calculated,
            Some(detail),
        );
        record.touch();
    }
}
