//! Resolution Pipeline
//!
//! Orchestrates one property resolution:
//! 1. every adapter stage runs concurrently against its payload
//! 2. outputs are applied to the record **in stage order**, least to most
//!    authoritative, so the last-writer-wins engine lets later stages win
//! 3. LLM quorum voting, then the calculated-field resolver
//! 4. single-source and bathroom-math validation warnings
//! 5. quality aggregation
//!
//! A failing stage becomes a [`StageDiagnostic`]; only configuration errors
//! (raised while building the pipeline) are fatal. A run always yields a
//! full-shaped record.

use crate::adapters::address::AddressParts;
use crate::adapters::{AdapterContext, AdapterOutput, SourceAdapter};
use crate::arbitration::quorum::{
    apply_llm_quorum, flag_single_source_llm_fields, validate_bathroom_math,
};
use crate::arbitration::{ApplySummary, ArbitrationEngine, ArbitrationPolicy, SharedRecord};
use crate::calculated::CalculatedFieldResolver;
use crate::quality::{QualityAggregator, QualityReport};
use crate::record::PropertyRecord;
use crate::schema::SchemaRegistry;
use clues_common::config::TomlConfig;
use clues_common::Result;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Minimum agreeing LLMs for a quorum winner
pub const DEFAULT_LLM_QUORUM: usize = 2;

/// One adapter and the payload it maps
#[derive(Clone)]
pub struct Stage {
    adapter: Arc<dyn SourceAdapter>,
    payload: Value,
}

impl Stage {
    pub fn new(adapter: Arc<dyn SourceAdapter>, payload: Value) -> Self {
        Self { adapter, payload }
    }

    pub fn name(&self) -> &'static str {
        self.adapter.name()
    }
}

/// A stage that produced nothing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageDiagnostic {
    pub stage: String,
    pub error: String,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct Resolution {
    pub record: PropertyRecord,
    pub report: QualityReport,
    pub diagnostics: Vec<StageDiagnostic>,
    /// Single-source LLM fields and cross-field validation messages
    pub warnings: Vec<String>,
}

/// Ordered adapter stages plus the post-passes
pub struct ResolutionPipeline {
    registry: Arc<SchemaRegistry>,
    engine: ArbitrationEngine,
    resolver: CalculatedFieldResolver,
    quality: QualityAggregator,
    stages: Vec<Stage>,
    min_llm_quorum: usize,
}

impl ResolutionPipeline {
    /// Pipeline with no stages and the default policy
    ///
    /// # Errors
    /// `Error::Config` when the formula table does not fit the registry.
    pub fn new(registry: Arc<SchemaRegistry>) -> Result<Self> {
        let resolver = CalculatedFieldResolver::new(&registry)?;
        Ok(Self {
            engine: ArbitrationEngine::new(registry.clone()),
            quality: QualityAggregator::new(registry.clone()),
            resolver,
            registry,
            stages: Vec::new(),
            min_llm_quorum: DEFAULT_LLM_QUORUM,
        })
    }

    /// Pipeline using `[arbitration]` settings
    pub fn from_config(registry: Arc<SchemaRegistry>, config: &TomlConfig) -> Result<Self> {
        let policy: ArbitrationPolicy = config.arbitration.policy.parse()?;
        Ok(Self::new(registry)?
            .with_policy(policy)
            .with_llm_quorum(config.arbitration.min_llm_quorum))
    }

    pub fn with_policy(mut self, policy: ArbitrationPolicy) -> Self {
        self.engine = ArbitrationEngine::with_policy(self.registry.clone(), policy);
        self
    }

    pub fn with_llm_quorum(mut self, min: usize) -> Self {
        self.min_llm_quorum = min.max(1);
        self
    }

    /// Append a stage; later stages are more authoritative
    pub fn stage(mut self, adapter: Arc<dyn SourceAdapter>, payload: Value) -> Self {
        self.stages.push(Stage::new(adapter, payload));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::name).collect()
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Resolve into a fresh record
    pub async fn run(&self, ctx: &AdapterContext) -> Resolution {
        let mut record = PropertyRecord::new(&self.registry);
        if !ctx.parts.is_empty() {
            record.address = ctx.parts.clone();
        }
        self.run_on(SharedRecord::new(record), ctx).await
    }

    /// Resolve on top of an existing record
    pub async fn run_on(&self, shared: SharedRecord, ctx: &AdapterContext) -> Resolution {
        let outputs = join_all(self.stages.iter().map(|stage| async move {
            let result = stage.adapter.adapt(&stage.payload, ctx).await;
            (stage.name(), result)
        }))
        .await;

        let mut diagnostics = Vec::new();
        for (name, result) in outputs {
            match result {
                Ok(output) => {
                    let summary = self.apply_output(&shared, name, output).await;
                    debug!(stage = name, set = summary.set, conflicts = summary.conflicts, "Stage applied");
                }
                Err(e) => {
                    warn!(stage = name, error = %e, "Stage failed, continuing");
                    diagnostics.push(StageDiagnostic {
                        stage: name.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let (record, report, warnings) = shared
            .with(|record| {
                let warnings = self.post_process(record);
                let report = self.quality.finalize(record);
                (record.clone(), report, warnings)
            })
            .await;

        info!(
            record_id = %record.id,
            stages = self.stages.len(),
            failed = diagnostics.len(),
            populated = report.populated,
            conflicts = report.conflicts,
            "Resolution complete"
        );

        Resolution {
            record,
            report,
            diagnostics,
            warnings,
        }
    }

    async fn apply_output(&self, shared: &SharedRecord, stage: &str, output: AdapterOutput) -> ApplySummary {
        let AdapterOutput {
            tuples,
            not_found,
            address,
            passthrough,
            remarks_excised,
        } = output;

        let summary = shared.apply(&self.engine, tuples).await;
        shared
            .with(|record| {
                for (field, note) in &not_found {
                    self.engine.record_absent(record, *field, stage, note);
                }
                if let Some(parts) = address {
                    merge_address(&mut record.address, parts);
                }
                record.passthrough.extend(passthrough);
                if remarks_excised.is_some() {
                    record.remarks_excised = remarks_excised;
                }
            })
            .await;
        summary
    }

    fn post_process(&self, record: &mut PropertyRecord) -> Vec<String> {
        let mut warnings = Vec::new();

        let outcomes = apply_llm_quorum(record, self.min_llm_quorum);
        if !outcomes.is_empty() {
            debug!(fields = outcomes.len(), "LLM quorum applied");
        }

        let summary = self.resolver.resolve(&self.registry, record);
        debug!(
            calculated = summary.calculated,
            insufficient = summary.insufficient,
            "Calculated fields resolved"
        );

        for field in flag_single_source_llm_fields(record) {
            warnings.push(format!("Field {} has a single uncorroborated LLM source", field));
        }
        if let Some(message) = validate_bathroom_math(record) {
            warnings.push(message);
        }
        warnings
    }
}

/// Later parts replace earlier ones; unset parts never erase
fn merge_address(target: &mut AddressParts, incoming: AddressParts) {
    let AddressParts {
        street,
        city,
        state,
        zip,
    } = incoming;
    if street.is_some() {
        target.street = street;
    }
    if city.is_some() {
        target.city = city;
    }
    if state.is_some() {
        target.state = state;
    }
    if zip.is_some() {
        target.zip = zip;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::flat::FlatAdapter;
    use crate::adapters::mls::MlsAdapter;
    use crate::search::config::SearchFieldTable;
    use crate::search::mock::MockSearchProvider;
    use crate::search::{WebSearchFetcher, NO_RESULTS_NOTE};
    use crate::types::{Confidence, FieldId, FieldValue};
    use serde_json::json;

    fn registry() -> Arc<SchemaRegistry> {
        Arc::new(SchemaRegistry::standard().unwrap())
    }

    fn mls() -> Arc<dyn SourceAdapter> {
        Arc::new(MlsAdapter::standard().unwrap().with_current_year(2024))
    }

    #[tokio::test]
    async fn test_later_stage_wins_and_conflict_kept() {
        let registry = registry();
        let pipeline = ResolutionPipeline::new(registry.clone())
            .unwrap()
            .stage(
                Arc::new(FlatAdapter::new(registry.clone())),
                json!({ "10_listing_price": { "value": 440000, "source": "Zillow" } }),
            )
            .stage(mls(), json!({ "ListPrice": 450000, "LivingArea": 1850 }));
        assert_eq!(pipeline.stage_names(), vec!["flat", "mls"]);

        let resolution = pipeline.run(&AdapterContext::default()).await;
        let slot = resolution.record.slot(FieldId::new(10)).unwrap();
        assert_eq!(slot.value, Some(FieldValue::Number(450000.0)));
        assert!(slot.has_conflict);
        assert_eq!(slot.sources, vec!["Zillow", "Stellar MLS"]);
        assert_eq!(resolution.report.conflicts, 1);
    }

    #[tokio::test]
    async fn test_failed_stage_is_diagnostic_only() {
        let registry = registry();
        let resolution = ResolutionPipeline::new(registry.clone())
            .unwrap()
            .stage(mls(), json!(["not", "an", "object"]))
            .stage(
                Arc::new(FlatAdapter::new(registry.clone())),
                json!({ "17_bedrooms": { "value": 3, "source": "Redfin" } }),
            )
            .run(&AdapterContext::default())
            .await;

        assert_eq!(resolution.diagnostics.len(), 1);
        assert_eq!(resolution.diagnostics[0].stage, "mls");
        assert_eq!(resolution.record.len(), registry.len());
        assert_eq!(resolution.record.number(FieldId::new(17)), Some(3.0));
    }

    #[tokio::test]
    async fn test_calculations_and_quality_run_after_stages() {
        let registry = registry();
        let resolution = ResolutionPipeline::new(registry.clone())
            .unwrap()
            .stage(
                Arc::new(FlatAdapter::new(registry.clone())),
                json!({ "23_lot_size_sqft": { "value": 43560, "source": "County Records" } }),
            )
            .run(&AdapterContext::default())
            .await;

        let acres = resolution.record.slot(FieldId::new(24)).unwrap();
        assert_eq!(acres.value, Some(FieldValue::Number(1.0)));
        assert_eq!(acres.confidence, Some(Confidence::High));
        assert_eq!(resolution.record.completeness, Some(resolution.report.overall_completeness));
        assert!(resolution.report.composite_score > 0.0);
    }

    #[tokio::test]
    async fn test_search_misses_recorded_as_attempts() {
        let registry = registry();
        let table = SearchFieldTable::from_toml_str(
            r#"
            [[field]]
            id = "17"
            queries = ['"{address}" bedrooms']
        "#,
        )
        .unwrap();
        let fetcher = WebSearchFetcher::new(
            Arc::new(MockSearchProvider::failing()),
            Arc::new(table),
            registry.clone(),
        );

        let ctx = AdapterContext::for_address("123 Main St, Springfield, IL 62704");
        let resolution = ResolutionPipeline::new(registry)
            .unwrap()
            .stage(Arc::new(fetcher), Value::Null)
            .run(&ctx)
            .await;

        let record = &resolution.record;
        assert!(resolution.diagnostics.is_empty());
        assert!(record.was_attempted(FieldId::new(17)));
        let slot = record.slot(FieldId::new(17)).unwrap();
        assert_eq!(slot.notes.as_deref(), Some(NO_RESULTS_NOTE));
        assert_eq!(slot.confidence, Some(Confidence::Low));
        assert_eq!(record.address.city.as_deref(), Some("Springfield"));
    }

    #[tokio::test]
    async fn test_single_llm_source_warns() {
        let registry = registry();
        let resolution = ResolutionPipeline::new(registry.clone())
            .unwrap()
            .stage(
                Arc::new(FlatAdapter::new(registry.clone())),
                json!({ "17_bedrooms": { "value": 4, "source": "LLM:Grok" } }),
            )
            .run(&AdapterContext::default())
            .await;
        assert!(resolution.warnings.iter().any(|w| w.contains("Field 17")));
    }

    #[test]
    fn test_merge_address_keeps_known_parts() {
        let mut target = AddressParts::parse("123 Main St, Springfield, IL 62704");
        merge_address(
            &mut target,
            AddressParts {
                zip: Some("62705".into()),
                ..Default::default()
            },
        );
        assert_eq!(target.city.as_deref(), Some("Springfield"));
        assert_eq!(target.zip.as_deref(), Some("62705"));
    }
}
