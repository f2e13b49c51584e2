//! Configuration files driving the resolver
//!
//! Covers:
//! - `[arbitration]` policy and quorum reaching the pipeline
//! - search field and remarks taxonomy overrides loaded from disk
//! - bad configuration failing fast with `Error::Config`

use clues_common::config::load_toml_config;
use clues_common::Error;
use clues_resolve::adapters::flat::FlatAdapter;
use clues_resolve::adapters::mls::remarks::RemarksTaxonomy;
use clues_resolve::adapters::AdapterContext;
use clues_resolve::search::config::SearchFieldTable;
use clues_resolve::types::{FieldId, FieldValue};
use clues_resolve::{ResolutionPipeline, SchemaRegistry};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn write_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_tier_precedence_from_config_keeps_mls_value() {
    let file = write_file("[arbitration]\npolicy = \"tier-precedence\"\n");
    let config = load_toml_config(file.path()).unwrap();
    let registry = Arc::new(SchemaRegistry::standard().unwrap());

    let resolution = ResolutionPipeline::from_config(registry.clone(), &config)
        .unwrap()
        .stage(
            Arc::new(FlatAdapter::new(registry.clone())),
            json!({ "10_listing_price": { "value": 450000, "source": "Stellar MLS" } }),
        )
        .stage(
            Arc::new(FlatAdapter::new(registry.clone())),
            json!({ "10_listing_price": { "value": 465000, "source": "LLM:Perplexity" } }),
        )
        .run(&AdapterContext::default())
        .await;

    let slot = resolution.record.slot(FieldId::new(10)).unwrap();
    assert_eq!(slot.value, Some(FieldValue::Number(450000.0)));
    assert!(slot.has_conflict);
}

#[test]
fn test_unknown_policy_is_config_error() {
    let file = write_file("[arbitration]\npolicy = \"highest-bidder\"\n");
    let config = load_toml_config(file.path()).unwrap();
    let registry = Arc::new(SchemaRegistry::standard().unwrap());

    let result = ResolutionPipeline::from_config(registry, &config);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_search_fields_loaded_from_path() {
    let file = write_file(
        r#"
        [[field]]
        id = "74"
        queries = ['"{address}" walk score']
        labels = ["Walk Score"]
        "#,
    );
    let table = SearchFieldTable::load_or_standard(Some(file.path())).unwrap();
    assert_eq!(table.len(), 1);
    assert!(table.get(FieldId::new(74)).is_some());

    let registry = SchemaRegistry::standard().unwrap();
    table.validate_against(&registry).unwrap();
}

#[test]
fn test_taxonomy_loaded_from_path() {
    let file = write_file(
        r#"
        [[condition]]
        tier = "Excellent"
        patterns = ['\bstunning\b']

        [[condition]]
        tier = "Poor"
        patterns = ['\bneeds work\b']

        [mining]
        smart_home = ["nest"]
        "#,
    );
    let taxonomy = RemarksTaxonomy::load_or_standard(Some(file.path())).unwrap();
    assert_eq!(taxonomy.classify_condition("A stunning home"), Some("Excellent"));
    assert_eq!(taxonomy.classify_condition("Needs work throughout"), Some("Poor"));
    assert_eq!(taxonomy.classify_condition("Three bedrooms"), None);
}

#[test]
fn test_invalid_search_pattern_fails_fast() {
    let file = write_file(
        r#"
        [[field]]
        id = "74"
        queries = ["{address}"]
        patterns = ["(unclosed"]
        "#,
    );
    let result = SearchFieldTable::load(file.path());
    assert!(matches!(result, Err(Error::Config(_))));
}
