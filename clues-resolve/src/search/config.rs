//! Per-field web-search configuration
//!
//! Loaded once from TOML (built-in `config/search_fields.toml` unless a path
//! is configured) and shared read-only. Patterns are compiled at load time;
//! a bad pattern or an unknown field id is a configuration error.

use crate::adapters::address::AddressParts;
use crate::adapters::AdapterContext;
use crate::schema::SchemaRegistry;
use crate::types::FieldId;
use clues_common::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Built-in field table
pub const DEFAULT_SEARCH_FIELDS: &str = include_str!("../../config/search_fields.toml");

#[derive(Debug, Deserialize)]
struct SearchFieldsFile {
    #[serde(default)]
    field: Vec<FieldEntry>,
}

#[derive(Debug, Deserialize)]
struct FieldEntry {
    id: FieldId,
    #[serde(default)]
    label: String,
    #[serde(default)]
    queries: Vec<String>,
    #[serde(default)]
    trusted_domains: Vec<String>,
    #[serde(default)]
    json_ld_paths: Vec<String>,
    #[serde(default)]
    patterns: Vec<String>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    calculation_only: bool,
}

/// Search settings for one field
#[derive(Debug, Clone)]
pub struct FieldSearchConfig {
    pub id: FieldId,
    pub label: String,
    /// Query templates with `{address}` `{city}` `{state}` `{zip}` `{community}`
    pub queries: Vec<String>,
    /// Ordered; earlier domains earn higher confidence
    pub trusted_domains: Vec<String>,
    pub json_ld_paths: Vec<String>,
    pub patterns: Vec<Regex>,
    pub labels: Vec<String>,
    /// Resolved by calculation, never searched
    pub calculation_only: bool,
}

impl FieldSearchConfig {
    /// Queries with placeholders substituted
    pub fn render_queries(&self, ctx: &AdapterContext) -> Vec<String> {
        self.queries.iter().map(|q| render_query(q, ctx)).collect()
    }
}

/// Substitute address placeholders; unknown parts become empty
pub fn render_query(template: &str, ctx: &AdapterContext) -> String {
    let address = ctx
        .address
        .clone()
        .unwrap_or_else(|| ctx.parts.to_full_address());
    let part = |p: &Option<String>| p.clone().unwrap_or_default();

    template
        .replace("{address}", &address)
        .replace("{city}", &part(&ctx.parts.city))
        .replace("{state}", &part(&ctx.parts.state))
        .replace("{zip}", &part(&ctx.parts.zip))
        .replace("{community}", &AddressParts::community(&address))
}

/// Immutable table of field search settings
#[derive(Debug, Clone, Default)]
pub struct SearchFieldTable {
    fields: Vec<FieldSearchConfig>,
}

impl SearchFieldTable {
    /// Built-in table
    pub fn standard() -> Result<Self> {
        Self::from_toml_str(DEFAULT_SEARCH_FIELDS)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let table = Self::from_toml_str(&content)?;
        info!(path = %path.display(), fields = table.len(), "Search field config loaded");
        Ok(table)
    }

    pub fn load_or_standard(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::standard(),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: SearchFieldsFile = toml::from_str(content)?;
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(file.field.len());

        for entry in file.field {
            if !seen.insert(entry.id) {
                return Err(Error::Config(format!(
                    "Duplicate search config for field {}",
                    entry.id
                )));
            }
            if !entry.calculation_only && entry.queries.is_empty() {
                return Err(Error::Config(format!(
                    "Search config for field {} has no queries",
                    entry.id
                )));
            }

            let patterns = entry
                .patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| {
                        Error::Config(format!("Invalid pattern for field {}: {}", entry.id, e))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            fields.push(FieldSearchConfig {
                id: entry.id,
                label: entry.label,
                queries: entry.queries,
                trusted_domains: entry.trusted_domains,
                json_ld_paths: entry.json_ld_paths,
                patterns,
                labels: entry.labels,
                calculation_only: entry.calculation_only,
            });
        }

        fields.sort_by_key(|f| f.id);
        Ok(Self { fields })
    }

    /// Every configured id must exist in the schema
    pub fn validate_against(&self, registry: &SchemaRegistry) -> Result<()> {
        match self.fields.iter().find(|f| registry.by_id(f.id).is_none()) {
            Some(unknown) => Err(Error::Config(format!(
                "Search config names unknown field {}",
                unknown.id
            ))),
            None => Ok(()),
        }
    }

    pub fn get(&self, id: FieldId) -> Option<&FieldSearchConfig> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn fields(&self) -> &[FieldSearchConfig] {
        &self.fields
    }

    /// Fields that issue queries
    pub fn searchable(&self) -> impl Iterator<Item = &FieldSearchConfig> {
        self.fields.iter().filter(|f| !f.calculation_only)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_loads_and_matches_schema() {
        let table = SearchFieldTable::standard().unwrap();
        let registry = SchemaRegistry::standard().unwrap();
        table.validate_against(&registry).unwrap();

        for id in [16, 94, 99, 101, 181] {
            assert!(table.get(FieldId::new(id)).unwrap().calculation_only);
        }
        assert!(table.searchable().all(|f| !f.queries.is_empty()));
        assert!(table.get(FieldId::sub(16, 'b')).is_some());
    }

    #[test]
    fn test_render_placeholders() {
        let ctx = AdapterContext::for_address("123 Main St, Springfield, IL 62704");
        assert_eq!(
            render_query("{city} {state} {zip} near {community}", &ctx),
            "Springfield IL 62704 near 123 Main St"
        );
        assert_eq!(
            render_query("site:redfin.com \"{address}\"", &ctx),
            "site:redfin.com \"123 Main St, Springfield, IL 62704\""
        );
    }

    #[test]
    fn test_missing_parts_render_empty() {
        let ctx = AdapterContext::for_address("123 Main St");
        assert_eq!(render_query("{city}|{zip}", &ctx), "|");
    }

    #[test]
    fn test_invalid_entries_rejected() {
        let bad_pattern = r#"
            [[field]]
            id = "12"
            queries = ["{address}"]
            patterns = ["(unclosed"]
        "#;
        assert!(matches!(
            SearchFieldTable::from_toml_str(bad_pattern),
            Err(Error::Config(_))
        ));

        let no_queries = r#"
            [[field]]
            id = "12"
        "#;
        assert!(matches!(
            SearchFieldTable::from_toml_str(no_queries),
            Err(Error::Config(_))
        ));

        let unknown = SearchFieldTable::from_toml_str(
            r#"
            [[field]]
            id = "400"
            calculation_only = true
        "#,
        )
        .unwrap();
        let registry = SchemaRegistry::standard().unwrap();
        assert!(unknown.validate_against(&registry).is_err());
    }
}
