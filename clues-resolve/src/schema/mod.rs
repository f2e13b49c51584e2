//! Schema Registry
//!
//! Authoritative definition of every canonical field: id, key, label, group,
//! value type, required flag, calculated flag, enumerated values, validation
//! range and legacy key aliases.
//!
//! # Lifecycle
//! Defined once at startup via [`SchemaRegistry::define`] (or
//! [`SchemaRegistry::standard`] for the built-in catalogue), immutable after
//! that, and shared read-only (`Arc<SchemaRegistry>`) across every concurrent
//! resolution. Any integrity violation is a `clues_common::Error::Config` and
//! must halt startup.
//!
//! # Lookups
//! - by id (`16a`), by key (`zestimate`), by token (`16a_zestimate`)
//! - [`SchemaRegistry::resolve_token`] accepts any of the three

pub mod catalog;
pub mod coerce;

use crate::calculated::{formula_declarations, FormulaDeclaration};
use crate::types::{FieldId, FieldType};
use clues_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::info;

// ============================================================================
// Groups
// ============================================================================

/// Fixed logical field groups, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldGroup {
    #[serde(rename = "Address & Identity")]
    AddressIdentity,
    #[serde(rename = "Pricing & Value")]
    PricingValue,
    #[serde(rename = "Property Basics")]
    PropertyBasics,
    #[serde(rename = "HOA & Taxes")]
    HoaTaxes,
    #[serde(rename = "Structure & Systems")]
    StructureSystems,
    #[serde(rename = "Interior Features")]
    InteriorFeatures,
    #[serde(rename = "Exterior Features")]
    ExteriorFeatures,
    #[serde(rename = "Permits & Renovations")]
    PermitsRenovations,
    #[serde(rename = "Assigned Schools")]
    AssignedSchools,
    #[serde(rename = "Location Scores")]
    LocationScores,
    #[serde(rename = "Distances & Amenities")]
    DistancesAmenities,
    #[serde(rename = "Safety & Crime")]
    SafetyCrime,
    #[serde(rename = "Market & Investment Data")]
    MarketInvestment,
    #[serde(rename = "Utilities & Connectivity")]
    UtilitiesConnectivity,
    #[serde(rename = "Environment & Risk")]
    EnvironmentRisk,
    #[serde(rename = "Additional Features")]
    AdditionalFeatures,
    #[serde(rename = "Stellar MLS - Parking")]
    MlsParking,
    #[serde(rename = "Stellar MLS - Building")]
    MlsBuilding,
    #[serde(rename = "Stellar MLS - Legal")]
    MlsLegal,
    #[serde(rename = "Stellar MLS - Waterfront")]
    MlsWaterfront,
    #[serde(rename = "Stellar MLS - Leasing")]
    MlsLeasing,
    #[serde(rename = "Stellar MLS - Features")]
    MlsFeatures,
    #[serde(rename = "Market Performance")]
    MarketPerformance,
}

impl FieldGroup {
    pub const ALL: [FieldGroup; 23] = [
        FieldGroup::AddressIdentity,
        FieldGroup::PricingValue,
        FieldGroup::PropertyBasics,
        FieldGroup::HoaTaxes,
        FieldGroup::StructureSystems,
        FieldGroup::InteriorFeatures,
        FieldGroup::ExteriorFeatures,
        FieldGroup::PermitsRenovations,
        FieldGroup::AssignedSchools,
        FieldGroup::LocationScores,
        FieldGroup::DistancesAmenities,
        FieldGroup::SafetyCrime,
        FieldGroup::MarketInvestment,
        FieldGroup::UtilitiesConnectivity,
        FieldGroup::EnvironmentRisk,
        FieldGroup::AdditionalFeatures,
        FieldGroup::MlsParking,
        FieldGroup::MlsBuilding,
        FieldGroup::MlsLegal,
        FieldGroup::MlsWaterfront,
        FieldGroup::MlsLeasing,
        FieldGroup::MlsFeatures,
        FieldGroup::MarketPerformance,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FieldGroup::AddressIdentity => "Address & Identity",
            FieldGroup::PricingValue => "Pricing & Value",
            FieldGroup::PropertyBasics => "Property Basics",
            FieldGroup::HoaTaxes => "HOA & Taxes",
            FieldGroup::StructureSystems => "Structure & Systems",
            FieldGroup::InteriorFeatures => "Interior Features",
            FieldGroup::ExteriorFeatures => "Exterior Features",
            FieldGroup::PermitsRenovations => "Permits & Renovations",
            FieldGroup::AssignedSchools => "Assigned Schools",
            FieldGroup::LocationScores => "Location Scores",
            FieldGroup::DistancesAmenities => "Distances & Amenities",
            FieldGroup::SafetyCrime => "Safety & Crime",
            FieldGroup::MarketInvestment => "Market & Investment Data",
            FieldGroup::UtilitiesConnectivity => "Utilities & Connectivity",
            FieldGroup::EnvironmentRisk => "Environment & Risk",
            FieldGroup::AdditionalFeatures => "Additional Features",
            FieldGroup::MlsParking => "Stellar MLS - Parking",
            FieldGroup::MlsBuilding => "Stellar MLS - Building",
            FieldGroup::MlsLegal => "Stellar MLS - Legal",
            FieldGroup::MlsWaterfront => "Stellar MLS - Waterfront",
            FieldGroup::MlsLeasing => "Stellar MLS - Leasing",
            FieldGroup::MlsFeatures => "Stellar MLS - Features",
            FieldGroup::MarketPerformance => "Market Performance",
        }
    }
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Field definitions
// ============================================================================

/// One canonical field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDefinition {
    pub id: FieldId,
    pub key: String,
    pub label: String,
    pub group: FieldGroup,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    /// Never sourced externally; always derived by the Calculated-Field Resolver
    pub calculated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Inclusive numeric validation range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<(f64, f64)>,
    /// Historical keys still accepted in tokens
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl FieldDefinition {
    pub fn new(
        id: FieldId,
        key: &str,
        label: &str,
        group: FieldGroup,
        field_type: FieldType,
    ) -> Self {
        Self {
            id,
            key: key.to_string(),
            label: label.to_string(),
            group,
            field_type,
            required: false,
            calculated: false,
            options: Vec::new(),
            range: None,
            aliases: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn calculated(mut self) -> Self {
        self.calculated = true;
        self
    }

    pub fn options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// Composite `"<id>_<key>"` token
    pub fn token(&self) -> String {
        format!("{}_{}", self.id, self.key)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Immutable, validated field catalogue
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    /// Sorted by id
    fields: Vec<FieldDefinition>,
    by_id: HashMap<FieldId, usize>,
    /// Keys and aliases
    by_key: HashMap<String, usize>,
    /// `<id>_<key>` and `<id>_<alias>`
    by_token: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Load and validate a field set against the resolver's formula table
    pub fn define(fields: Vec<FieldDefinition>) -> Result<Self> {
        Self::define_with_formulas(fields, &formula_declarations())
    }

    /// Built-in catalogue
    pub fn standard() -> Result<Self> {
        Self::define(catalog::standard_fields())
    }

    /// Load and validate a field set against an explicit formula table
    ///
    /// # Errors
    /// `Error::Config` when:
    /// - an id, key or alias collides
    /// - an enumerated field has no values
    /// - a calculated field has no formula, or its formula declares no
    ///   dependencies, or a dependency is not in the set
    pub fn define_with_formulas(
        mut fields: Vec<FieldDefinition>,
        formulas: &[FormulaDeclaration],
    ) -> Result<Self> {
        fields.sort_by(|a, b| a.id.cmp(&b.id));

        let mut by_id = HashMap::with_capacity(fields.len());
        let mut by_key = HashMap::with_capacity(fields.len());
        let mut by_token = HashMap::with_capacity(fields.len());

        for (index, def) in fields.iter().enumerate() {
            if def.key.trim().is_empty() {
                return Err(Error::Config(format!("Field {} has an empty key", def.id)));
            }

            if by_id.insert(def.id, index).is_some() {
                return Err(Error::Config(format!("Duplicate field id: {}", def.id)));
            }

            if by_key.insert(def.key.clone(), index).is_some() {
                return Err(Error::Config(format!(
                    "Duplicate field key: {} (field {})",
                    def.key, def.id
                )));
            }

            // Aliases are token-scoped: `31_hoa_fee_annual` stays distinct from
            // the `hoa_fee_annual` key owned by 31B
            for key in std::iter::once(&def.key).chain(def.aliases.iter()) {
                let token = format!("{}_{}", def.id, key);
                if by_token.insert(token.clone(), index).is_some() {
                    return Err(Error::Config(format!("Duplicate field token: {}", token)));
                }
            }

            if def.field_type.is_enumerated() && def.options.is_empty() {
                return Err(Error::Config(format!(
                    "Enumerated field {} ({}) declares no values",
                    def.id, def.key
                )));
            }
        }

        let ids: HashSet<FieldId> = by_id.keys().copied().collect();

        for def in fields.iter().filter(|d| d.calculated) {
            let formula = formulas.iter().find(|f| f.target == def.id).ok_or_else(|| {
                Error::Config(format!(
                    "Calculated field {} ({}) has no formula",
                    def.id, def.key
                ))
            })?;

            if formula.depends_on.is_empty() {
                return Err(Error::Config(format!(
                    "Calculated field {} ({}) declares no dependencies",
                    def.id, def.key
                )));
            }

            if let Some(missing) = formula.depends_on.iter().find(|d| !ids.contains(d)) {
                return Err(Error::Config(format!(
                    "Calculated field {} depends on undefined field {}",
                    def.id, missing
                )));
            }
        }

        info!(
            fields = fields.len(),
            calculated = fields.iter().filter(|d| d.calculated).count(),
            "Schema registry loaded"
        );

        Ok(Self {
            fields,
            by_id,
            by_key,
            by_token,
        })
    }

    pub fn by_id(&self, id: FieldId) -> Option<&FieldDefinition> {
        self.by_id.get(&id).map(|&i| &self.fields[i])
    }

    /// Lookup by key or legacy alias
    pub fn by_key(&self, key: &str) -> Option<&FieldDefinition> {
        self.by_key.get(key).map(|&i| &self.fields[i])
    }

    /// Lookup by `"<id>_<key>"`; id and key must belong to the same field
    pub fn by_token(&self, token: &str) -> Option<&FieldDefinition> {
        self.by_token.get(token).map(|&i| &self.fields[i])
    }

    /// Lookup accepting a token, a bare id or a bare key
    pub fn resolve_token(&self, token: &str) -> Option<&FieldDefinition> {
        let token = token.trim();
        self.by_token(token)
            .or_else(|| token.parse::<FieldId>().ok().and_then(|id| self.by_id(id)))
            .or_else(|| self.by_key(token))
    }

    /// Fields in a group, ordered by id
    pub fn fields_in_group(&self, group: FieldGroup) -> Vec<&FieldDefinition> {
        self.fields.iter().filter(|d| d.group == group).collect()
    }

    /// Fields whose numeric id lies in `min..=max` (subfields included)
    pub fn fields_in_range(&self, min: u16, max: u16) -> Vec<&FieldDefinition> {
        self.fields
            .iter()
            .filter(|d| d.id.num >= min && d.id.num <= max)
            .collect()
    }

    /// Groups that have at least one field, in display order
    pub fn groups(&self) -> Vec<FieldGroup> {
        FieldGroup::ALL
            .iter()
            .copied()
            .filter(|g| self.fields.iter().any(|d| d.group == *g))
            .collect()
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
