//! Source Adapters
//!
//! Each adapter turns one provider payload into [`SourceTuple`]s addressed by
//! field token. Adapters never touch a record; the arbitration engine does.
//!
//! # Adapters
//! 1. **mls** - structured RESO-style MLS listing (`Stellar MLS`)
//! 2. **flat** - `{token: {value, source, confidence, ...}}` payloads
//! 3. **search** (see [`crate::search`]) - configuration-driven web search
//!
//! # Contract
//! Missing provider attributes only omit tuples. A payload of the wrong shape
//! is an [`AdapterError::MalformedPayload`].

pub mod address;
pub mod flat;
pub mod mls;
pub mod source_confidence;

use crate::error::AdapterResult;
use crate::types::{FieldId, SourceTuple};
use address::AddressParts;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

#[cfg(doc)]
use crate::error::AdapterError;

/// Non-numbered keys carried alongside the field tuples
pub const PASSTHROUGH_KEYS: [&str; 8] = [
    "property_description",
    "latitude",
    "longitude",
    "property_photo_url",
    "property_photos",
    "virtual_tour_url",
    "DaysOnMarket",
    "CumulativeDaysOnMarket",
];

/// What the caller knows about the property being resolved
#[derive(Debug, Clone, Default)]
pub struct AdapterContext {
    /// Full address as entered
    pub address: Option<String>,
    pub parts: AddressParts,
    /// Fields to fetch; empty means every field the adapter can supply
    pub wanted: Vec<FieldId>,
}

impl AdapterContext {
    pub fn for_address(address: &str) -> Self {
        Self {
            address: Some(address.to_string()),
            parts: AddressParts::parse(address),
            wanted: Vec::new(),
        }
    }

    pub fn with_wanted(mut self, wanted: Vec<FieldId>) -> Self {
        self.wanted = wanted;
        self
    }

    pub fn wants(&self, id: FieldId) -> bool {
        self.wanted.is_empty() || self.wanted.contains(&id)
    }
}

/// Adapter result: tuples plus the side outputs some adapters produce
#[derive(Debug, Clone, Default)]
pub struct AdapterOutput {
    pub tuples: Vec<SourceTuple>,
    /// Fields tried without a value, with the reason
    pub not_found: Vec<(FieldId, String)>,
    /// Decomposed address, when the payload carried one
    pub address: Option<AddressParts>,
    /// Non-numbered keys (photos, coordinates, description)
    pub passthrough: BTreeMap<String, Value>,
    /// Remarks with mined sentences removed
    pub remarks_excised: Option<String>,
}

impl AdapterOutput {
    pub fn from_tuples(tuples: Vec<SourceTuple>) -> Self {
        Self {
            tuples,
            ..Default::default()
        }
    }
}

/// Common adapter contract
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Adapter name for logs and diagnostics
    fn name(&self) -> &'static str;

    /// Map one payload onto field tuples
    ///
    /// # Errors
    /// `AdapterError::MalformedPayload` when the payload has the wrong shape.
    async fn adapt(&self, payload: &Value, ctx: &AdapterContext) -> AdapterResult<AdapterOutput>;
}
