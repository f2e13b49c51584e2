//! clues-resolve library interface
//!
//! Field resolution and arbitration for property records: a typed schema
//! registry, source adapters, web-search extraction, last-writer-wins
//! arbitration with provenance, calculated fields and quality scoring.
//!
//! # Flow
//! adapters → [`arbitration::ArbitrationEngine`] → [`calculated`] resolver →
//! [`quality`] aggregator, orchestrated by [`pipeline::ResolutionPipeline`].

pub mod adapters;
pub mod arbitration;
pub mod calculated;
pub mod error;
pub mod pipeline;
pub mod quality;
pub mod record;
pub mod schema;
pub mod search;
pub mod types;

pub use crate::error::{AdapterError, AdapterResult, SearchError};
pub use crate::pipeline::{Resolution, ResolutionPipeline};
pub use crate::record::PropertyRecord;
pub use crate::schema::SchemaRegistry;
