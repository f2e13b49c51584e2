//! # CLUES Common Library
//!
//! Shared code for the CLUES crates:
//! - Error and result types
//! - TOML bootstrap configuration and config-file discovery
//! - Logging initialisation
//! - API key resolution helpers

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
