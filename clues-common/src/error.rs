//! Common error types for CLUES

use thiserror::Error;

/// Common result type for CLUES operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the CLUES crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    ///
    /// Startup-time only. Schema integrity violations land here and halt
    /// initialisation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
