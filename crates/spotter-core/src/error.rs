//! Error types shared across Spotter crates.

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A value parsed but is not usable.
    #[error("Invalid config: {0}")]
    Invalid(String),
}
