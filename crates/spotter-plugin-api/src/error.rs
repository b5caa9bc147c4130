//! Error types for the plugin protocol engine.
//!
//! None of these errors ever reach the host. Each one degrades to either a
//! dropped message or an empty, complete response, and is logged.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Wire codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Inbound payload is not JSON or has no recognized `type`.
    #[error("Malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Outbound message could not be serialized.
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Transport session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The host could not be reached. Fatal for this run.
    #[error("Connect to '{endpoint}' failed: {reason}")]
    ConnectFailed { endpoint: String, reason: String },
}

/// Kind of a registered option callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Action,
    Query,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action => f.write_str("action"),
            Self::Query => f.write_str("query"),
        }
    }
}

/// Handler registry errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No live handler of that kind has this id. Expected after supersession.
    #[error("Unknown {kind} handler '{id}'")]
    UnknownHandler { kind: HandlerKind, id: String },

    /// The generation was evicted before the handler could be registered.
    #[error("Generation {0} was evicted")]
    GenerationEvicted(u64),
}

/// Failure of a user-supplied option callback.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HandlerError {
    /// The callback returned an error.
    #[error("{0}")]
    Failed(String),

    /// The callback panicked.
    #[error("Handler panicked: {0}")]
    Panicked(String),

    /// The callback did not resolve within the handler timeout.
    #[error("Handler timed out after {0:?}")]
    TimedOut(Duration),
}

impl HandlerError {
    /// Create a `Failed` error from any message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        Self::Failed(e.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Failed(e.to_string())
    }
}

/// Result type returned by option callbacks.
pub type HandlerResult<T> = Result<T, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::UnknownHandler {
            kind: HandlerKind::Action,
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown action handler 'abc'");

        let err = HandlerError::TimedOut(Duration::from_secs(2));
        assert_eq!(err.to_string(), "Handler timed out after 2s");
    }

    #[test]
    fn test_handler_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "db.json missing");
        let err: HandlerError = io.into();
        assert_eq!(err, HandlerError::Failed("db.json missing".to_string()));
    }
}
