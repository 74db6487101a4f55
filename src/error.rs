//! Error types.
//!
//! Blocked keys are not errors: they surface as
//! [`InputDecision::Block`](crate::typing_policy::InputDecision::Block). The
//! types here cover host integration bugs and file I/O.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The host submitted a key event without a key identifier.
    #[error("key event has an empty key identifier")]
    EmptyKey,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("journal JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
