//! Error types for fieldgate
//!
//! Evaluation fails fast: the first [`Error`] raised anywhere in an
//! evaluation tree aborts the whole call. A forbidden modification is not an
//! error; it is reported through [`crate::ModificationCheck`].

use thiserror::Error;

use crate::document::SchemaId;

/// Error raised by a caller-supplied rule predicate.
///
/// The engine never interprets these. They travel unchanged to the caller
/// inside [`Error::Predicate`].
#[derive(Debug, Error)]
pub enum PredicateError {
    /// Free-form failure message
    #[error("{0}")]
    Custom(String),

    /// Underlying error from the predicate implementation
    #[error(transparent)]
    Source(Box<dyn std::error::Error + Send + Sync>),
}

impl PredicateError {
    /// Wrap any error type.
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Source(Box::new(err))
    }
}

impl From<String> for PredicateError {
    fn from(s: String) -> Self {
        Self::Custom(s)
    }
}

impl From<&str> for PredicateError {
    fn from(s: &str) -> Self {
        Self::Custom(s.to_string())
    }
}

/// Errors that can occur while loading a rule manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// IO error reading the manifest file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest is not valid JSON or has the wrong shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level error type for evaluations
#[derive(Debug, Error)]
pub enum Error {
    /// The access gate denied access to a record
    #[error("access denied to {schema}{}", message_suffix(.message))]
    AccessDenied {
        /// Schema of the record that was refused
        schema: SchemaId,
        /// Optional diagnostic message
        message: Option<String>,
    },

    /// A rule predicate failed
    #[error("rule predicate failed: {0}")]
    Predicate(#[from] PredicateError),
}

impl Error {
    /// Returns true if the access gate refused a record
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    /// Returns true if a caller-supplied predicate failed
    pub fn is_predicate(&self) -> bool {
        matches!(self, Self::Predicate(_))
    }
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

/// Result type for fieldgate evaluations
pub type Result<T> = std::result::Result<T, Error>;
