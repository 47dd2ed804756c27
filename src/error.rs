//! Centralized error types for mailsmoke.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailsmoke library.
#[derive(Error, Debug)]
pub enum SmokeError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A human-readable size string could not be parsed.
    #[error("Invalid size '{input}': {reason}")]
    InvalidFormat { input: String, reason: String },

    /// A library filter was applied to something that is not a library.
    #[error("Cannot use '{filter}' filter with type '{found}'")]
    TypeMismatch { filter: String, found: String },

    /// A sample asked for more attachments than the library holds.
    #[error("Cannot sample {requested} attachment(s) from a library of {available}")]
    InsufficientItems { requested: usize, available: usize },

    /// A library root does not exist. Logged, never returned by `build`.
    #[error("Library root does not exist: {0}")]
    MissingRoot(PathBuf),

    /// Template compilation or rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// The rendered spec is not valid YAML or does not match the schema.
    #[error("Spec YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The spec parsed but its content is unusable.
    #[error("Invalid spec: {0}")]
    InvalidSpec(String),

    /// A message header value is malformed.
    #[error("Invalid '{name}' header: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// An export operation failed.
    #[error("Export error: {0}")]
    Export(String),
}

/// Convenience alias for `Result<T, SmokeError>`.
pub type Result<T> = std::result::Result<T, SmokeError>;

impl SmokeError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an `InvalidFormat` variant for a size string.
    pub fn invalid_format(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `SmokeError::io`).
impl From<std::io::Error> for SmokeError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

/// Library errors raised inside template filters keep the original error as
/// the source, so callers can downcast it back.
impl From<SmokeError> for minijinja::Error {
    fn from(err: SmokeError) -> Self {
        match err {
            SmokeError::Template(inner) => inner,
            other => minijinja::Error::new(
                minijinja::ErrorKind::InvalidOperation,
                other.to_string(),
            )
            .with_source(other),
        }
    }
}
