//! Error types for the org hierarchy tools.
//!
//! Library crates use [`OrgChartError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Only fatal conditions live here. Recoverable conditions (cycles in the
//! manager chain, an empty org) are reported as warnings by the builder.

use std::path::PathBuf;

/// Top-level error type for all org hierarchy operations.
#[derive(Debug, thiserror::Error)]
pub enum OrgChartError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The directory source could not be reached or rejected our credentials.
    #[error("SourceUnavailable: {message}")]
    SourceUnavailable { message: String },

    /// Scoped run requested a manager that is not among the eligible records.
    #[error("ManagerNotFound: no eligible user with mail '{mail}'")]
    ManagerNotFound { mail: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON encoding/decoding error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Data validation error (malformed snapshot, bad pattern, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OrgChartError>;

impl OrgChartError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a source-unavailable error from any displayable message.
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            message: msg.into(),
        }
    }

    /// Create a manager-not-found error for the given mail address.
    pub fn manager_not_found(mail: impl Into<String>) -> Self {
        Self::ManagerNotFound { mail: mail.into() }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short category name, as used in user-facing messages and logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "Config",
            Self::SourceUnavailable { .. } => "SourceUnavailable",
            Self::ManagerNotFound { .. } => "ManagerNotFound",
            Self::Io { .. } => "Io",
            Self::Serialization(_) => "Serialization",
            Self::Validation { .. } => "Validation",
        }
    }
}

impl From<serde_json::Error> for OrgChartError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
