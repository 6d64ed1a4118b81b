//! Error types for osmod
//!
//! Every failure of a module invocation is one of these variants. The engine
//! turns them into a failed result carrying the error message; nothing here
//! is retried or recovered locally.

use thiserror::Error;

use crate::traits::ResourceKind;

/// Result type alias for osmod operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed, missing or conflicting module parameters
    #[error("{0}")]
    Validation(String),

    /// A referenced related resource does not exist
    #[error("{kind} '{key}' not found")]
    Precondition {
        /// Kind of the missing resource
        kind: ResourceKind,
        /// Name or ID that was looked up
        key: String,
    },

    /// More than one resource matched a lookup that must be unique
    #[error("multiple {kind} resources match '{key}' ({count} found)")]
    Ambiguous {
        /// Kind of the resource
        kind: ResourceKind,
        /// Name or ID that was looked up
        key: String,
        /// Number of matches
        count: usize,
    },

    /// The requested update touches fields that cannot change after creation
    #[error("cannot update immutable {kind} attributes: {}", fields.join(", "))]
    ImmutableChange {
        /// Kind of the resource
        kind: ResourceKind,
        /// Offending field names
        fields: Vec<String>,
    },

    /// Error surfaced by the cloud client, passed through opaquely
    #[error("cloud error ({cloud}): {message}")]
    Cloud {
        /// Cloud client name
        cloud: String,
        /// Error message
        message: String,
    },

    /// A waited-for status transition did not finish in time
    #[error("timeout after {secs}s waiting for {kind} {id}")]
    Timeout {
        /// Kind of the resource
        kind: ResourceKind,
        /// Resource ID
        id: String,
        /// Timeout that elapsed
        secs: u64,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a "related resource not found" error
    pub fn precondition(kind: ResourceKind, key: impl Into<String>) -> Self {
        Self::Precondition {
            kind,
            key: key.into(),
        }
    }

    /// Create an ambiguity error
    pub fn ambiguous(kind: ResourceKind, key: impl Into<String>, count: usize) -> Self {
        Self::Ambiguous {
            kind,
            key: key.into(),
            count,
        }
    }

    /// Create an immutable-change error
    pub fn immutable(kind: ResourceKind, fields: Vec<String>) -> Self {
        Self::ImmutableChange { kind, fields }
    }

    /// Create a cloud client error
    pub fn cloud(cloud: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Cloud {
            cloud: cloud.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error was raised before any remote call was made
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
