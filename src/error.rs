//! Error types for the retrieval coordinator

use crate::core::Subsystem;
use thiserror::Error;

/// Result type alias using the coordinator's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the retrieval coordinator
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration, fatal at construction time
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed query request, raised before any backend is contacted
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A backend is unreachable, misconfigured, or not installed
    #[error("{subsystem} subsystem unavailable: {reason}")]
    SubsystemUnavailable {
        /// Which backend failed
        subsystem: Subsystem,
        /// Human-readable cause
        reason: String,
    },

    /// Query embedding could not be generated
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a `SubsystemUnavailable` error
    pub fn unavailable(subsystem: Subsystem, reason: impl Into<String>) -> Self {
        Error::SubsystemUnavailable {
            subsystem,
            reason: reason.into(),
        }
    }

    /// Check if error is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidRequest(_) | Error::Config(_))
    }

    /// Check if error should be absorbed as a degraded subsystem instead of
    /// failing the query
    pub fn is_subsystem_failure(&self) -> bool {
        matches!(
            self,
            Error::SubsystemUnavailable { .. }
                | Error::Embedding(_)
                | Error::Database(_)
                | Error::Timeout(_)
                | Error::Io(_)
        )
    }
}
