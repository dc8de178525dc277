//! Error types for kindred-core.
//!
//! Two layers of errors exist:
//!
//! - [`StoreError`] describes what went wrong while talking to the search
//!   backend. Implementations of [`crate::ProfileStore`] produce it.
//! - [`CoreError`] describes what went wrong in the orchestration layer
//!   (guard, pipeline, engine, configuration).
//!
//! Batch write failures are not errors at this level: the pipeline folds them
//! into [`crate::WriteOutcome`] values so partial success stays visible.
//!
//! # Examples
//!
//! ```rust
//! use kindred_core::StoreError;
//!
//! let err = StoreError::Overloaded { status: 429 };
//! assert!(err.is_overload());
//!
//! let err = StoreError::MissingField { field: "hits.total.value" };
//! assert!(!err.is_overload());
//! assert!(err.to_string().contains("hits.total.value"));
//! ```

use thiserror::Error;

/// Failure reported by a profile store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend asked the caller to slow down (HTTP 429 or an equivalent
    /// per-item status). This is the only retryable failure.
    #[error("Backend overloaded (status {status})")]
    Overloaded { status: u16 },

    /// The backend refused the request for a reason other than overload.
    #[error("Backend rejected request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    /// The backend could not be reached or the connection broke.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A field the contract requires was absent from the response.
    #[error("Response field missing: {field}")]
    MissingField { field: &'static str },

    /// The response was present but not in the expected form.
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// Encoding a request or decoding a response failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether this failure is the backend's overload signal.
    pub fn is_overload(&self) -> bool {
        matches!(self, StoreError::Overloaded { .. })
    }

    /// Whether this failure came from reading a malformed response.
    pub fn is_malformed_response(&self) -> bool {
        matches!(
            self,
            StoreError::MissingField { .. } | StoreError::UnexpectedShape(_)
        )
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Top-level error type for kindred-core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The existence probe could not be answered. Ingestion must not proceed
    /// on an unknown state.
    #[error("Existence probe for collection '{collection}' failed: {source}")]
    ProbeFailed {
        collection: String,
        #[source]
        source: StoreError,
    },

    /// A recommendation query (primary or fallback) failed.
    #[error("Recommendation query failed: {0}")]
    Query(#[source] StoreError),

    /// Caller supplied an argument that can never succeed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration values are inconsistent or out of range.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Configuration sources could not be read or merged.
    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
