//! Unified error handling for rdsbackup-core
//!
//! Poll sessions report their terminal state through [`Outcome`](crate::Outcome);
//! `CoreError` covers everything that prevents a session from producing one:
//! a failing status check, bad input, or a conflicting pre-existing operation.
//!
//! # Example
//!
//! ```rust
//! use rdsbackup_core::{CoreError, Result};
//!
//! fn handle_error(err: CoreError) {
//!     if err.is_retryable() {
//!         println!("Transport error, the caller may retry");
//!     } else if err.is_bad_request() {
//!         println!("Fix the input and try again");
//!     }
//! }
//!
//! let err = CoreError::Validation("operation id must not be empty".to_string());
//! assert!(err.is_bad_request());
//! ```

use thiserror::Error;

/// Boxed error returned by status-check collaborators
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type for poll sessions and workflows
#[derive(Error, Debug)]
pub enum CoreError {
    /// The status-check capability failed (transport, auth, throttling...)
    #[error("Status check for '{operation_id}' failed: {source}")]
    StatusCheck {
        operation_id: String,
        #[source]
        source: BoxError,
    },

    /// Starting a dependent operation failed
    #[error("Failed to start '{operation_id}': {source}")]
    StartFailed {
        operation_id: String,
        #[source]
        source: BoxError,
    },

    /// An operation with the same identifier exists but belongs to something else
    #[error("Operation '{operation_id}' already exists for source '{existing_source}', expected '{expected_source}'")]
    Conflict {
        operation_id: String,
        existing_source: String,
        expected_source: String,
    },

    /// Validation error (e.g., empty identifier, overlapping status sets)
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Wrap a collaborator error raised while checking `operation_id`
    pub fn status_check(operation_id: &str, source: impl Into<BoxError>) -> Self {
        CoreError::StatusCheck {
            operation_id: operation_id.to_string(),
            source: source.into(),
        }
    }

    /// Wrap a collaborator error raised while starting `operation_id`
    pub fn start_failed(operation_id: &str, source: impl Into<BoxError>) -> Self {
        CoreError::StartFailed {
            operation_id: operation_id.to_string(),
            source: source.into(),
        }
    }

    /// Returns true if this is a conflicting pre-existing operation
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::Conflict { .. })
    }

    /// Returns true if the caller supplied bad input
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        matches!(self, CoreError::Validation(_))
    }

    /// Returns true if this error is potentially retryable
    ///
    /// Only collaborator failures qualify. The poller itself never retries them.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::StatusCheck { .. } | CoreError::StartFailed { .. }
        )
    }
}
