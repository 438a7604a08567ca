//! Externally tracked operations and the seam used to observe them

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

/// What a single status check saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The operation exists and reports `status`
    Found {
        status: String,
        cause: Option<String>,
    },
    /// The backing system does not know the operation
    NotFound,
}

impl Observation {
    pub fn found(status: impl Into<String>) -> Self {
        Observation::Found {
            status: status.into(),
            cause: None,
        }
    }

    pub fn found_with_cause(status: impl Into<String>, cause: impl Into<String>) -> Self {
        Observation::Found {
            status: status.into(),
            cause: Some(cause.into()),
        }
    }
}

/// Capability that reports the current status of an operation
///
/// Typically wraps a "describe" API call. Transport, authentication and
/// encoding are the implementor's concern; errors are fatal to the poll
/// session that made the call.
#[async_trait]
pub trait StatusCheck: Send + Sync {
    async fn check(&self, operation_id: &str) -> Result<Observation>;
}

/// Result of asking the backing system to start an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartDisposition {
    /// A new operation was accepted
    Started,
    /// An operation with the requested identifier already exists.
    /// `source_id` is the primary it was started from, when the backend knows it.
    AlreadyExists { source_id: Option<String> },
}

/// An operation started from, and identified after, a completed primary
#[async_trait]
pub trait DependentOperation: StatusCheck {
    async fn start(&self, source_id: &str, operation_id: &str) -> Result<StartDisposition>;
}

/// Observation record for one operation under polling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub id: String,
    pub started_at: DateTime<Utc>,
    /// Last status reported by the backing system
    pub status: Option<String>,
    pub failure_cause: Option<String>,
}

impl Operation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            started_at: Utc::now(),
            status: None,
            failure_cause: None,
        }
    }
}
