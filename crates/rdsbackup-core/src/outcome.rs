//! Terminal results of a poll session

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

/// Cause reported when a failed operation did not say why
pub const NO_CAUSE_REPORTED: &str = "no cause reported";

/// How a poll session ended. Exactly one per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The operation reached a success status
    Completed,
    /// The operation reached a failure status
    Failed { cause: String },
    /// The policy timeout elapsed before a terminal status was seen
    TimedOut {
        #[serde(serialize_with = "as_secs")]
        elapsed: Duration,
    },
    /// The backing system does not know the operation
    NotFound,
    /// The status is in none of the policy's sets. Usually a policy bug.
    UnexpectedState { status: String },
    /// The session was cancelled by the caller
    Cancelled {
        #[serde(serialize_with = "as_secs")]
        elapsed: Duration,
    },
}

impl Outcome {
    pub fn failed(cause: Option<String>) -> Self {
        Outcome::Failed {
            cause: cause.unwrap_or_else(|| NO_CAUSE_REPORTED.to_string()),
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }

    /// Short machine-friendly name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Failed { .. } => "failed",
            Outcome::TimedOut { .. } => "timed_out",
            Outcome::NotFound => "not_found",
            Outcome::UnexpectedState { .. } => "unexpected_state",
            Outcome::Cancelled { .. } => "cancelled",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed => write!(f, "completed"),
            Outcome::Failed { cause } => write!(f, "failed: {}", cause),
            Outcome::TimedOut { elapsed } => {
                write!(f, "timed out after {}s", elapsed.as_secs())
            }
            Outcome::NotFound => write!(f, "not found"),
            Outcome::UnexpectedState { status } => {
                write!(f, "unexpected state '{}'", status)
            }
            Outcome::Cancelled { elapsed } => {
                write!(f, "cancelled after {}s", elapsed.as_secs())
            }
        }
    }
}

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failed_without_cause() {
        assert_eq!(
            Outcome::failed(None),
            Outcome::Failed {
                cause: NO_CAUSE_REPORTED.to_string()
            }
        );
        assert_eq!(
            Outcome::failed(Some("storage full".to_string())).to_string(),
            "failed: storage full"
        );
    }

    #[test]
    fn test_serialize_tagged() {
        let value = serde_json::to_value(Outcome::TimedOut {
            elapsed: Duration::from_secs(90),
        })
        .unwrap();
        assert_eq!(value, json!({"outcome": "timed_out", "elapsed": 90}));

        let value = serde_json::to_value(Outcome::UnexpectedState {
            status: "deleting".to_string(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"outcome": "unexpected_state", "status": "deleting"})
        );
    }

    #[test]
    fn test_kind_matches_serde_tag() {
        for outcome in [
            Outcome::Completed,
            Outcome::NotFound,
            Outcome::failed(None),
            Outcome::Cancelled {
                elapsed: Duration::ZERO,
            },
        ] {
            let value = serde_json::to_value(&outcome).unwrap();
            assert_eq!(value["outcome"], outcome.kind());
        }
    }
}
