//! Status tables and default cadence for RDS operations

use std::collections::BTreeSet;
use std::time::Duration;

use crate::policy::PollPolicy;

/// Default time to wait for a snapshot to become available (60 minutes)
pub const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Default snapshot polling interval (30 seconds)
pub const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(30);

/// Default time to wait for an export task (180 minutes)
pub const EXPORT_TIMEOUT: Duration = Duration::from_secs(180 * 60);

/// Default export polling interval (60 seconds)
pub const EXPORT_INTERVAL: Duration = Duration::from_secs(60);

const SNAPSHOT_PENDING: &[&str] = &["creating", "backing-up", "restoring", "modifying"];
const SNAPSHOT_SUCCESS: &[&str] = &["available"];
const SNAPSHOT_FAILURE: &[&str] = &["failed", "error"];

// The API reports COMPLETE/CANCELING/CANCELED; the other spellings show up
// in older tooling and documentation.
const EXPORT_PENDING: &[&str] = &[
    "CREATING",
    "STARTING",
    "IN_PROGRESS",
    "CANCELING",
    "CANCELLING",
];
const EXPORT_SUCCESS: &[&str] = &["COMPLETE", "COMPLETED"];
const EXPORT_FAILURE: &[&str] = &["FAILED", "CANCELED"];

fn set(statuses: &[&str]) -> BTreeSet<String> {
    statuses.iter().map(|s| s.to_string()).collect()
}

/// Policy for a manual DB snapshot
pub fn snapshot_policy() -> PollPolicy {
    PollPolicy {
        timeout: SNAPSHOT_TIMEOUT,
        interval: SNAPSHOT_INTERVAL,
        pending_statuses: set(SNAPSHOT_PENDING),
        success_statuses: set(SNAPSHOT_SUCCESS),
        failure_statuses: set(SNAPSHOT_FAILURE),
    }
}

/// Policy for a snapshot export task
pub fn export_policy() -> PollPolicy {
    PollPolicy {
        timeout: EXPORT_TIMEOUT,
        interval: EXPORT_INTERVAL,
        pending_statuses: set(EXPORT_PENDING),
        success_statuses: set(EXPORT_SUCCESS),
        failure_statuses: set(EXPORT_FAILURE),
    }
}

/// The pair of policies used by the backup workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPolicies {
    pub snapshot: PollPolicy,
    pub export: PollPolicy,
}

impl Default for BackupPolicies {
    fn default() -> Self {
        Self {
            snapshot: snapshot_policy(),
            export: export_policy(),
        }
    }
}
