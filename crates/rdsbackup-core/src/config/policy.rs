//! Poll cadence overrides stored in profiles
//!
//! Profiles can stretch or tighten the snapshot and export presets without
//! touching the status tables, which are fixed by the RDS API.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::policy::PollPolicy;

/// Timeout and interval overrides for one poll policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyOverrides {
    /// Maximum time to wait, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Delay between status checks, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
}

impl PolicyOverrides {
    /// Apply the overrides on top of `base`
    pub fn apply(&self, base: PollPolicy) -> PollPolicy {
        let mut policy = base;
        if let Some(secs) = self.timeout_secs {
            policy.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.interval_secs {
            policy.interval = Duration::from_secs(secs);
        }
        policy
    }

    pub fn is_empty(&self) -> bool {
        self.timeout_secs.is_none() && self.interval_secs.is_none()
    }
}
