//! Poll policies: how long to wait, how often to look, and how to read a status
//!
//! A [`PollPolicy`] classifies every status string reported by a status check
//! into one of three disjoint buckets. Anything outside the buckets is an
//! unexpected state, which the poller surfaces instead of retrying.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;

use crate::error::{CoreError, Result};

/// Default timeout when a builder does not set one (10 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Default polling interval when a builder does not set one (10 seconds)
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Bucket a status string falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Pending,
    Success,
    Failure,
}

/// Configuration governing a single poll loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollPolicy {
    /// Maximum wall-clock time to wait for a terminal status
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Fixed delay between consecutive status checks
    #[serde(with = "duration_secs")]
    pub interval: Duration,
    pub pending_statuses: BTreeSet<String>,
    pub success_statuses: BTreeSet<String>,
    pub failure_statuses: BTreeSet<String>,
}

impl PollPolicy {
    /// Start building a policy
    pub fn builder() -> PollPolicyBuilder {
        PollPolicyBuilder::default()
    }

    /// Classify a status, or `None` when it is in none of the sets
    pub fn classify(&self, status: &str) -> Option<StatusClass> {
        if self.success_statuses.contains(status) {
            Some(StatusClass::Success)
        } else if self.failure_statuses.contains(status) {
            Some(StatusClass::Failure)
        } else if self.pending_statuses.contains(status) {
            Some(StatusClass::Pending)
        } else {
            None
        }
    }

    /// Check that the classification sets are pairwise disjoint and a
    /// terminal status exists
    pub fn validate(&self) -> Result<()> {
        if self.success_statuses.is_empty() {
            return Err(CoreError::Validation(
                "poll policy needs at least one success status".to_string(),
            ));
        }

        let pairs = [
            ("pending", &self.pending_statuses, "success", &self.success_statuses),
            ("pending", &self.pending_statuses, "failure", &self.failure_statuses),
            ("success", &self.success_statuses, "failure", &self.failure_statuses),
        ];
        for (left_name, left, right_name, right) in pairs {
            if let Some(status) = left.intersection(right).next() {
                return Err(CoreError::Validation(format!(
                    "status '{}' is listed as both {} and {}",
                    status, left_name, right_name
                )));
            }
        }
        Ok(())
    }

    /// Same policy with a different timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Same policy with a different interval
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Builder for [`PollPolicy`]
#[derive(Debug, Clone, Default)]
pub struct PollPolicyBuilder {
    timeout: Option<Duration>,
    interval: Option<Duration>,
    pending: BTreeSet<String>,
    success: BTreeSet<String>,
    failure: BTreeSet<String>,
}

impl PollPolicyBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn pending<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(statuses.into_iter().map(Into::into));
        self
    }

    pub fn success<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.success.extend(statuses.into_iter().map(Into::into));
        self
    }

    pub fn failure<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failure.extend(statuses.into_iter().map(Into::into));
        self
    }

    /// Build and validate the policy
    pub fn build(self) -> Result<PollPolicy> {
        let policy = PollPolicy {
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            interval: self.interval.unwrap_or(DEFAULT_INTERVAL),
            pending_statuses: self.pending,
            success_statuses: self.success,
            failure_statuses: self.failure,
        };
        policy.validate()?;
        Ok(policy)
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_like() -> PollPolicy {
        PollPolicy::builder()
            .pending(["creating", "backing-up"])
            .success(["available"])
            .failure(["error"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_classify() {
        let policy = snapshot_like();
        assert_eq!(policy.classify("creating"), Some(StatusClass::Pending));
        assert_eq!(policy.classify("backing-up"), Some(StatusClass::Pending));
        assert_eq!(policy.classify("available"), Some(StatusClass::Success));
        assert_eq!(policy.classify("error"), Some(StatusClass::Failure));
        assert_eq!(policy.classify("deleting"), None);
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        let policy = snapshot_like();
        assert_eq!(policy.classify("AVAILABLE"), None);
    }

    #[test]
    fn test_builder_defaults() {
        let policy = snapshot_like();
        assert_eq!(policy.timeout, DEFAULT_TIMEOUT);
        assert_eq!(policy.interval, DEFAULT_INTERVAL);
    }

    #[test]
    fn test_overlapping_sets_rejected() {
        let err = PollPolicy::builder()
            .pending(["creating", "available"])
            .success(["available"])
            .build()
            .unwrap_err();
        assert!(err.is_bad_request());
        assert!(err.to_string().contains("available"));

        let err = PollPolicy::builder()
            .success(["done"])
            .failure(["done"])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("success and failure"));
    }

    #[test]
    fn test_success_required() {
        let err = PollPolicy::builder()
            .pending(["creating"])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("success status"));
    }

    #[test]
    fn test_with_overrides() {
        let policy = snapshot_like()
            .with_timeout(Duration::ZERO)
            .with_interval(Duration::from_secs(1));
        assert_eq!(policy.timeout, Duration::ZERO);
        assert_eq!(policy.interval, Duration::from_secs(1));
    }
}
