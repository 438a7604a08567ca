//! Multi-step workflows built on the poller
//!
//! A two-stage workflow waits for a primary operation, then starts a
//! dependent operation whose identifier is derived from the primary's and
//! waits for that too. Snapshot-then-export is the canonical example.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{CoreError, Result};
use crate::operation::{DependentOperation, StartDisposition, StatusCheck};
use crate::outcome::Outcome;
use crate::policy::PollPolicy;
use crate::progress::{ProgressCallback, poll_until_terminal};

/// Which stage produced a workflow's outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Primary,
    Dependent,
}

/// Result of a two-stage workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowReport {
    pub primary_id: String,
    /// Set once stage 2 was entered
    pub dependent_id: Option<String>,
    /// True when stage 2 attached to an operation that already existed
    pub reused_existing: bool,
    pub stage: Stage,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl WorkflowReport {
    fn primary(primary_id: &str, outcome: Outcome) -> Self {
        Self {
            primary_id: primary_id.to_string(),
            dependent_id: None,
            reused_existing: false,
            stage: Stage::Primary,
            outcome,
        }
    }
}

/// One stage of a workflow: what to poll and how
pub struct StageConfig<'a, T: ?Sized> {
    pub operation: &'a T,
    pub policy: &'a PollPolicy,
}

/// Run a primary operation to completion, then start and poll a dependent one
///
/// This workflow:
/// 1. Polls `primary_id` with the primary policy
/// 2. Stops with stage 1's outcome unless it is `Completed`
/// 3. Starts the dependent operation `derive_id(primary_id)`
/// 4. Polls it with the dependent policy
///
/// A dependent operation that already exists is reused, but only when it was
/// started from the same primary. A backend that reports a different source
/// yields [`CoreError::Conflict`].
///
/// # Example
///
/// ```rust,ignore
/// let report = run_two_stage(
///     "snap-20240101-000000",
///     StageConfig { operation: &snapshots, policy: &snapshot_policy },
///     StageConfig { operation: &exports, policy: &export_policy },
///     |id| format!("export-{}", id),
///     None,
///     None,
/// ).await?;
/// ```
pub async fn run_two_stage<P, D, F>(
    primary_id: &str,
    primary: StageConfig<'_, P>,
    dependent: StageConfig<'_, D>,
    derive_id: F,
    on_progress: Option<&ProgressCallback>,
    cancel: Option<&CancellationToken>,
) -> Result<WorkflowReport>
where
    P: StatusCheck + ?Sized,
    D: DependentOperation + ?Sized,
    F: Fn(&str) -> String,
{
    // Stage 1
    let outcome = poll_until_terminal(
        primary.operation,
        primary_id,
        primary.policy,
        on_progress,
        cancel,
    )
    .await?;
    if !outcome.is_completed() {
        return Ok(WorkflowReport::primary(primary_id, outcome));
    }

    // Stage 2
    let dependent_id = derive_id(primary_id);
    if dependent_id.is_empty() {
        return Err(CoreError::Validation(format!(
            "derived identifier for '{}' is empty",
            primary_id
        )));
    }

    let reused_existing = start_dependent(dependent.operation, primary_id, &dependent_id).await?;

    let outcome = poll_until_terminal(
        dependent.operation,
        &dependent_id,
        dependent.policy,
        on_progress,
        cancel,
    )
    .await?;

    Ok(WorkflowReport {
        primary_id: primary_id.to_string(),
        dependent_id: Some(dependent_id),
        reused_existing,
        stage: Stage::Dependent,
        outcome,
    })
}

/// Start the dependent operation. Returns true when an existing one is reused.
pub async fn start_dependent<D>(operation: &D, source_id: &str, dependent_id: &str) -> Result<bool>
where
    D: DependentOperation + ?Sized,
{
    match operation.start(source_id, dependent_id).await? {
        StartDisposition::Started => {
            info!(source_id, dependent_id, "Started dependent operation");
            Ok(false)
        }
        StartDisposition::AlreadyExists { source_id: existing } => match existing {
            Some(existing) if existing != source_id => Err(CoreError::Conflict {
                operation_id: dependent_id.to_string(),
                existing_source: existing,
                expected_source: source_id.to_string(),
            }),
            Some(_) => {
                warn!(dependent_id, "Dependent operation already exists, reusing it");
                Ok(true)
            }
            None => {
                warn!(
                    dependent_id,
                    "Dependent operation already exists with unknown source, reusing it"
                );
                Ok(true)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Observation;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct Scripted {
        script: Mutex<VecDeque<Observation>>,
        checked: Mutex<Vec<String>>,
        starts: AtomicU32,
        start_result: StartDisposition,
    }

    impl Scripted {
        fn new(script: Vec<Observation>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                checked: Mutex::new(Vec::new()),
                starts: AtomicU32::new(0),
                start_result: StartDisposition::Started,
            }
        }

        fn with_start(mut self, start_result: StartDisposition) -> Self {
            self.start_result = start_result;
            self
        }

        fn checks(&self) -> usize {
            self.checked.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl StatusCheck for Scripted {
        async fn check(&self, operation_id: &str) -> Result<Observation> {
            self.checked.lock().unwrap().push(operation_id.to_string());
            Ok(self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Observation::NotFound))
        }
    }

    #[async_trait]
    impl DependentOperation for Scripted {
        async fn start(&self, _source_id: &str, _operation_id: &str) -> Result<StartDisposition> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(self.start_result.clone())
        }
    }

    fn policy(pending: &[&str], success: &[&str], failure: &[&str]) -> PollPolicy {
        PollPolicy::builder()
            .pending(pending.iter().copied())
            .success(success.iter().copied())
            .failure(failure.iter().copied())
            .timeout(Duration::from_secs(3600))
            .interval(Duration::from_secs(30))
            .build()
            .unwrap()
    }

    fn snapshot_policy() -> PollPolicy {
        policy(&["creating"], &["available"], &["error"])
    }

    fn export_policy() -> PollPolicy {
        policy(&["STARTING", "IN_PROGRESS"], &["COMPLETED"], &["FAILED"])
    }

    fn export_id(id: &str) -> String {
        format!("export-{}", id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_stages_complete() {
        let snapshots = Scripted::new(vec![
            Observation::found("creating"),
            Observation::found("available"),
        ]);
        let exports = Scripted::new(vec![
            Observation::found("STARTING"),
            Observation::found("IN_PROGRESS"),
            Observation::found("COMPLETED"),
        ]);
        let (sp, ep) = (snapshot_policy(), export_policy());

        let report = run_two_stage(
            "snap-1",
            StageConfig { operation: &snapshots, policy: &sp },
            StageConfig { operation: &exports, policy: &ep },
            export_id,
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(report.outcome, Outcome::Completed);
        assert_eq!(report.stage, Stage::Dependent);
        assert_eq!(report.dependent_id.as_deref(), Some("export-snap-1"));
        assert!(!report.reused_existing);
        assert_eq!(exports.starts.load(Ordering::SeqCst), 1);
        assert!(
            exports
                .checked
                .lock()
                .unwrap()
                .iter()
                .all(|id| id == "export-snap-1")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_one_failure_skips_stage_two() {
        let snapshots = Scripted::new(vec![
            Observation::found("creating"),
            Observation::found_with_cause("error", "storage full"),
        ]);
        let exports = Scripted::new(vec![Observation::found("COMPLETED")]);
        let (sp, ep) = (snapshot_policy(), export_policy());

        let report = run_two_stage(
            "snap-1",
            StageConfig { operation: &snapshots, policy: &sp },
            StageConfig { operation: &exports, policy: &ep },
            export_id,
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(
            report.outcome,
            Outcome::Failed {
                cause: "storage full".to_string()
            }
        );
        assert_eq!(report.stage, Stage::Primary);
        assert!(report.dependent_id.is_none());
        assert_eq!(exports.starts.load(Ordering::SeqCst), 0);
        assert_eq!(exports.checks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_one_not_found_passes_through() {
        let snapshots = Scripted::new(vec![Observation::NotFound]);
        let exports = Scripted::new(vec![]);
        let (sp, ep) = (snapshot_policy(), export_policy());

        let report = run_two_stage(
            "snap-missing",
            StageConfig { operation: &snapshots, policy: &sp },
            StageConfig { operation: &exports, policy: &ep },
            export_id,
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(report.outcome, Outcome::NotFound);
        assert_eq!(report.stage, Stage::Primary);
        assert_eq!(exports.checks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_two_failure() {
        let snapshots = Scripted::new(vec![Observation::found("available")]);
        let exports = Scripted::new(vec![
            Observation::found("IN_PROGRESS"),
            Observation::found_with_cause("FAILED", "S3 bucket not writable"),
        ]);
        let (sp, ep) = (snapshot_policy(), export_policy());

        let report = run_two_stage(
            "snap-1",
            StageConfig { operation: &snapshots, policy: &sp },
            StageConfig { operation: &exports, policy: &ep },
            export_id,
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(report.stage, Stage::Dependent);
        assert_eq!(
            report.outcome,
            Outcome::Failed {
                cause: "S3 bucket not writable".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_dependent_with_same_source_is_reused() {
        let snapshots = Scripted::new(vec![Observation::found("available")]);
        let exports = Scripted::new(vec![Observation::found("COMPLETED")]).with_start(
            StartDisposition::AlreadyExists {
                source_id: Some("snap-1".to_string()),
            },
        );
        let (sp, ep) = (snapshot_policy(), export_policy());

        let report = run_two_stage(
            "snap-1",
            StageConfig { operation: &snapshots, policy: &sp },
            StageConfig { operation: &exports, policy: &ep },
            export_id,
            None,
            None,
        )
        .await
        .unwrap();

        assert!(report.reused_existing);
        assert_eq!(report.dependent_id.as_deref(), Some("export-snap-1"));
        assert_eq!(report.outcome, Outcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_dependent_from_other_source_conflicts() {
        let snapshots = Scripted::new(vec![Observation::found("available")]);
        let exports = Scripted::new(vec![Observation::found("COMPLETED")]).with_start(
            StartDisposition::AlreadyExists {
                source_id: Some("snap-0".to_string()),
            },
        );
        let (sp, ep) = (snapshot_policy(), export_policy());

        let err = run_two_stage(
            "snap-1",
            StageConfig { operation: &snapshots, policy: &sp },
            StageConfig { operation: &exports, policy: &ep },
            export_id,
            None,
            None,
        )
        .await
        .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(exports.checks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_derived_id_rejected() {
        let snapshots = Scripted::new(vec![Observation::found("available")]);
        let exports = Scripted::new(vec![]);
        let (sp, ep) = (snapshot_policy(), export_policy());

        let err = run_two_stage(
            "snap-1",
            StageConfig { operation: &snapshots, policy: &sp },
            StageConfig { operation: &exports, policy: &ep },
            |_| String::new(),
            None,
            None,
        )
        .await
        .unwrap_err();

        assert!(err.is_bad_request());
        assert_eq!(exports.starts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_report_serializes_flat_outcome() {
        let report = WorkflowReport::primary(
            "snap-1",
            Outcome::Failed {
                cause: "boom".to_string(),
            },
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["outcome"], "failed");
        assert_eq!(value["cause"], "boom");
        assert_eq!(value["stage"], "primary");
    }
}
