//! Higher-level RDS workflows that compose snapshot and export calls
//!
//! These workflows handle:
//! - Generating and deriving identifiers
//! - Tolerating operations that already exist
//! - Waiting for each stage with its own policy

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{CoreError, Result};
use crate::operation::StartDisposition;
use crate::outcome::Outcome;
use crate::policy::PollPolicy;
use crate::progress::{ProgressCallback, poll_until_terminal};
use crate::rds::api::{ExportTarget, ExportTasks, RdsApi, Snapshots};
use crate::rds::identifiers::{export_task_identifier, snapshot_identifier};
use crate::rds::policies::BackupPolicies;
use crate::workflows::{StageConfig, WorkflowReport, run_two_stage};

/// Everything needed to back up one DB instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPlan {
    pub db_instance_id: String,
    pub snapshot_prefix: String,
    pub target: ExportTarget,
}

/// Create a manual snapshot and wait until it is available
///
/// A snapshot that already exists under `snapshot_id` is polled as if it had
/// just been created.
///
/// # Arguments
///
/// * `api` - RDS API implementation
/// * `db_instance_id` - Instance to snapshot
/// * `snapshot_id` - Identifier for the new snapshot
/// * `policy` - Snapshot poll policy
/// * `on_progress` - Optional callback for progress updates
/// * `cancel` - Optional cancellation token
pub async fn create_snapshot_and_wait<A>(
    api: &A,
    db_instance_id: &str,
    snapshot_id: &str,
    policy: &PollPolicy,
    on_progress: Option<&ProgressCallback>,
    cancel: Option<&CancellationToken>,
) -> Result<Outcome>
where
    A: RdsApi + ?Sized,
{
    create_snapshot(api, db_instance_id, snapshot_id).await?;
    poll_until_terminal(&Snapshots::new(api), snapshot_id, policy, on_progress, cancel).await
}

/// Export an existing snapshot to S3 and wait for the export task
///
/// The snapshot is checked first and must be available; any other outcome is
/// reported without starting an export.
pub async fn export_snapshot_and_wait<A>(
    api: &A,
    snapshot_id: &str,
    target: &ExportTarget,
    policies: &BackupPolicies,
    on_progress: Option<&ProgressCallback>,
    cancel: Option<&CancellationToken>,
) -> Result<WorkflowReport>
where
    A: RdsApi + ?Sized,
{
    run_two_stage(
        snapshot_id,
        StageConfig {
            operation: &Snapshots::new(api),
            policy: &policies.snapshot,
        },
        StageConfig {
            operation: &ExportTasks::new(api, target),
            policy: &policies.export,
        },
        export_task_identifier,
        on_progress,
        cancel,
    )
    .await
}

/// Snapshot a DB instance, export the snapshot to S3, and wait for both
///
/// This workflow:
/// 1. Generates `{prefix}-{timestamp}` and creates the snapshot
/// 2. Polls the snapshot until available
/// 3. Starts export task `export-{snapshot}`
/// 4. Polls the export task until it settles
///
/// # Example
///
/// ```rust,ignore
/// let report = backup_and_export_and_wait(&api, &plan, &BackupPolicies::default(), None, None).await?;
/// if !report.outcome.is_completed() {
///     eprintln!("backup stopped at {:?}: {}", report.stage, report.outcome);
/// }
/// ```
pub async fn backup_and_export_and_wait<A>(
    api: &A,
    plan: &BackupPlan,
    policies: &BackupPolicies,
    on_progress: Option<&ProgressCallback>,
    cancel: Option<&CancellationToken>,
) -> Result<WorkflowReport>
where
    A: RdsApi + ?Sized,
{
    if plan.db_instance_id.is_empty() {
        return Err(CoreError::Validation(
            "DB instance identifier must not be empty".to_string(),
        ));
    }
    if plan.snapshot_prefix.is_empty() {
        return Err(CoreError::Validation(
            "snapshot prefix must not be empty".to_string(),
        ));
    }

    let snapshot_id = snapshot_identifier(&plan.snapshot_prefix, Utc::now());
    create_snapshot(api, &plan.db_instance_id, &snapshot_id).await?;

    export_snapshot_and_wait(api, &snapshot_id, &plan.target, policies, on_progress, cancel).await
}

async fn create_snapshot<A>(api: &A, db_instance_id: &str, snapshot_id: &str) -> Result<()>
where
    A: RdsApi + ?Sized,
{
    match api.create_snapshot(db_instance_id, snapshot_id).await? {
        StartDisposition::Started => {
            info!(db_instance_id, snapshot_id, "Snapshot creation initiated");
        }
        StartDisposition::AlreadyExists { .. } => {
            warn!(snapshot_id, "Snapshot already exists, waiting on the existing one");
        }
    }
    Ok(())
}
