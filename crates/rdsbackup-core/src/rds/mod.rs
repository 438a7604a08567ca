//! RDS snapshot and export workflows
//!
//! This module expresses the "snapshot an instance, export the snapshot to
//! S3" runbook on top of the generic poller. AWS itself stays behind the
//! [`RdsApi`] trait; the CLI provides the SDK-backed implementation.
//!
//! ## Overview
//!
//! - `create_snapshot_and_wait` - Create a manual snapshot and wait for `available`
//! - `export_snapshot_and_wait` - Export an existing snapshot and wait for the task
//! - `backup_and_export_and_wait` - Both, as one two-stage workflow
//!
//! ## Example
//!
//! ```rust,ignore
//! use rdsbackup_core::rds::{BackupPlan, BackupPolicies, backup_and_export_and_wait};
//!
//! let report = backup_and_export_and_wait(
//!     &api,
//!     &plan,
//!     &BackupPolicies::default(),
//!     None,
//!     None,
//! ).await?;
//! println!("{}: {}", report.primary_id, report.outcome);
//! ```

pub mod api;
pub mod identifiers;
pub mod policies;
pub mod workflows;

// Re-export key types for convenience
pub use api::{ExportRequest, ExportTarget, ExportTasks, RdsApi, Snapshots};
pub use identifiers::{
    DEFAULT_SNAPSHOT_PREFIX, export_task_identifier, snapshot_arn, snapshot_id_from_arn,
    snapshot_identifier,
};
pub use policies::{BackupPolicies, export_policy, snapshot_policy};
pub use workflows::{
    BackupPlan, backup_and_export_and_wait, create_snapshot_and_wait, export_snapshot_and_wait,
};
