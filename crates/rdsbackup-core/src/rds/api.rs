//! The RDS operations the backup workflow needs, and adapters onto the poller

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::operation::{DependentOperation, Observation, StartDisposition, StatusCheck};
use crate::rds::identifiers::snapshot_arn;

/// Parameters of a StartExportTask call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub export_task_id: String,
    pub source_arn: String,
    pub s3_bucket: String,
    pub s3_prefix: Option<String>,
    pub iam_role_arn: String,
    pub kms_key_id: Option<String>,
    /// Databases, schemas or tables to export; empty exports everything
    pub export_only: Vec<String>,
}

/// Where and how snapshots get exported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTarget {
    pub region: String,
    pub account_id: String,
    pub s3_bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_prefix: Option<String>,
    pub iam_role_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub export_only: Vec<String>,
}

impl ExportTarget {
    /// Build the export request for `snapshot_id`
    pub fn request(&self, snapshot_id: &str, export_task_id: &str) -> ExportRequest {
        ExportRequest {
            export_task_id: export_task_id.to_string(),
            source_arn: snapshot_arn(&self.region, &self.account_id, snapshot_id),
            s3_bucket: self.s3_bucket.clone(),
            s3_prefix: self.s3_prefix.clone(),
            iam_role_arn: self.iam_role_arn.clone(),
            kms_key_id: self.kms_key_id.clone(),
            export_only: self.export_only.clone(),
        }
    }
}

/// RDS calls used by the backup workflow
///
/// Implementations map "not found" faults to [`Observation::NotFound`] and
/// "already exists" faults to [`StartDisposition::AlreadyExists`]; any other
/// failure is a [`CoreError`](crate::CoreError).
#[async_trait]
pub trait RdsApi: Send + Sync {
    /// CreateDBSnapshot
    async fn create_snapshot(
        &self,
        db_instance_id: &str,
        snapshot_id: &str,
    ) -> Result<StartDisposition>;

    /// DescribeDBSnapshots for a single snapshot
    async fn describe_snapshot(&self, snapshot_id: &str) -> Result<Observation>;

    /// StartExportTask. On "already exists", report the existing task's
    /// source snapshot identifier when it can be determined.
    async fn start_export(&self, request: &ExportRequest) -> Result<StartDisposition>;

    /// DescribeExportTasks for a single task; the cause is `FailureCause`
    async fn describe_export(&self, export_task_id: &str) -> Result<Observation>;
}

/// Snapshots as a pollable operation
pub struct Snapshots<'a, A: ?Sized> {
    api: &'a A,
}

impl<'a, A: RdsApi + ?Sized> Snapshots<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<'a, A: RdsApi + ?Sized> StatusCheck for Snapshots<'a, A> {
    async fn check(&self, operation_id: &str) -> Result<Observation> {
        self.api.describe_snapshot(operation_id).await
    }
}

/// Export tasks as an operation started from a snapshot
///
/// Built with [`ExportTasks::status_only`] it can only be polled, which is
/// enough to wait on a task started elsewhere.
pub struct ExportTasks<'a, A: ?Sized> {
    api: &'a A,
    target: Option<&'a ExportTarget>,
}

impl<'a, A: RdsApi + ?Sized> ExportTasks<'a, A> {
    pub fn new(api: &'a A, target: &'a ExportTarget) -> Self {
        Self {
            api,
            target: Some(target),
        }
    }

    pub fn status_only(api: &'a A) -> Self {
        Self { api, target: None }
    }
}

#[async_trait]
impl<'a, A: RdsApi + ?Sized> StatusCheck for ExportTasks<'a, A> {
    async fn check(&self, operation_id: &str) -> Result<Observation> {
        self.api.describe_export(operation_id).await
    }
}

#[async_trait]
impl<'a, A: RdsApi + ?Sized> DependentOperation for ExportTasks<'a, A> {
    async fn start(&self, source_id: &str, operation_id: &str) -> Result<StartDisposition> {
        let target = self.target.ok_or_else(|| {
            CoreError::Validation(format!(
                "no export destination configured for '{}'",
                operation_id
            ))
        })?;
        let request = target.request(source_id, operation_id);
        self.api.start_export(&request).await
    }
}
