//! AWS SDK implementation of the RDS calls used by the backup workflow
//!
//! Error codes are read through `ProvideErrorMetadata` rather than by
//! matching on formatted messages.

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_rds::error::ProvideErrorMetadata;
use rdsbackup_core::rds::{ExportRequest, RdsApi, snapshot_id_from_arn};
use rdsbackup_core::{CoreError, Observation, StartDisposition};
use tracing::{debug, warn};

use crate::error::BackupCtlError;

/// Known RDS error codes for a missing snapshot
const SNAPSHOT_NOT_FOUND_CODES: &[&str] = &["DBSnapshotNotFound", "DBSnapshotNotFoundFault"];

/// Known RDS error codes for a missing export task
const EXPORT_NOT_FOUND_CODES: &[&str] = &["ExportTaskNotFound", "ExportTaskNotFoundFault"];

/// Known RDS error codes for an identifier that is already taken
const ALREADY_EXISTS_CODES: &[&str] = &[
    "DBSnapshotAlreadyExists",
    "DBSnapshotAlreadyExistsFault",
    "ExportTaskAlreadyExists",
    "ExportTaskAlreadyExistsFault",
];

fn code_in(code: Option<&str>, codes: &[&str]) -> bool {
    code.is_some_and(|c| codes.contains(&c))
}

/// Loaded AWS configuration shared by the RDS and STS clients
pub struct AwsContext {
    config: SdkConfig,
    region: String,
}

impl AwsContext {
    /// Load AWS configuration, pinning the region when one is given.
    ///
    /// Without an explicit region the SDK default chain decides; an empty
    /// chain is an error because snapshot ARNs need the region.
    pub async fn load(region: Option<&str>) -> std::result::Result<Self, BackupCtlError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let config = loader.load().await;

        let region = config
            .region()
            .map(|r| r.as_ref().to_string())
            .ok_or_else(|| BackupCtlError::AwsSetup {
                message: "no AWS region configured".to_string(),
            })?;
        debug!(region = %region, "Loaded AWS configuration");

        Ok(Self { config, region })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Account that owns the snapshots, from STS GetCallerIdentity
    pub async fn account_id(&self) -> std::result::Result<String, BackupCtlError> {
        let sts = aws_sdk_sts::Client::new(&self.config);
        let account = async {
            let identity = sts
                .get_caller_identity()
                .send()
                .await
                .context("Failed to get AWS caller identity - check credentials")?;

            let account = identity
                .account()
                .context("No account ID returned from STS GetCallerIdentity")?;
            Ok::<_, anyhow::Error>(account.to_string())
        }
        .await;

        account.map_err(|e| BackupCtlError::AwsSetup {
            message: format!("{:#}", e),
        })
    }

    pub fn rds(&self) -> AwsRds {
        AwsRds {
            client: aws_sdk_rds::Client::new(&self.config),
        }
    }
}

/// [`RdsApi`] backed by the AWS SDK
pub struct AwsRds {
    client: aws_sdk_rds::Client,
}

impl AwsRds {
    /// Snapshot an existing export task was started from, if it can be read
    async fn existing_export_source(&self, export_task_id: &str) -> Option<String> {
        let lookup = async {
            let output = self
                .client
                .describe_export_tasks()
                .export_task_identifier(export_task_id)
                .send()
                .await
                .context("DescribeExportTasks failed")?;
            Ok::<_, anyhow::Error>(
                output
                    .export_tasks()
                    .first()
                    .and_then(|task| task.source_arn())
                    .and_then(snapshot_id_from_arn)
                    .map(str::to_string),
            )
        };

        match lookup.await {
            Ok(source) => source,
            Err(e) => {
                warn!(export_task_id, error = %format!("{:#}", e), "Could not read existing export task");
                None
            }
        }
    }
}

#[async_trait]
impl RdsApi for AwsRds {
    async fn create_snapshot(
        &self,
        db_instance_id: &str,
        snapshot_id: &str,
    ) -> rdsbackup_core::Result<StartDisposition> {
        let result = self
            .client
            .create_db_snapshot()
            .db_instance_identifier(db_instance_id)
            .db_snapshot_identifier(snapshot_id)
            .send()
            .await;

        match result {
            Ok(_) => Ok(StartDisposition::Started),
            Err(e) if code_in(e.code(), ALREADY_EXISTS_CODES) => {
                Ok(StartDisposition::AlreadyExists { source_id: None })
            }
            Err(e) => Err(CoreError::start_failed(snapshot_id, e)),
        }
    }

    async fn describe_snapshot(&self, snapshot_id: &str) -> rdsbackup_core::Result<Observation> {
        let result = self
            .client
            .describe_db_snapshots()
            .db_snapshot_identifier(snapshot_id)
            .send()
            .await;

        match result {
            Ok(output) => Ok(match output.db_snapshots().first() {
                Some(snapshot) => Observation::found(snapshot.status().unwrap_or_default()),
                None => Observation::NotFound,
            }),
            Err(e) if code_in(e.code(), SNAPSHOT_NOT_FOUND_CODES) => Ok(Observation::NotFound),
            Err(e) => Err(CoreError::status_check(snapshot_id, e)),
        }
    }

    async fn start_export(
        &self,
        request: &ExportRequest,
    ) -> rdsbackup_core::Result<StartDisposition> {
        let export_only = (!request.export_only.is_empty()).then(|| request.export_only.clone());

        let result = self
            .client
            .start_export_task()
            .export_task_identifier(&request.export_task_id)
            .source_arn(&request.source_arn)
            .s3_bucket_name(&request.s3_bucket)
            .iam_role_arn(&request.iam_role_arn)
            .set_kms_key_id(request.kms_key_id.clone())
            .set_s3_prefix(request.s3_prefix.clone())
            .set_export_only(export_only)
            .send()
            .await;

        match result {
            Ok(_) => Ok(StartDisposition::Started),
            Err(e) if code_in(e.code(), ALREADY_EXISTS_CODES) => {
                let source_id = self.existing_export_source(&request.export_task_id).await;
                Ok(StartDisposition::AlreadyExists { source_id })
            }
            Err(e) => Err(CoreError::start_failed(&request.export_task_id, e)),
        }
    }

    async fn describe_export(&self, export_task_id: &str) -> rdsbackup_core::Result<Observation> {
        let result = self
            .client
            .describe_export_tasks()
            .export_task_identifier(export_task_id)
            .send()
            .await;

        match result {
            Ok(output) => Ok(match output.export_tasks().first() {
                Some(task) => Observation::Found {
                    status: task.status().unwrap_or_default().to_string(),
                    cause: task.failure_cause().map(str::to_string),
                },
                None => Observation::NotFound,
            }),
            Err(e) if code_in(e.code(), EXPORT_NOT_FOUND_CODES) => Ok(Observation::NotFound),
            Err(e) => Err(CoreError::status_check(export_task_id, e)),
        }
    }
}
