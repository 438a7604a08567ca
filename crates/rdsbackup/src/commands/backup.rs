//! Snapshot and export commands

use chrono::Utc;
use rdsbackup_core::Outcome;
use rdsbackup_core::rds::{
    BackupPlan, backup_and_export_and_wait, create_snapshot_and_wait, export_snapshot_and_wait,
    snapshot_identifier,
};
use serde::Serialize;
use tracing::info;

use super::{CommandContext, apply_destination, apply_source, effective_policies, exit_code};
use crate::aws::AwsContext;
use crate::cli::{ExportArgs, RunArgs, SnapshotArgs};
use crate::error::Result;
use crate::output::print_output;
use crate::progress::spinner;

#[derive(Debug, Serialize)]
struct SnapshotReport {
    db_instance_id: String,
    snapshot_id: String,
    #[serde(flatten)]
    outcome: Outcome,
}

/// Snapshot, export, and wait for both
pub async fn handle_run(ctx: &CommandContext, args: &RunArgs) -> Result<i32> {
    let (name, mut profile) = ctx.resolve_profile()?;
    apply_source(&mut profile, &args.source);
    apply_destination(&mut profile, &args.destination);
    let policies = effective_policies(&profile, &args.policy);
    let db_instance_id = profile.require_db_instance(&name)?.to_string();
    profile.require_export_destination(&name)?;

    let aws = AwsContext::load(ctx.region_for(&profile).as_deref()).await?;
    let account_id = aws.account_id().await?;
    let target = profile.export_target(&name, aws.region(), &account_id)?;
    let plan = BackupPlan {
        db_instance_id,
        snapshot_prefix: profile.snapshot_prefix.clone(),
        target,
    };
    info!(profile = %name, db_instance_id = %plan.db_instance_id, "Starting backup");

    let rds = aws.rds();
    let (pb, on_progress) = spinner(&format!("Backing up {}", plan.db_instance_id));
    let report =
        backup_and_export_and_wait(&rds, &plan, &policies, Some(&on_progress), Some(&ctx.cancel))
            .await;
    pb.finish_and_clear();
    let report = report?;

    print_output(&report, ctx.output)?;
    Ok(exit_code(&report.outcome))
}

/// Create a snapshot and wait until it is available
pub async fn handle_snapshot(ctx: &CommandContext, args: &SnapshotArgs) -> Result<i32> {
    let (name, mut profile) = ctx.resolve_profile()?;
    apply_source(&mut profile, &args.source);
    let policies = effective_policies(&profile, &args.policy);
    let db_instance_id = profile.require_db_instance(&name)?.to_string();
    let snapshot_id = args
        .snapshot_id
        .clone()
        .unwrap_or_else(|| snapshot_identifier(&profile.snapshot_prefix, Utc::now()));

    let aws = AwsContext::load(ctx.region_for(&profile).as_deref()).await?;
    let rds = aws.rds();
    let (pb, on_progress) = spinner(&format!("Creating snapshot {}", snapshot_id));
    let outcome = create_snapshot_and_wait(
        &rds,
        &db_instance_id,
        &snapshot_id,
        &policies.snapshot,
        Some(&on_progress),
        Some(&ctx.cancel),
    )
    .await;
    pb.finish_and_clear();
    let outcome = outcome?;

    let code = exit_code(&outcome);
    print_output(
        SnapshotReport {
            db_instance_id,
            snapshot_id,
            outcome,
        },
        ctx.output,
    )?;
    Ok(code)
}

/// Export an existing snapshot and wait for the export task
pub async fn handle_export(ctx: &CommandContext, args: &ExportArgs) -> Result<i32> {
    let (name, mut profile) = ctx.resolve_profile()?;
    apply_destination(&mut profile, &args.destination);
    let policies = effective_policies(&profile, &args.policy);
    profile.require_export_destination(&name)?;

    let aws = AwsContext::load(ctx.region_for(&profile).as_deref()).await?;
    let account_id = aws.account_id().await?;
    let target = profile.export_target(&name, aws.region(), &account_id)?;

    let rds = aws.rds();
    let (pb, on_progress) = spinner(&format!("Exporting {}", args.snapshot_id));
    let report = export_snapshot_and_wait(
        &rds,
        &args.snapshot_id,
        &target,
        &policies,
        Some(&on_progress),
        Some(&ctx.cancel),
    )
    .await;
    pb.finish_and_clear();
    let report = report?;

    print_output(&report, ctx.output)?;
    Ok(exit_code(&report.outcome))
}
