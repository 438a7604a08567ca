//! Wait on operations started elsewhere

use rdsbackup_core::rds::{ExportTasks, Snapshots};
use rdsbackup_core::{Outcome, poll_until_terminal};
use serde::Serialize;

use super::{CommandContext, effective_policies, exit_code};
use crate::aws::AwsContext;
use crate::cli::WaitCommands;
use crate::error::Result;
use crate::output::print_output;
use crate::progress::spinner;

#[derive(Debug, Serialize)]
struct WaitReport<'a> {
    kind: &'static str,
    operation_id: &'a str,
    #[serde(flatten)]
    outcome: Outcome,
}

pub async fn handle_wait_command(ctx: &CommandContext, cmd: &WaitCommands) -> Result<i32> {
    let (_, profile) = ctx.resolve_profile()?;
    let aws = AwsContext::load(ctx.region_for(&profile).as_deref()).await?;
    let rds = aws.rds();

    let (kind, id, outcome) = match cmd {
        WaitCommands::Snapshot { id, policy } => {
            let policies = effective_policies(&profile, policy);
            let (pb, on_progress) = spinner(&format!("Waiting for snapshot {}", id));
            let outcome = poll_until_terminal(
                &Snapshots::new(&rds),
                id,
                &policies.snapshot,
                Some(&on_progress),
                Some(&ctx.cancel),
            )
            .await;
            pb.finish_and_clear();
            ("snapshot", id, outcome?)
        }
        WaitCommands::Export { id, policy } => {
            let policies = effective_policies(&profile, policy);
            let (pb, on_progress) = spinner(&format!("Waiting for export task {}", id));
            let outcome = poll_until_terminal(
                &ExportTasks::status_only(&rds),
                id,
                &policies.export,
                Some(&on_progress),
                Some(&ctx.cancel),
            )
            .await;
            pb.finish_and_clear();
            ("export", id, outcome?)
        }
    };

    let code = exit_code(&outcome);
    print_output(
        WaitReport {
            kind,
            operation_id: id,
            outcome,
        },
        ctx.output,
    )?;
    Ok(code)
}
