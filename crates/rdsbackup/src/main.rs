use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use rdsbackup_core::Config;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod aws;
mod cli;
mod commands;
mod error;
mod output;
mod progress;

/// How long a cancelled command gets to report before the process gives up on it
const INTERRUPT_GRACE: Duration = Duration::from_secs(5);

use cli::{Cli, Commands};
use commands::CommandContext;
use error::BackupCtlError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Load configuration from specified path or default location
    let (config, config_path) = if let Some(config_file) = &cli.config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        (Config::load_from_path(&path)?, Some(path))
    } else {
        debug!("Loading config from default location");
        (Config::load()?, None)
    };

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let mut ctx = CommandContext {
        config,
        config_path,
        profile: cli.profile.clone(),
        region: cli.region.clone(),
        output: cli.output,
        cancel: cancel.clone(),
    };

    match run_cancellable(execute_command(&cli, &mut ctx), cancel, INTERRUPT_GRACE).await {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            e.print_diagnostic();
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "rdsbackup=warn,rdsbackup_core=warn",
            1 => "rdsbackup=info,rdsbackup_core=info",
            2 => "rdsbackup=debug,rdsbackup_core=debug",
            _ => "rdsbackup=trace,rdsbackup_core=trace,aws_config=debug",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

/// Cancel the running command on Ctrl-C; a second Ctrl-C exits at once
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, cancelling (Ctrl-C again to exit immediately)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

/// Drive `command` to completion, or exit with 130 if it is still running
/// `grace` after cancellation
///
/// Poll sessions notice the token and report `Cancelled` themselves. AWS
/// setup calls and the start requests do not, so they are abandoned here.
async fn run_cancellable<F>(
    command: F,
    cancel: CancellationToken,
    grace: Duration,
) -> Result<i32, BackupCtlError>
where
    F: Future<Output = Result<i32, BackupCtlError>>,
{
    tokio::select! {
        result = command => result,
        _ = async {
            cancel.cancelled().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!("Command did not stop within {:?} of the interrupt", grace);
            Ok(130)
        }
    }
}

/// Run the selected command and return the process exit code
async fn execute_command(cli: &Cli, ctx: &mut CommandContext) -> Result<i32, BackupCtlError> {
    trace!("Executing command: {:?}", cli.command);

    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::Version => {
            if matches!(cli.output, cli::OutputFormat::Json | cli::OutputFormat::Yaml) {
                output::print_output(
                    serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION"),
                        "name": env!("CARGO_PKG_NAME"),
                    }),
                    cli.output,
                )?;
            } else {
                println!("rdsbackup {}", env!("CARGO_PKG_VERSION"));
            }
            Ok(0)
        }
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "rdsbackup", &mut std::io::stdout());
            Ok(0)
        }
        Commands::Profile(cmd) => commands::profile::handle_profile_command(ctx, cmd).map(|_| 0),
        Commands::Run(args) => commands::backup::handle_run(ctx, args).await,
        Commands::Snapshot(args) => commands::backup::handle_snapshot(ctx, args).await,
        Commands::Export(args) => commands::backup::handle_export(ctx, args).await,
        Commands::Wait(cmd) => commands::wait::handle_wait_command(ctx, cmd).await,
    };

    info!(
        "Command finished in {:?} ({})",
        start.elapsed(),
        match &result {
            Ok(code) => format!("exit {}", code),
            Err(_) => "error".to_string(),
        }
    );
    result
}
