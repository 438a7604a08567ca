//! CLI structure and command definitions

use clap::{Args, Parser, Subcommand};

/// Snapshot RDS instances and export the snapshots to S3
#[derive(Parser, Debug)]
#[command(name = "rdsbackup")]
#[command(version, about = "Snapshot RDS instances and export the snapshots to S3")]
#[command(long_about = "
Snapshot RDS instances and export the snapshots to S3, waiting for each step.

Settings come from a named profile and can be overridden with flags:
    rdsbackup run                              # uses your default profile
    rdsbackup run -p orders --bucket other     # override one setting

EXAMPLES:
    # Save a profile
    rdsbackup profile set orders --db-instance orders-db \\
        --bucket company-rds-backups --iam-role-arn arn:aws:iam::123456789012:role/rds-export

    # Full backup: snapshot, wait, export, wait
    rdsbackup run -p orders

    # Export a snapshot that already exists
    rdsbackup export manual-backup-20240101-020000 -p orders

    # Attach to an export started elsewhere
    rdsbackup wait export export-manual-backup-20240101-020000

EXIT CODES:
    0 completed, 1 error, 3 failed, 4 timed out, 5 not found,
    6 unexpected state, 130 cancelled
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "RDSBACKUP_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "RDSBACKUP_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// AWS region (overrides the profile and the SDK default chain)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Automatically choose format based on command and context
    Auto,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Human-readable table format
    Table,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Snapshot an instance, export the snapshot to S3, and wait for both
    #[command(visible_alias = "backup")]
    Run(RunArgs),

    /// Create a manual snapshot and wait until it is available
    Snapshot(SnapshotArgs),

    /// Export an existing snapshot to S3 and wait for the export task
    Export(ExportArgs),

    /// Wait for a snapshot or export task that is already running
    #[command(subcommand)]
    Wait(WaitCommands),

    /// Profile management
    #[command(subcommand, visible_alias = "prof")]
    Profile(ProfileCommands),

    /// Version information
    #[command(visible_alias = "ver")]
    Version,

    /// Generate shell completions
    #[command(visible_alias = "comp")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Which DB instance to snapshot
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// DB instance identifier
    #[arg(long = "db-instance")]
    pub db_instance: Option<String>,

    /// Prefix for the generated snapshot identifier
    #[arg(long)]
    pub snapshot_prefix: Option<String>,
}

/// Where exports are written
#[derive(Args, Debug, Clone, Default)]
pub struct DestinationArgs {
    /// S3 bucket receiving the export
    #[arg(long)]
    pub bucket: Option<String>,

    /// Key prefix inside the bucket
    #[arg(long)]
    pub s3_prefix: Option<String>,

    /// IAM role RDS assumes to write to the bucket
    #[arg(long)]
    pub iam_role_arn: Option<String>,

    /// KMS key used to encrypt the export
    #[arg(long)]
    pub kms_key_arn: Option<String>,

    /// Limit the export to these databases, schemas or tables (repeatable)
    #[arg(long = "export-only", value_name = "NAME")]
    pub export_only: Vec<String>,
}

/// Poll cadence overrides, in seconds
#[derive(Args, Debug, Clone, Default)]
pub struct PolicyArgs {
    /// Maximum time to wait for the snapshot
    #[arg(long, value_name = "SECS")]
    pub snapshot_timeout: Option<u64>,

    /// Delay between snapshot status checks
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub snapshot_interval: Option<u64>,

    /// Maximum time to wait for the export task
    #[arg(long, value_name = "SECS")]
    pub export_timeout: Option<u64>,

    /// Delay between export status checks
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub export_interval: Option<u64>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub destination: DestinationArgs,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Use this snapshot identifier instead of generating one
    #[arg(long, conflicts_with = "snapshot_prefix")]
    pub snapshot_id: Option<String>,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Snapshot to export
    pub snapshot_id: String,

    #[command(flatten)]
    pub destination: DestinationArgs,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

/// Wait commands
#[derive(Subcommand, Debug)]
pub enum WaitCommands {
    /// Wait for a DB snapshot to become available
    Snapshot {
        /// Snapshot identifier
        id: String,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Wait for an export task to finish
    Export {
        /// Export task identifier
        id: String,

        #[command(flatten)]
        policy: PolicyArgs,
    },
}

/// Profile management commands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all configured profiles
    #[command(visible_alias = "ls")]
    List,

    /// Show the path to the configuration file
    Path,

    /// Show details of a specific profile
    #[command(visible_alias = "get")]
    Show {
        /// Profile name to show
        name: String,
    },

    /// Set or create a profile
    ///
    /// Flags that are not given keep the profile's current value.
    #[command(visible_alias = "add")]
    #[command(after_help = "EXAMPLES:
    rdsbackup profile set orders --region eu-west-1 --db-instance orders-db \\
        --bucket company-rds-backups --s3-prefix orders/ \\
        --iam-role-arn arn:aws:iam::123456789012:role/rds-export \\
        --kms-key-arn arn:aws:kms:eu-west-1:123456789012:key/abcd --default

    # Values may reference environment variables, expanded on load
    rdsbackup profile set ci --bucket '${BACKUP_BUCKET}'
")]
    Set {
        /// Profile name
        name: String,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        destination: DestinationArgs,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },

    /// Remove a profile
    #[command(visible_alias = "rm")]
    Remove {
        /// Profile name to remove
        name: String,
    },
}
