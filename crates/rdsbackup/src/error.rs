//! Error types for rdsbackup
//!
//! Defines structured error types using thiserror for better error handling and user experience.

use colored::Colorize;
use rdsbackup_core::{ConfigError, CoreError};
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: Profile 'orders' is missing 's3_bucket'
///
///   tip: Add it to the profile: rdsbackup profile set orders --bucket <bucket>
/// ```
pub struct CliDiagnostic {
    message: String,
    detail: Option<String>,
    tips: Vec<String>,
}

impl CliDiagnostic {
    /// Start a new error diagnostic with the given message.
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            detail: None,
            tips: Vec::new(),
        }
    }

    /// Add a detail line below the error message.
    pub fn detail(mut self, text: &str) -> Self {
        self.detail = Some(text.to_string());
        self
    }

    pub fn tip(mut self, description: &str) -> Self {
        self.tips.push(description.to_string());
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        if let Some(detail) = &self.detail {
            eprintln!("  {}", detail);
        }

        for description in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", description);
        }
    }
}

/// Main error type for the rdsbackup application
#[derive(Error, Debug)]
pub enum BackupCtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("No profile configured. Use 'rdsbackup profile set' to configure a profile.")]
    NoProfileConfigured,

    #[error("Profile '{profile}' is missing '{field}'")]
    MissingSetting { profile: String, field: String },

    #[error("AWS credentials or region unavailable: {message}")]
    AwsSetup { message: String },

    #[error("AWS error: {message}")]
    Aws { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for rdsbackup operations
pub type Result<T> = std::result::Result<T, BackupCtlError>;

impl BackupCtlError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            BackupCtlError::ProfileNotFound { name } => vec![
                "List available profiles: rdsbackup profile list".to_string(),
                format!("Create profile '{}': rdsbackup profile set {}", name, name),
            ],
            BackupCtlError::NoProfileConfigured => vec![
                "Create a profile: rdsbackup profile set <name> --db-instance <id> --bucket <bucket> --iam-role-arn <arn>".to_string(),
                "Or pass every setting as a flag: rdsbackup run --help".to_string(),
            ],
            BackupCtlError::MissingSetting { profile, field } => vec![
                format!(
                    "Add it to the profile: rdsbackup profile set {} --{}",
                    profile,
                    flag_for_field(field)
                ),
                format!("Or pass --{} on the command line", flag_for_field(field)),
            ],
            BackupCtlError::AwsSetup { .. } => vec![
                "Check credentials: aws sts get-caller-identity".to_string(),
                "Set a region with --region, AWS_REGION, or the profile's region".to_string(),
            ],
            BackupCtlError::Aws { message } if message.contains("AccessDenied") => vec![
                "Verify the caller may use rds:CreateDBSnapshot and rds:StartExportTask".to_string(),
                "Verify the export role can write to the bucket and use the KMS key".to_string(),
            ],
            BackupCtlError::Conflict { .. } => vec![
                "Inspect the existing task: aws rds describe-export-tasks --export-task-identifier <id>".to_string(),
                "Use a different snapshot prefix so identifiers do not collide".to_string(),
            ],
            BackupCtlError::InvalidInput { .. } => vec![
                "Check the command syntax: rdsbackup <command> --help".to_string(),
            ],
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&format!("{}", self));

        if let BackupCtlError::Conflict { .. } = self {
            diag = diag.detail("Refusing to wait on an export task started from a different snapshot.");
        }

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion);
        }

        diag.print();
    }
}

fn flag_for_field(field: &str) -> &str {
    match field {
        "db_instance_identifier" => "db-instance",
        "s3_bucket" => "bucket",
        "iam_role_arn" => "iam-role-arn",
        other => other,
    }
}

impl From<ConfigError> for BackupCtlError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => BackupCtlError::ProfileNotFound { name },
            ConfigError::NoProfiles { .. } => BackupCtlError::NoProfileConfigured,
            ConfigError::MissingField { name, field } => BackupCtlError::MissingSetting {
                profile: name,
                field,
            },
            other => BackupCtlError::Config(other.to_string()),
        }
    }
}

impl From<CoreError> for BackupCtlError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Conflict { .. } => BackupCtlError::Conflict {
                message: err.to_string(),
            },
            CoreError::Validation(message) => BackupCtlError::InvalidInput { message },
            CoreError::StatusCheck { .. } | CoreError::StartFailed { .. } => {
                BackupCtlError::Aws {
                    message: error_chain(&err),
                }
            }
        }
    }
}

impl From<serde_json::Error> for BackupCtlError {
    fn from(err: serde_json::Error) -> Self {
        BackupCtlError::OutputError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for BackupCtlError {
    fn from(err: serde_yaml::Error) -> Self {
        BackupCtlError::OutputError {
            message: err.to_string(),
        }
    }
}

/// Render an error and its sources on one line
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
