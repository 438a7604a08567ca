//! Command implementations

pub mod backup;
pub mod profile;
pub mod wait;

use std::path::PathBuf;
use std::time::Duration;

use rdsbackup_core::rds::BackupPolicies;
use rdsbackup_core::{Config, Outcome, Profile};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::{DestinationArgs, OutputFormat, PolicyArgs, SourceArgs};
use crate::error::Result;

/// Exit code for a session that ran to a terminal outcome
pub fn exit_code(outcome: &Outcome) -> i32 {
    match outcome {
        Outcome::Completed => 0,
        Outcome::Failed { .. } => 3,
        Outcome::TimedOut { .. } => 4,
        Outcome::NotFound => 5,
        Outcome::UnexpectedState { .. } => 6,
        Outcome::Cancelled { .. } => 130,
    }
}

/// Everything a command needs besides its own arguments
pub struct CommandContext {
    pub config: Config,
    /// Explicit `--config-file`, if any
    pub config_path: Option<PathBuf>,
    pub profile: Option<String>,
    pub region: Option<String>,
    pub output: OutputFormat,
    pub cancel: CancellationToken,
}

impl CommandContext {
    /// Resolve the active profile, with `${VAR}` references expanded
    ///
    /// With no profiles configured and none requested, commands run on flags
    /// alone against an empty profile. `self.config` itself stays unexpanded
    /// so profile edits can save it back as written.
    pub fn resolve_profile(&self) -> Result<(String, Profile)> {
        if self.profile.is_none() && self.config.profiles.is_empty() {
            debug!("No profiles configured, using command-line settings only");
            return Ok(("command-line".to_string(), Profile::default()));
        }

        let name = self.config.resolve_profile(self.profile.as_deref())?;
        let profile = self.config.get_profile(&name)?.expand_env_vars();
        profile.validate(&name)?;
        debug!(profile = %name, "Resolved profile");
        Ok((name, profile))
    }

    /// Region from `--region`, else the profile's
    pub fn region_for(&self, profile: &Profile) -> Option<String> {
        self.region.clone().or_else(|| profile.region.clone())
    }

    pub fn save_config(&self) -> Result<PathBuf> {
        let path = match &self.config_path {
            Some(path) => path.clone(),
            None => Config::config_path()?,
        };
        self.config.save_to_path(&path)?;
        Ok(path)
    }
}

/// Overlay source flags onto a profile
pub fn apply_source(profile: &mut Profile, args: &SourceArgs) {
    if let Some(db) = &args.db_instance {
        profile.db_instance_identifier = Some(db.clone());
    }
    if let Some(prefix) = &args.snapshot_prefix {
        profile.snapshot_prefix = prefix.clone();
    }
}

/// Overlay destination flags onto a profile
pub fn apply_destination(profile: &mut Profile, args: &DestinationArgs) {
    if let Some(bucket) = &args.bucket {
        profile.s3_bucket = Some(bucket.clone());
    }
    if let Some(prefix) = &args.s3_prefix {
        profile.s3_prefix = Some(prefix.clone());
    }
    if let Some(role) = &args.iam_role_arn {
        profile.iam_role_arn = Some(role.clone());
    }
    if let Some(key) = &args.kms_key_arn {
        profile.kms_key_arn = Some(key.clone());
    }
    if !args.export_only.is_empty() {
        profile.export_only = args.export_only.clone();
    }
}

/// Profile policies with command-line overrides applied on top
pub fn effective_policies(profile: &Profile, args: &PolicyArgs) -> BackupPolicies {
    let mut policies = profile.backup_policies();
    if let Some(secs) = args.snapshot_timeout {
        policies.snapshot.timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.snapshot_interval {
        policies.snapshot.interval = Duration::from_secs(secs);
    }
    if let Some(secs) = args.export_timeout {
        policies.export.timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.export_interval {
        policies.export.interval = Duration::from_secs(secs);
    }
    policies
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdsbackup_core::PolicyOverrides;

    fn context(config: Config, profile: Option<&str>) -> CommandContext {
        CommandContext {
            config,
            config_path: None,
            profile: profile.map(str::to_string),
            region: None,
            output: OutputFormat::Json,
            cancel: CancellationToken::new(),
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&Outcome::Completed), 0);
        assert_eq!(exit_code(&Outcome::failed(None)), 3);
        assert_eq!(
            exit_code(&Outcome::TimedOut {
                elapsed: Duration::ZERO
            }),
            4
        );
        assert_eq!(exit_code(&Outcome::NotFound), 5);
        assert_eq!(
            exit_code(&Outcome::UnexpectedState {
                status: "x".to_string()
            }),
            6
        );
        assert_eq!(
            exit_code(&Outcome::Cancelled {
                elapsed: Duration::ZERO
            }),
            130
        );
    }

    #[test]
    fn test_flags_only_without_profiles() {
        let ctx = context(Config::default(), None);
        let (name, profile) = ctx.resolve_profile().unwrap();
        assert_eq!(name, "command-line");
        assert_eq!(profile, Profile::default());
    }

    #[test]
    fn test_resolved_profile_is_expanded_but_config_is_not() {
        let mut config = Config::default();
        config.set_profile(
            "orders".to_string(),
            Profile {
                s3_bucket: Some("${RDSBACKUP_CTX_UNSET_BUCKET:-fallback}".to_string()),
                ..Profile::default()
            },
        );
        let ctx = context(config, None);

        let (_, profile) = ctx.resolve_profile().unwrap();
        assert_eq!(profile.s3_bucket.as_deref(), Some("fallback"));
        assert_eq!(
            ctx.config.profiles["orders"].s3_bucket.as_deref(),
            Some("${RDSBACKUP_CTX_UNSET_BUCKET:-fallback}")
        );
    }

    #[test]
    fn test_zero_interval_profile_is_rejected() {
        let mut config = Config::default();
        config.set_profile(
            "orders".to_string(),
            Profile {
                snapshot_policy: Some(PolicyOverrides {
                    timeout_secs: None,
                    interval_secs: Some(0),
                }),
                ..Profile::default()
            },
        );
        let ctx = context(config, Some("orders"));
        assert!(matches!(
            ctx.resolve_profile(),
            Err(crate::error::BackupCtlError::Config(_))
        ));
    }

    #[test]
    fn test_explicit_missing_profile_is_an_error() {
        let ctx = context(Config::default(), Some("orders"));
        assert!(ctx.resolve_profile().is_err());
    }

    #[test]
    fn test_flags_override_profile() {
        let mut profile = Profile {
            s3_bucket: Some("from-profile".to_string()),
            export_policy: Some(PolicyOverrides {
                timeout_secs: Some(100),
                interval_secs: Some(10),
            }),
            ..Profile::default()
        };
        apply_destination(
            &mut profile,
            &DestinationArgs {
                bucket: Some("from-flag".to_string()),
                ..DestinationArgs::default()
            },
        );
        assert_eq!(profile.s3_bucket.as_deref(), Some("from-flag"));

        let policies = effective_policies(
            &profile,
            &PolicyArgs {
                export_interval: Some(5),
                ..PolicyArgs::default()
            },
        );
        assert_eq!(policies.export.timeout, Duration::from_secs(100));
        assert_eq!(policies.export.interval, Duration::from_secs(5));
    }
}
