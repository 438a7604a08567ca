//! Configuration management for rdsbackup
//!
//! Configuration is stored in TOML format with support for multiple named
//! profiles, one per DB instance/export destination pair.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, Result};
use super::policy::PolicyOverrides;
use crate::rds::{BackupPolicies, DEFAULT_SNAPSHOT_PREFIX, ExportTarget};

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Profile used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Keys this version does not know about, written back unchanged
    #[serde(flatten)]
    pub extra: toml::Table,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// Individual profile configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    /// AWS region; the SDK default chain is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_instance_identifier: Option<String>,
    #[serde(default = "default_snapshot_prefix")]
    pub snapshot_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_prefix: Option<String>,
    /// Role RDS assumes to write the export
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_arn: Option<String>,
    /// Databases, schemas or tables to export (`db`, `db.schema`, `db.schema.table`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub export_only: Vec<String>,
    #[serde(flatten)]
    pub extra: toml::Table,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_policy: Option<PolicyOverrides>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_policy: Option<PolicyOverrides>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            region: None,
            db_instance_identifier: None,
            snapshot_prefix: default_snapshot_prefix(),
            s3_bucket: None,
            s3_prefix: None,
            iam_role_arn: None,
            kms_key_arn: None,
            export_only: Vec::new(),
            extra: toml::Table::new(),
            snapshot_policy: None,
            export_policy: None,
        }
    }
}

fn default_snapshot_prefix() -> String {
    DEFAULT_SNAPSHOT_PREFIX.to_string()
}

impl Profile {
    /// Copy of this profile with `${VAR}` references resolved
    ///
    /// Stored profiles keep their references; only the copy a command runs
    /// with is expanded.
    pub fn expand_env_vars(&self) -> Profile {
        let expand = |value: &Option<String>| value.as_deref().map(expand_env_value);
        Profile {
            region: expand(&self.region),
            db_instance_identifier: expand(&self.db_instance_identifier),
            snapshot_prefix: expand_env_value(&self.snapshot_prefix),
            s3_bucket: expand(&self.s3_bucket),
            s3_prefix: expand(&self.s3_prefix),
            iam_role_arn: expand(&self.iam_role_arn),
            kms_key_arn: expand(&self.kms_key_arn),
            export_only: self.export_only.iter().map(|s| expand_env_value(s)).collect(),
            extra: self.extra.clone(),
            snapshot_policy: self.snapshot_policy.clone(),
            export_policy: self.export_policy.clone(),
        }
    }

    /// Reject settings that parse but cannot be run with
    ///
    /// A zero poll interval would hammer the Describe APIs for the whole
    /// timeout.
    pub fn validate(&self, profile_name: &str) -> Result<()> {
        for (field, overrides) in [
            ("snapshot_policy.interval_secs", &self.snapshot_policy),
            ("export_policy.interval_secs", &self.export_policy),
        ] {
            if overrides.as_ref().and_then(|o| o.interval_secs) == Some(0) {
                return Err(ConfigError::InvalidField {
                    name: profile_name.to_string(),
                    field: field.to_string(),
                    reason: "must be at least 1 second".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Snapshot and export policies with this profile's overrides applied
    pub fn backup_policies(&self) -> BackupPolicies {
        let mut policies = BackupPolicies::default();
        if let Some(overrides) = &self.snapshot_policy {
            policies.snapshot = overrides.apply(policies.snapshot);
        }
        if let Some(overrides) = &self.export_policy {
            policies.export = overrides.apply(policies.export);
        }
        policies
    }

    /// The DB instance to snapshot, or an error naming the profile
    pub fn require_db_instance(&self, profile_name: &str) -> Result<&str> {
        self.db_instance_identifier
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| missing(profile_name, "db_instance_identifier"))
    }

    /// Check the settings an export needs without building the target
    pub fn require_export_destination(&self, profile_name: &str) -> Result<(&str, &str)> {
        let s3_bucket = self
            .s3_bucket
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| missing(profile_name, "s3_bucket"))?;
        let iam_role_arn = self
            .iam_role_arn
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| missing(profile_name, "iam_role_arn"))?;
        Ok((s3_bucket, iam_role_arn))
    }

    /// Build the export destination for this profile
    ///
    /// `region` and `account_id` come from the resolved AWS environment and
    /// are needed to build the snapshot ARN.
    pub fn export_target(
        &self,
        profile_name: &str,
        region: &str,
        account_id: &str,
    ) -> Result<ExportTarget> {
        let (s3_bucket, iam_role_arn) = self.require_export_destination(profile_name)?;

        Ok(ExportTarget {
            region: region.to_string(),
            account_id: account_id.to_string(),
            s3_bucket: s3_bucket.to_string(),
            s3_prefix: self.s3_prefix.clone(),
            iam_role_arn: iam_role_arn.to_string(),
            kms_key_id: self.kms_key_arn.clone(),
            export_only: self.export_only.clone(),
        })
    }
}

fn missing(profile_name: &str, field: &str) -> ConfigError {
    ConfigError::MissingField {
        name: profile_name.to_string(),
        field: field.to_string(),
    }
}

impl Config {
    /// Resolve the profile to use
    ///
    /// An explicit name must exist. Otherwise the configured default is used,
    /// then the first profile by name.
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<String> {
        if let Some(profile_name) = explicit_profile {
            return self.ensure_exists(profile_name);
        }

        if let Some(ref default) = self.default_profile {
            return self.ensure_exists(default);
        }

        if let Some((name, _)) = self.list_profiles().first() {
            return Ok((*name).clone());
        }

        Err(ConfigError::NoProfiles {
            suggestion: "Use 'rdsbackup profile set' to create a profile.".to_string(),
        })
    }

    fn ensure_exists(&self, name: &str) -> Result<String> {
        if self.profiles.contains_key(name) {
            Ok(name.to_string())
        } else {
            Err(ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
        }
    }

    /// Look up a profile by name
    pub fn get_profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// Values are returned as written, `${VAR}` references included, so the
    /// result can be saved back without baking in the environment. Use
    /// [`Profile::expand_env_vars`] on the profile a command runs with.
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    /// Get the path to the configuration file
    ///
    /// On Linux: ~/.config/rdsbackup/config.toml
    /// On macOS: ~/Library/Application Support/com.rdsbackup.rdsbackup/config.toml
    /// On Windows: %APPDATA%\rdsbackup\rdsbackup\config\config.toml
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "rdsbackup", "rdsbackup")
            .ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}

/// Expand environment variables in a configuration value
///
/// Supports `${VAR}` and `${VAR:-default}`. Unset variables without a
/// default are left as written.
///
/// ```toml
/// s3_bucket = "${BACKUP_BUCKET:-company-rds-backups}"
/// ```
fn expand_env_value(value: &str) -> String {
    shellexpand::env_with_context_no_errors(value, |var| std::env::var(var).ok()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn profile(db: &str) -> Profile {
        Profile {
            region: Some("eu-west-1".to_string()),
            db_instance_identifier: Some(db.to_string()),
            s3_bucket: Some("backups".to_string()),
            iam_role_arn: Some("arn:aws:iam::123456789012:role/export".to_string()),
            ..Profile::default()
        }
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.set_profile("orders".to_string(), profile("orders-db"));
        config.default_profile = Some("orders".to_string());

        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(deserialized.default_profile.as_deref(), Some("orders"));
        assert_eq!(deserialized.profiles["orders"], profile("orders-db"));
    }

    #[test]
    fn test_profile_defaults() {
        let toml = r#"
[profiles.minimal]
db_instance_identifier = "db-1"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let profile = &config.profiles["minimal"];

        assert_eq!(profile.snapshot_prefix, "manual-backup");
        assert!(profile.region.is_none());
        assert!(profile.export_only.is_empty());
        assert_eq!(profile.backup_policies(), BackupPolicies::default());
    }

    #[test]
    fn test_policy_overrides_from_toml() {
        let toml = r#"
[profiles.slow]
db_instance_identifier = "warehouse"

[profiles.slow.snapshot_policy]
timeout_secs = 7200

[profiles.slow.export_policy]
interval_secs = 120
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let policies = config.profiles["slow"].backup_policies();

        assert_eq!(policies.snapshot.timeout, Duration::from_secs(7200));
        assert_eq!(policies.snapshot.interval, Duration::from_secs(30));
        assert_eq!(policies.export.timeout, Duration::from_secs(180 * 60));
        assert_eq!(policies.export.interval, Duration::from_secs(120));
    }

    #[test]
    fn test_export_target_requires_bucket_and_role() {
        let mut p = profile("db");
        let target = p.export_target("p", "eu-west-1", "123456789012").unwrap();
        assert_eq!(target.s3_bucket, "backups");
        assert_eq!(target.region, "eu-west-1");

        p.s3_bucket = None;
        let err = p.export_target("p", "eu-west-1", "123456789012").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field, .. } if field == "s3_bucket"));

        p.s3_bucket = Some("backups".to_string());
        p.iam_role_arn = Some(String::new());
        let err = p.export_target("p", "eu-west-1", "123456789012").unwrap_err();
        assert!(
            matches!(err, ConfigError::MissingField { ref field, .. } if field == "iam_role_arn")
        );
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut p = profile("db");
        p.validate("p").unwrap();

        p.export_policy = Some(PolicyOverrides {
            timeout_secs: Some(600),
            interval_secs: Some(0),
        });
        let err = p.validate("p").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidField { ref field, .. } if field == "export_policy.interval_secs"
        ));

        p.export_policy = Some(PolicyOverrides {
            timeout_secs: Some(0),
            interval_secs: None,
        });
        p.validate("p").unwrap();
    }

    #[test]
    fn test_require_export_destination_before_aws() {
        let mut p = profile("db");
        assert_eq!(
            p.require_export_destination("p").unwrap(),
            ("backups", "arn:aws:iam::123456789012:role/export")
        );
        p.iam_role_arn = None;
        assert!(matches!(
            p.require_export_destination("p"),
            Err(ConfigError::MissingField { ref field, .. }) if field == "iam_role_arn"
        ));
    }

    #[test]
    #[serial_test::serial]
    fn test_expand_profile_leaves_stored_profile_untouched() {
        unsafe {
            std::env::set_var("TEST_EXPAND_BUCKET", "bucket-from-env");
            std::env::remove_var("TEST_EXPAND_ROLE");
        }
        let stored = Profile {
            s3_bucket: Some("${TEST_EXPAND_BUCKET}".to_string()),
            iam_role_arn: Some("${TEST_EXPAND_ROLE}".to_string()),
            export_only: vec!["${TEST_EXPAND_DB:-orders}.public".to_string()],
            ..profile("db")
        };

        let expanded = stored.expand_env_vars();
        assert_eq!(expanded.s3_bucket.as_deref(), Some("bucket-from-env"));
        assert_eq!(expanded.iam_role_arn.as_deref(), Some("${TEST_EXPAND_ROLE}"));
        assert_eq!(expanded.export_only, vec!["orders.public".to_string()]);
        assert_eq!(stored.s3_bucket.as_deref(), Some("${TEST_EXPAND_BUCKET}"));

        unsafe {
            std::env::remove_var("TEST_EXPAND_BUCKET");
        }
    }

    #[test]
    fn test_require_db_instance() {
        assert_eq!(profile("db-1").require_db_instance("p").unwrap(), "db-1");
        assert!(Profile::default().require_db_instance("p").is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_expansion() {
        unsafe {
            std::env::set_var("TEST_BACKUP_BUCKET", "bucket-from-env");
        }

        let content = r#"
[profiles.test]
s3_bucket = "${TEST_BACKUP_BUCKET}"
"#;

        let expanded = expand_env_value(content);
        assert!(expanded.contains("bucket-from-env"));

        unsafe {
            std::env::remove_var("TEST_BACKUP_BUCKET");
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_expansion_with_defaults() {
        unsafe {
            std::env::remove_var("NONEXISTENT_BACKUP_VAR");
        }

        let content = r#"region = "${NONEXISTENT_BACKUP_VAR:-us-east-1}""#;
        let expanded = expand_env_value(content);
        assert_eq!(expanded, r#"region = "us-east-1""#);

        let content = r#"region = "${NONEXISTENT_BACKUP_VAR}""#;
        let expanded = expand_env_value(content);
        assert_eq!(expanded, content);
    }

    #[test]
    fn test_profile_resolution() {
        let mut config = Config::default();
        config.set_profile("zeta".to_string(), profile("z"));
        config.set_profile("alpha".to_string(), profile("a"));

        // First by name
        assert_eq!(config.resolve_profile(None).unwrap(), "alpha");

        // Default wins over ordering
        config.default_profile = Some("zeta".to_string());
        assert_eq!(config.resolve_profile(None).unwrap(), "zeta");

        // Explicit wins over default
        assert_eq!(config.resolve_profile(Some("alpha")).unwrap(), "alpha");
    }

    #[test]
    fn test_profile_resolution_errors() {
        let config = Config::default();
        assert!(matches!(
            config.resolve_profile(None),
            Err(ConfigError::NoProfiles { .. })
        ));

        let mut config = Config::default();
        config.set_profile("alpha".to_string(), profile("a"));
        assert!(matches!(
            config.resolve_profile(Some("missing")),
            Err(ConfigError::ProfileNotFound { ref name }) if name == "missing"
        ));

        config.default_profile = Some("gone".to_string());
        assert!(matches!(
            config.resolve_profile(None),
            Err(ConfigError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_profile_clears_default() {
        let mut config = Config::default();
        config.set_profile("alpha".to_string(), profile("a"));
        config.default_profile = Some("alpha".to_string());

        assert!(config.remove_profile("alpha").is_some());
        assert!(config.default_profile.is_none());
        assert!(config.remove_profile("alpha").is_none());
    }
}
