//! Profile management command implementations

use colored::Colorize;
use rdsbackup_core::{Config, PolicyOverrides, Profile};
use serde_json::json;
use tracing::{debug, info};

use super::{CommandContext, apply_destination, apply_source};
use crate::cli::{OutputFormat, PolicyArgs, ProfileCommands};
use crate::error::{BackupCtlError, Result};
use crate::output::print_output;

/// Handle profile management commands
pub fn handle_profile_command(ctx: &mut CommandContext, cmd: &ProfileCommands) -> Result<()> {
    match cmd {
        ProfileCommands::List => handle_list(ctx),
        ProfileCommands::Path => handle_path(ctx),
        ProfileCommands::Show { name } => handle_show(ctx, name),
        ProfileCommands::Set {
            name,
            source,
            destination,
            policy,
            default,
        } => {
            let mut profile = ctx.config.profiles.get(name).cloned().unwrap_or_default();
            apply_source(&mut profile, source);
            apply_destination(&mut profile, destination);
            if let Some(region) = &ctx.region {
                profile.region = Some(region.clone());
            }
            merge_policy_args(&mut profile, policy);
            handle_set(ctx, name, profile, *default)
        }
        ProfileCommands::Remove { name } => handle_remove(ctx, name),
    }
}

fn handle_list(ctx: &CommandContext) -> Result<()> {
    let profiles = ctx.config.list_profiles();
    debug!("Found {} profiles", profiles.len());

    if profiles.is_empty() && !is_structured(ctx.output) {
        println!("No profiles configured.");
        println!("Use 'rdsbackup profile set' to create a profile.");
        return Ok(());
    }

    let rows: Vec<serde_json::Value> = profiles
        .iter()
        .map(|(name, profile)| {
            json!({
                "name": name,
                "default": ctx.config.default_profile.as_deref() == Some(name.as_str()),
                "region": profile.region,
                "db_instance_identifier": profile.db_instance_identifier,
                "s3_bucket": profile.s3_bucket,
            })
        })
        .collect();

    print_output(rows, ctx.output)
}

fn handle_path(ctx: &CommandContext) -> Result<()> {
    let path = match &ctx.config_path {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };

    if is_structured(ctx.output) {
        print_output(json!({ "config_path": path.display().to_string() }), ctx.output)
    } else {
        println!("{}", path.display());
        Ok(())
    }
}

fn handle_show(ctx: &CommandContext, name: &str) -> Result<()> {
    let profile = ctx.config.get_profile(name)?;
    let mut value = serde_json::to_value(profile)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("name".to_string(), json!(name));
        obj.insert(
            "default".to_string(),
            json!(ctx.config.default_profile.as_deref() == Some(name)),
        );
    }
    print_output(value, ctx.output)
}

fn handle_set(ctx: &mut CommandContext, name: &str, profile: Profile, default: bool) -> Result<()> {
    if name.is_empty() {
        return Err(BackupCtlError::InvalidInput {
            message: "profile name must not be empty".to_string(),
        });
    }

    profile.validate(name)?;

    let created = !ctx.config.profiles.contains_key(name);
    ctx.config.set_profile(name.to_string(), profile);
    if default || ctx.config.default_profile.is_none() {
        ctx.config.default_profile = Some(name.to_string());
    }
    let path = ctx.save_config()?;
    info!(profile = name, path = %path.display(), "Saved profile");

    if is_structured(ctx.output) {
        print_output(
            json!({
                "name": name,
                "created": created,
                "default": ctx.config.default_profile.as_deref() == Some(name),
                "config_path": path.display().to_string(),
            }),
            ctx.output,
        )
    } else {
        let verb = if created { "created" } else { "updated" };
        println!("{} Profile '{}' {}", "\u{2713}".green(), name, verb);
        Ok(())
    }
}

fn handle_remove(ctx: &mut CommandContext, name: &str) -> Result<()> {
    if ctx.config.remove_profile(name).is_none() {
        return Err(BackupCtlError::ProfileNotFound {
            name: name.to_string(),
        });
    }
    ctx.save_config()?;
    info!(profile = name, "Removed profile");

    if is_structured(ctx.output) {
        print_output(json!({ "name": name, "removed": true }), ctx.output)
    } else {
        println!("{} Profile '{}' removed", "\u{2713}".green(), name);
        Ok(())
    }
}

fn is_structured(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Json | OutputFormat::Yaml)
}

fn merge_policy_args(profile: &mut Profile, args: &PolicyArgs) {
    merge_overrides(
        &mut profile.snapshot_policy,
        args.snapshot_timeout,
        args.snapshot_interval,
    );
    merge_overrides(
        &mut profile.export_policy,
        args.export_timeout,
        args.export_interval,
    );
}

fn merge_overrides(
    slot: &mut Option<PolicyOverrides>,
    timeout_secs: Option<u64>,
    interval_secs: Option<u64>,
) {
    let mut overrides = slot.take().unwrap_or_default();
    if timeout_secs.is_some() {
        overrides.timeout_secs = timeout_secs;
    }
    if interval_secs.is_some() {
        overrides.interval_secs = interval_secs;
    }
    *slot = (!overrides.is_empty()).then_some(overrides);
}
