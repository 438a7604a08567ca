//! Configuration and profile management for rdsbackup
//!
//! This module provides named backup profiles: which instance to snapshot,
//! where to export it, and how patiently to wait.
//!
//! # Features
//!
//! - Multiple named profiles with a default
//! - Environment variable expansion in config files
//! - Platform-specific config file locations
//! - Per-profile poll cadence overrides

// Nested config module is intentional for the config subsystem
#![allow(clippy::module_inception)]

pub mod config;
pub mod error;
pub mod policy;

// Re-export main types for convenience
pub use config::{Config, Profile};
pub use error::{ConfigError, Result};
pub use policy::PolicyOverrides;
