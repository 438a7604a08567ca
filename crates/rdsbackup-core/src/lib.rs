//! # rdsbackup-core
//!
//! Shared engine for waiting on long-running cloud operations.
//!
//! Cloud APIs that start slow work (snapshots, exports, restores) answer
//! immediately and expose a status that must be polled. This crate provides:
//!
//! - **Poller** - [`poll_until_terminal`] checks a status on a fixed cadence
//!   until it is terminal, not found, timed out, or cancelled
//! - **Policies** - [`PollPolicy`] maps raw status strings onto pending,
//!   success and failure
//! - **Workflows** - [`run_two_stage`] waits on one operation, then starts
//!   and waits on one that depends on it
//! - **RDS** - the snapshot-then-export-to-S3 backup built on the above
//! - **Config** - named backup profiles stored as TOML
//!
//! ## Example
//!
//! ```rust,ignore
//! use rdsbackup_core::{Outcome, PollPolicy, poll_until_terminal};
//! use std::time::Duration;
//!
//! let policy = PollPolicy::builder()
//!     .timeout(Duration::from_secs(600))
//!     .interval(Duration::from_secs(10))
//!     .pending(["creating"])
//!     .success(["available"])
//!     .failure(["failed"])
//!     .build()?;
//!
//! match poll_until_terminal(&checker, "snap-1", &policy, None, None).await? {
//!     Outcome::Completed => println!("ready"),
//!     other => eprintln!("not ready: {other}"),
//! }
//! ```

pub mod config;
pub mod error;
pub mod operation;
pub mod outcome;
pub mod policy;
pub mod progress;
pub mod rds;
pub mod workflows;

// Re-export main types for convenience
pub use config::{Config, ConfigError, PolicyOverrides, Profile};
pub use error::{BoxError, CoreError, Result};
pub use operation::{DependentOperation, Observation, Operation, StartDisposition, StatusCheck};
pub use outcome::{NO_CAUSE_REPORTED, Outcome};
pub use policy::{PollPolicy, PollPolicyBuilder, StatusClass};
pub use progress::{ProgressCallback, ProgressEvent, poll_many, poll_until_terminal};
pub use workflows::{Stage, StageConfig, WorkflowReport, run_two_stage, start_dependent};
