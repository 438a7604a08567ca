//! Progress tracking and polling for long-running operations
//!
//! Operations such as snapshot creation or snapshot export are accepted
//! immediately and then tracked by the backing system until they settle.
//! This module drives such an operation through a [`StatusCheck`] until it
//! reaches a terminal state, with optional progress callbacks for UI updates.

use std::collections::HashSet;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::operation::{Observation, Operation, StatusCheck};
use crate::outcome::Outcome;
use crate::policy::{PollPolicy, StatusClass};

/// Progress events emitted during a poll session
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Polling has started
    Started { operation_id: String },
    /// A status check returned
    Polling {
        operation: Operation,
        attempt: u32,
        elapsed: Duration,
    },
    /// Operation completed successfully
    Completed { operation_id: String },
    /// Session ended with any outcome other than `Completed`
    Failed {
        operation_id: String,
        outcome: Outcome,
    },
}

/// Callback type for progress updates
///
/// The CLI uses this to drive its spinner.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Poll an operation until it reaches a terminal state
///
/// The timeout is checked before every status check, so a zero timeout
/// returns [`Outcome::TimedOut`] without calling `check` at all. Pending
/// statuses are retried after a fixed `policy.interval`. Errors from `check`
/// end the session and are returned as-is.
///
/// # Arguments
///
/// * `check` - Status-check capability for the backing system
/// * `operation_id` - Identifier of the operation to poll
/// * `policy` - Timeout, interval and status classification
/// * `on_progress` - Optional callback for progress updates
/// * `cancel` - Optional token; cancellation also interrupts the interval sleep
///
/// # Example
///
/// ```rust,ignore
/// use rdsbackup_core::{poll_until_terminal, Outcome, ProgressEvent};
///
/// let callback: ProgressCallback = Box::new(|event| {
///     if let ProgressEvent::Polling { operation, elapsed, .. } = event {
///         println!("{:?} ({:.0}s)", operation.status, elapsed.as_secs());
///     }
/// });
///
/// match poll_until_terminal(&api, "snap-1", &policy, Some(&callback), None).await? {
///     Outcome::Completed => println!("ready"),
///     other => eprintln!("gave up: {}", other),
/// }
/// ```
pub async fn poll_until_terminal<C>(
    check: &C,
    operation_id: &str,
    policy: &PollPolicy,
    on_progress: Option<&ProgressCallback>,
    cancel: Option<&CancellationToken>,
) -> Result<Outcome>
where
    C: StatusCheck + ?Sized,
{
    if operation_id.is_empty() {
        return Err(CoreError::Validation(
            "operation id must not be empty".to_string(),
        ));
    }
    policy.validate()?;

    let start = Instant::now();
    let mut operation = Operation::new(operation_id);
    let mut attempt = 0u32;

    emit(
        on_progress,
        ProgressEvent::Started {
            operation_id: operation_id.to_string(),
        },
    );

    let outcome = loop {
        let elapsed = start.elapsed();
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            break Outcome::Cancelled { elapsed };
        }
        if elapsed >= policy.timeout {
            break Outcome::TimedOut { elapsed };
        }

        attempt += 1;
        let observation = check.check(operation_id).await.inspect_err(|e| {
            warn!(operation_id, attempt, error = %e, "Status check failed");
        })?;

        let (status, cause) = match observation {
            Observation::NotFound => break Outcome::NotFound,
            Observation::Found { status, cause } => (status, cause),
        };

        let class = policy.classify(&status);
        debug!(
            operation_id,
            attempt,
            status = %status,
            elapsed_secs = elapsed.as_secs(),
            "Polled operation status"
        );

        operation.status = Some(status.clone());
        if class == Some(StatusClass::Failure) {
            operation.failure_cause = cause.clone();
        }
        emit(
            on_progress,
            ProgressEvent::Polling {
                operation: operation.clone(),
                attempt,
                elapsed,
            },
        );

        match class {
            Some(StatusClass::Success) => break Outcome::Completed,
            Some(StatusClass::Failure) => break Outcome::failed(cause),
            Some(StatusClass::Pending) => sleep_or_cancel(policy.interval, cancel).await,
            None => break Outcome::UnexpectedState { status },
        }
    };

    match &outcome {
        Outcome::Completed => {
            info!(operation_id, attempts = attempt, "Operation completed");
            emit(
                on_progress,
                ProgressEvent::Completed {
                    operation_id: operation_id.to_string(),
                },
            );
        }
        other => {
            warn!(operation_id, attempts = attempt, outcome = %other, "Operation did not complete");
            emit(
                on_progress,
                ProgressEvent::Failed {
                    operation_id: operation_id.to_string(),
                    outcome: other.clone(),
                },
            );
        }
    }

    Ok(outcome)
}

/// Poll several operations concurrently, one independent session per identifier
///
/// Identifiers must be unique: two sessions must never poll the same
/// operation. Results come back in input order; a failing status check only
/// ends its own session.
pub async fn poll_many<C>(
    check: &C,
    operation_ids: &[String],
    policy: &PollPolicy,
    on_progress: Option<&ProgressCallback>,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<(String, Result<Outcome>)>>
where
    C: StatusCheck + ?Sized,
{
    let mut seen = HashSet::new();
    for id in operation_ids {
        if !seen.insert(id.as_str()) {
            return Err(CoreError::Validation(format!(
                "operation '{}' listed more than once",
                id
            )));
        }
    }

    let sessions = operation_ids
        .iter()
        .map(|id| poll_until_terminal(check, id, policy, on_progress, cancel));
    let results = join_all(sessions).await;

    Ok(operation_ids.iter().cloned().zip(results).collect())
}

async fn sleep_or_cancel(interval: Duration, cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = token.cancelled() => {}
            }
        }
        None => tokio::time::sleep(interval).await,
    }
}

/// Helper to emit progress events
fn emit(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}
