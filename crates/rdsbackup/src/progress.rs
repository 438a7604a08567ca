//! Spinner output for poll sessions
//!
//! Wraps the core progress callback with an indicatif spinner on stderr so
//! structured output on stdout stays clean.

use indicatif::{ProgressBar, ProgressStyle};
use rdsbackup_core::{ProgressCallback, ProgressEvent};

/// Build a spinner and the callback that drives it
pub fn spinner(message: &str) -> (ProgressBar, ProgressCallback) {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb.set_message(message.to_string());

    let pb_clone = pb.clone();
    let callback: ProgressCallback = Box::new(move |event| match event {
        ProgressEvent::Started { operation_id } => {
            pb_clone.set_message(format!("Waiting for {}", operation_id));
        }
        ProgressEvent::Polling {
            operation, attempt, ..
        } => {
            let status = operation.status.as_deref().unwrap_or("unknown");
            pb_clone.set_message(format!(
                "{}: {} (check {})",
                operation.id,
                format_status(status),
                attempt
            ));
        }
        ProgressEvent::Completed { operation_id } => {
            pb_clone.println(format!("{}: {}", operation_id, format_status("completed")));
        }
        ProgressEvent::Failed {
            operation_id,
            outcome,
        } => {
            pb_clone.println(format!("{}: {}", operation_id, format_status(&outcome.to_string())));
        }
    });

    (pb, callback)
}

/// Format a status for display with an icon
pub fn format_status(status: &str) -> String {
    let lower = status.to_lowercase();
    if matches!(lower.as_str(), "completed" | "complete" | "available") {
        format!("\u{2713} {}", status) // checkmark
    } else if lower.starts_with("failed") || matches!(lower.as_str(), "error" | "not found") {
        format!("\u{2717} {}", status) // x mark
    } else if lower.starts_with("cancel") {
        format!("\u{2298} {}", status) // circle slash
    } else if matches!(
        lower.as_str(),
        "creating" | "backing-up" | "starting" | "in_progress"
    ) {
        format!("\u{21bb} {}", status) // arrow circle
    } else {
        status.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_status_icons() {
        assert_eq!(format_status("available"), "\u{2713} available");
        assert_eq!(format_status("FAILED"), "\u{2717} FAILED");
        assert_eq!(format_status("failed: storage full"), "\u{2717} failed: storage full");
        assert_eq!(format_status("CANCELED"), "\u{2298} CANCELED");
        assert_eq!(format_status("IN_PROGRESS"), "\u{21bb} IN_PROGRESS");
        assert_eq!(format_status("modifying"), "modifying");
    }
}
