//! Identifier and ARN conventions for snapshots and export tasks

use chrono::{DateTime, Utc};

/// Prefix used for generated snapshot identifiers when none is configured
pub const DEFAULT_SNAPSHOT_PREFIX: &str = "manual-backup";

/// `{prefix}-{YYYYmmdd-HHMMSS}`
pub fn snapshot_identifier(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", prefix, now.format("%Y%m%d-%H%M%S"))
}

/// Export task identifier derived from its source snapshot
pub fn export_task_identifier(snapshot_id: &str) -> String {
    format!("export-{}", snapshot_id)
}

/// ARN of a manual DB snapshot
pub fn snapshot_arn(region: &str, account_id: &str, snapshot_id: &str) -> String {
    format!(
        "arn:aws:rds:{}:{}:snapshot:{}",
        region, account_id, snapshot_id
    )
}

/// Snapshot identifier from a snapshot ARN, if it is one
pub fn snapshot_id_from_arn(arn: &str) -> Option<&str> {
    let mut parts = arn.splitn(7, ':');
    match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some("arn"), Some(_), Some("rds"), Some(_), Some(_), Some("snapshot" | "cluster-snapshot"), Some(id))
            if !id.is_empty() =>
        {
            Some(id)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_snapshot_identifier() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            snapshot_identifier("nightly", now),
            "nightly-20240309-070501"
        );
    }

    #[test]
    fn test_export_task_identifier() {
        assert_eq!(
            export_task_identifier("nightly-20240309-070501"),
            "export-nightly-20240309-070501"
        );
    }

    #[test]
    fn test_arn_round_trip() {
        let arn = snapshot_arn("us-east-1", "123456789012", "nightly-1");
        assert_eq!(arn, "arn:aws:rds:us-east-1:123456789012:snapshot:nightly-1");
        assert_eq!(snapshot_id_from_arn(&arn), Some("nightly-1"));
    }

    #[test]
    fn test_snapshot_id_from_other_arns() {
        assert_eq!(
            snapshot_id_from_arn("arn:aws:rds:eu-west-1:123456789012:cluster-snapshot:c-1"),
            Some("c-1")
        );
        assert_eq!(
            snapshot_id_from_arn("arn:aws:rds:eu-west-1:123456789012:db:mydb"),
            None
        );
        assert_eq!(
            snapshot_id_from_arn("arn:aws:s3:::bucket"),
            None
        );
        assert_eq!(snapshot_id_from_arn("not-an-arn"), None);
    }
}
