//! Per-item audit records and the persisted audit set.
//!
//! The audit set is a JSON object keyed by archive item identifier. Each
//! record carries the remote inventory, the three storage inventories, the
//! derived gaps, and a status string. Fields written by other tools are kept
//! in `extra` so a run never drops data it does not understand.

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Format used for `last_checked`, second precision, local time.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Item identifier to record, in input order.
pub type AuditSet = IndexMap<String, AuditRecord>;

/// Health classification of one item.
///
/// Serialized as the exact status strings the audit file has always used.
/// Unknown strings from older files round-trip through `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditStatus {
    Ok,
    Warn,
    NoFilesFound,
    MalformedUrl,
    TimedOut,
    CouldNotConnect,
    Other(String),
}

const STICKY_PREFIXES: [&str; 3] = [
    "ERROR -- Couldn't connect",
    "ERROR -- Malformed",
    "ERROR -- Timed out",
];

impl AuditStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "OK",
            Self::Warn => "WARN",
            Self::NoFilesFound => "ERROR -- No files found in IA",
            Self::MalformedUrl => "ERROR -- Malformed URL, unable to find JP2 Zip link",
            Self::TimedOut => "ERROR -- Timed out trying to connect to IA",
            Self::CouldNotConnect => "ERROR -- Couldn't connect to IA",
            Self::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "OK" => Self::Ok,
            "WARN" => Self::Warn,
            "ERROR -- No files found in IA" => Self::NoFilesFound,
            "ERROR -- Malformed URL, unable to find JP2 Zip link" => Self::MalformedUrl,
            "ERROR -- Timed out trying to connect to IA" => Self::TimedOut,
            "ERROR -- Couldn't connect to IA" => Self::CouldNotConnect,
            other => Self::Other(other.to_string()),
        }
    }

    /// Connection-level errors survive status classification.
    pub fn is_sticky(&self) -> bool {
        let s = self.as_str();
        STICKY_PREFIXES.iter().any(|prefix| s.starts_with(prefix))
    }

    pub fn is_error(&self) -> bool {
        self.as_str().starts_with("ERROR")
    }
}

impl Serialize for AuditStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AuditStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Audit state of a single archive item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AuditStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ia_files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_ocr: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_thumbnails: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_ocr: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_thumbnails: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn as_slice(list: &Option<Vec<String>>) -> &[String] {
    list.as_deref().unwrap_or_default()
}

impl AuditRecord {
    pub fn ia_files(&self) -> &[String] {
        as_slice(&self.ia_files)
    }

    pub fn s3_files(&self) -> &[String] {
        as_slice(&self.s3_files)
    }

    pub fn s3_ocr(&self) -> &[String] {
        as_slice(&self.s3_ocr)
    }

    pub fn s3_thumbnails(&self) -> &[String] {
        as_slice(&self.s3_thumbnails)
    }

    pub fn missing_files(&self) -> &[String] {
        as_slice(&self.missing_files)
    }

    pub fn missing_ocr(&self) -> &[String] {
        as_slice(&self.missing_ocr)
    }

    pub fn missing_thumbnails(&self) -> &[String] {
        as_slice(&self.missing_thumbnails)
    }

    /// A previous run already captured the remote inventory.
    pub fn has_remote_inventory(&self) -> bool {
        !self.ia_files().is_empty()
    }

    pub fn status_is_sticky(&self) -> bool {
        self.status.as_ref().is_some_and(AuditStatus::is_sticky)
    }

    pub fn mark_checked(&mut self, now: DateTime<Local>) {
        self.last_checked = Some(now.format(TIMESTAMP_FORMAT).to_string());
    }

    /// Parse `last_checked` as a local wall-clock time.
    ///
    /// Accepts the native second-precision format and RFC 3339 (converted to
    /// local time). Returns `None` when absent or unparseable.
    pub fn last_checked_at(&self) -> Option<NaiveDateTime> {
        let raw = self.last_checked.as_deref()?.trim();
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
            return Some(naive);
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Local).naive_local())
    }

    /// Whether the record was checked strictly within `window` before `now`.
    pub fn checked_within(&self, now: DateTime<Local>, window: TimeDelta) -> bool {
        self.last_checked_at()
            .is_some_and(|checked| checked > now.naive_local() - window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_strings_round_trip() {
        for status in [
            AuditStatus::Ok,
            AuditStatus::Warn,
            AuditStatus::NoFilesFound,
            AuditStatus::MalformedUrl,
            AuditStatus::TimedOut,
            AuditStatus::CouldNotConnect,
        ] {
            assert_eq!(AuditStatus::parse(status.as_str()), status);
        }
        assert_eq!(
            AuditStatus::parse("PENDING"),
            AuditStatus::Other("PENDING".to_string())
        );
    }

    #[test]
    fn test_sticky_statuses() {
        assert!(AuditStatus::MalformedUrl.is_sticky());
        assert!(AuditStatus::TimedOut.is_sticky());
        assert!(AuditStatus::CouldNotConnect.is_sticky());
        assert!(!AuditStatus::NoFilesFound.is_sticky());
        assert!(!AuditStatus::Warn.is_sticky());
        assert!(!AuditStatus::Ok.is_sticky());
        // Prefix match also covers variants written by older tooling
        assert!(AuditStatus::Other("ERROR -- Timed out after 3 tries".into()).is_sticky());
        assert!(!AuditStatus::Other("error -- timed out".into()).is_sticky());
    }

    #[test]
    fn test_record_deserializes_partial_object() {
        let record: AuditRecord =
            serde_json::from_str(r#"{"ia_files": ["p1.jp2", "p2.jp2"]}"#).unwrap();
        assert_eq!(record.ia_files(), ["p1.jp2", "p2.jp2"]);
        assert!(record.status.is_none());
        assert!(record.s3_files().is_empty());
        assert!(record.has_remote_inventory());
    }

    #[test]
    fn test_record_keeps_unknown_fields_and_omits_absent_ones() {
        let input = r#"{"csv_row":7,"status":"PENDING","ia_files":null}"#;
        let record: AuditRecord = serde_json::from_str(input).unwrap();
        assert_eq!(record.extra.get("csv_row"), Some(&serde_json::json!(7)));
        let out = serde_json::to_string(&record).unwrap();
        assert_eq!(out, r#"{"status":"PENDING","csv_row":7}"#);
    }

    #[test]
    fn test_mark_checked_format() {
        let now = Local.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let mut record = AuditRecord::default();
        record.mark_checked(now);
        assert_eq!(record.last_checked.as_deref(), Some("2024-03-05T07:08:09"));
        assert_eq!(record.last_checked_at(), Some(now.naive_local()));
    }

    #[test]
    fn test_checked_within_window() {
        let now = Local.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let window = TimeDelta::days(3);
        let record = |ts: &str| AuditRecord {
            last_checked: Some(ts.to_string()),
            ..Default::default()
        };

        assert!(record("2024-03-09T12:00:00").checked_within(now, window));
        assert!(record("2024-03-07T12:00:01").checked_within(now, window));
        assert!(!record("2024-03-07T12:00:00").checked_within(now, window));
        assert!(!record("2024-01-01T00:00:00").checked_within(now, window));
        assert!(!record("yesterday").checked_within(now, window));
        assert!(!AuditRecord::default().checked_within(now, window));
    }
}
