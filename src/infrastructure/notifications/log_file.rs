use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::entities::alarm_event::AlarmEvent;
use crate::domain::ports::notifier::{NotificationError, Notifier};

const ALARM_LOG_NAME: &str = "alarms.jsonl";

/// Appends every alarm as one JSON object per line.
pub struct LogFileNotifier {
    path: PathBuf,
}

impl LogFileNotifier {
    #[must_use]
    pub fn new(path: &str) -> Self {
        let expanded = shellexpand::tilde(path);
        Self {
            path: PathBuf::from(expanded.as_ref()),
        }
    }

    /// Log to `alarms.jsonl` inside `folder`.
    #[must_use]
    pub fn in_folder(folder: &Path) -> Self {
        Self {
            path: folder.join(ALARM_LOG_NAME),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_json_line(&self, value: &serde_json::Value) -> Result<(), NotificationError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                NotificationError::SendFailed(format!("cannot create log directory: {e}"))
            })?;
        }

        let json = serde_json::to_string(value).map_err(|e| {
            NotificationError::SendFailed(format!("JSON serialization failed: {e}"))
        })?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| NotificationError::SendFailed(format!("cannot open alarm log: {e}")))?;

        writeln!(file, "{json}")
            .map_err(|e| NotificationError::SendFailed(format!("cannot write alarm log: {e}")))
    }
}

#[async_trait]
impl Notifier for LogFileNotifier {
    async fn notify(&self, event: &AlarmEvent) -> Result<(), NotificationError> {
        let entry = serde_json::json!({
            "timestamp": event.timestamp.to_rfc3339(),
            "device": event.device_id,
            "channel": event.channel_address,
            "label": event.channel_label,
            "temperature": event.temperature,
            "threshold": event.threshold,
        });

        self.append_json_line(&entry)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use chrono::Utc;

    fn make_event(label: &str, temperature: f64) -> AlarmEvent {
        AlarmEvent {
            device_id: "320042971".to_string(),
            channel_address: "AIN1".to_string(),
            channel_label: label.to_string(),
            temperature,
            threshold: 40.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn new_expands_tilde() {
        let notifier = LogFileNotifier::new("~/test/alarms.jsonl");
        let path_str = notifier.path().to_string_lossy();
        assert!(!path_str.starts_with('~'), "tilde should be expanded");
        assert!(path_str.ends_with("test/alarms.jsonl"));
    }

    #[tokio::test]
    async fn notify_writes_json_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let notifier = LogFileNotifier::in_folder(dir.path());

        notifier
            .notify(&make_event("Mid temp", 41.5))
            .await
            .expect("notify");

        let content = std::fs::read_to_string(notifier.path()).expect("read log");
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).expect("parse JSON");
        assert_eq!(parsed["device"], "320042971");
        assert_eq!(parsed["channel"], "AIN1");
        assert_eq!(parsed["label"], "Mid temp");
        assert_eq!(parsed["temperature"], 41.5);
        assert_eq!(parsed["threshold"], 40.0);
        let ts = parsed["timestamp"].as_str().expect("timestamp str");
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[tokio::test]
    async fn notify_appends_multiple_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let notifier = LogFileNotifier::in_folder(&dir.path().join("deep").join("logs"));

        notifier.notify(&make_event("a", 41.0)).await.expect("first");
        notifier.notify(&make_event("b", 42.0)).await.expect("second");

        let content = std::fs::read_to_string(notifier.path()).expect("read log");
        let lines: Vec<&str> = content.trim().lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).expect("parse second");
        assert_eq!(second["label"], "b");
    }

    #[tokio::test]
    async fn notify_returns_error_on_invalid_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").expect("create blocker");
        let notifier = LogFileNotifier::in_folder(&blocker.join("sub"));

        let err = notifier
            .notify(&make_event("a", 41.0))
            .await
            .expect_err("parent is a file");
        assert!(matches!(err, NotificationError::SendFailed(_)));
    }
}
