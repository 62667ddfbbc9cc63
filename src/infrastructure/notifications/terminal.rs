use std::borrow::Cow;
use std::fmt::Write;

use async_trait::async_trait;
use chrono::Local;
use colored::Colorize;

use crate::domain::entities::alarm_event::AlarmEvent;
use crate::domain::ports::notifier::{NotificationError, Notifier};

const SEPARATOR_WIDTH: usize = 70;

/// Prints alarms to stdout as a coloured block.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl TerminalNotifier {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn render(event: &AlarmEvent) -> String {
        let separator = "\u{2500}".repeat(SEPARATOR_WIDTH);
        let local_time = event.timestamp.with_timezone(&Local);
        let mut out = String::new();

        let _ = writeln!(out, "\n{}", separator.dimmed());
        let _ = writeln!(
            out,
            "{} {}",
            " ALARM ".on_red().white().bold(),
            sanitize(&event.title()).bold()
        );
        let _ = writeln!(out, "{}", separator.dimmed());
        let _ = writeln!(out, "  Device      : {}", sanitize(&event.device_id));
        let _ = writeln!(
            out,
            "  Channel     : {} ({})",
            sanitize(&event.channel_label),
            sanitize(&event.channel_address)
        );
        let _ = writeln!(
            out,
            "  Temperature : {}",
            format!("{:.2} °C", event.temperature).red().bold()
        );
        let _ = writeln!(out, "  Threshold   : {:.2} °C", event.threshold);
        let _ = writeln!(
            out,
            "  Time        : {}",
            local_time.format("%Y-%m-%d %H:%M:%S")
        );
        let _ = writeln!(out, "{}", separator.dimmed());
        out
    }
}

#[async_trait]
impl Notifier for TerminalNotifier {
    async fn notify(&self, event: &AlarmEvent) -> Result<(), NotificationError> {
        println!("{}", Self::render(event));
        Ok(())
    }
}

/// Strip C0 control characters (including ESC) and DEL from a string,
/// preserving only printable content, newlines, and tabs.
fn sanitize(s: &str) -> Cow<'_, str> {
    if s.bytes()
        .any(|b| matches!(b, 0x00..=0x08 | 0x0B..=0x0C | 0x0E..=0x1F | 0x7F))
    {
        Cow::Owned(
            s.chars()
                .filter(|&c| !matches!(c as u32, 0x00..=0x08 | 0x0B..=0x0C | 0x0E..=0x1F | 0x7F))
                .collect(),
        )
    } else {
        Cow::Borrowed(s)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_event(label: &str) -> AlarmEvent {
        AlarmEvent {
            device_id: "u3".to_string(),
            channel_address: "AIN0".to_string(),
            channel_label: label.to_string(),
            temperature: 52.345,
            threshold: 50.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn sanitize_keeps_plain_text() {
        assert!(matches!(sanitize("Up temp"), Cow::Borrowed(_)));
    }

    #[test]
    fn sanitize_strips_escape_sequences() {
        let cleaned = sanitize("Up\x1b[31m temp\x07");
        assert_eq!(cleaned, "Up[31m temp");
    }

    #[test]
    fn render_lists_event_fields() {
        colored::control::set_override(false);
        let text = TerminalNotifier::render(&make_event("Up temp"));
        assert!(text.contains("ALARM"));
        assert!(text.contains("Channel     : Up temp (AIN0)"));
        assert!(text.contains("Temperature : 52.35 °C"));
        assert!(text.contains("Threshold   : 50.00 °C"));
    }

    #[tokio::test]
    async fn notify_always_succeeds() {
        let notifier = TerminalNotifier::new();
        assert!(notifier.notify(&make_event("Mid temp")).await.is_ok());
    }
}
