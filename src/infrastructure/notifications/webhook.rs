use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::entities::alarm_event::AlarmEvent;
use crate::domain::ports::notifier::{NotificationError, Notifier};

const ALARM_COLOR_HEX: &str = "#E74C3C";
const ALARM_COLOR_DECIMAL: u32 = 0x00_E7_4C_3C;

/// Webhook notification format, auto-detected from the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WebhookFormat {
    Slack,
    Discord,
    Generic,
}

/// Posts alarm events to an HTTP webhook endpoint.
///
/// Supports Slack (attachment blocks), Discord (embeds), and generic JSON
/// payloads. The format is auto-detected from the webhook host.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Creates a new webhook notifier targeting the given URL.
    ///
    /// The HTTP client is configured with a 5-second timeout covering
    /// DNS resolution, connection, and response.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::ChannelUnavailable` if the HTTP client
    /// cannot be initialized (e.g. TLS backend failure).
    pub fn new(url: String) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                NotificationError::ChannelUnavailable(format!("cannot build HTTP client: {e}"))
            })?;

        Ok(Self { url, client })
    }

    fn detect_format(&self) -> WebhookFormat {
        // Compare the host only, so paths or queries never trigger a match
        let host = self
            .url
            .split("//")
            .nth(1)
            .and_then(|s| s.split('/').next())
            .and_then(|h| h.split(':').next())
            .unwrap_or("");

        if host == "hooks.slack.com" {
            WebhookFormat::Slack
        } else if host == "discord.com" || host == "discordapp.com" {
            WebhookFormat::Discord
        } else {
            WebhookFormat::Generic
        }
    }

    fn format_event(&self, event: &AlarmEvent) -> Value {
        match self.detect_format() {
            WebhookFormat::Slack => Self::format_slack(event),
            WebhookFormat::Discord => Self::format_discord(event),
            WebhookFormat::Generic => Self::format_generic(event),
        }
    }

    fn format_slack(event: &AlarmEvent) -> Value {
        json!({
            "attachments": [{
                "color": ALARM_COLOR_HEX,
                "blocks": [
                    {
                        "type": "header",
                        "text": {
                            "type": "plain_text",
                            "text": format!("\u{1F525} thermolog: {}", event.title())
                        }
                    },
                    {
                        "type": "section",
                        "fields": [
                            { "type": "mrkdwn", "text": format!("*Device:*\n{}", event.device_id) },
                            { "type": "mrkdwn", "text": format!("*Channel:*\n{} ({})", event.channel_label, event.channel_address) },
                            { "type": "mrkdwn", "text": format!("*Temperature:*\n{:.2} °C", event.temperature) },
                            { "type": "mrkdwn", "text": format!("*Threshold:*\n{:.2} °C", event.threshold) }
                        ]
                    }
                ]
            }]
        })
    }

    fn format_discord(event: &AlarmEvent) -> Value {
        json!({
            "username": "thermolog",
            "embeds": [{
                "title": event.title(),
                "color": ALARM_COLOR_DECIMAL,
                "fields": [
                    { "name": "Device", "value": &event.device_id, "inline": true },
                    { "name": "Channel", "value": &event.channel_label, "inline": true },
                    { "name": "Temperature", "value": format!("{:.2} °C", event.temperature), "inline": true },
                    { "name": "Threshold", "value": format!("{:.2} °C", event.threshold), "inline": true }
                ],
                "timestamp": event.timestamp.to_rfc3339()
            }]
        })
    }

    fn format_generic(event: &AlarmEvent) -> Value {
        json!({
            "source": "thermolog",
            "type": "temperature_alarm",
            "title": event.title(),
            "device": &event.device_id,
            "channel": &event.channel_address,
            "label": &event.channel_label,
            "temperature": event.temperature,
            "threshold": event.threshold,
            "timestamp": event.timestamp.to_rfc3339()
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: &AlarmEvent) -> Result<(), NotificationError> {
        let payload = self.format_event(event);
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(format!("webhook: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(NotificationError::SendFailed(format!(
                "webhook HTTP {}",
                response.status()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use chrono::Utc;

    fn make_notifier(url: &str) -> WebhookNotifier {
        WebhookNotifier::new(url.to_string()).expect("build HTTP client")
    }

    fn make_event() -> AlarmEvent {
        AlarmEvent {
            device_id: "320042971".to_string(),
            channel_address: "AIN0".to_string(),
            channel_label: "Up temp".to_string(),
            temperature: 52.5,
            threshold: 50.0,
            timestamp: Utc::now(),
        }
    }

    // --- Format detection ---

    #[test]
    fn detect_slack_url() {
        let n = make_notifier("https://hooks.slack.com/services/T00/B00/xxx");
        assert_eq!(n.detect_format(), WebhookFormat::Slack);
    }

    #[test]
    fn detect_discord_urls() {
        let n = make_notifier("https://discord.com/api/webhooks/123/token");
        assert_eq!(n.detect_format(), WebhookFormat::Discord);
        let n = make_notifier("https://discordapp.com/api/webhooks/123/token");
        assert_eq!(n.detect_format(), WebhookFormat::Discord);
    }

    #[test]
    fn detect_generic_url() {
        let n = make_notifier("https://example.com/hooks.slack.com");
        assert_eq!(n.detect_format(), WebhookFormat::Generic);
    }

    // --- Payloads ---

    #[test]
    fn slack_payload_has_colored_attachment() {
        let n = make_notifier("https://hooks.slack.com/services/T00/B00/xxx");
        let payload = n.format_event(&make_event());

        let att = &payload["attachments"][0];
        assert_eq!(att["color"], "#E74C3C");
        let header = att["blocks"][0]["text"]["text"].as_str().expect("header");
        assert!(header.contains("Up temp"));
        let fields = att["blocks"][1]["fields"].as_array().expect("fields");
        assert_eq!(fields.len(), 4);
        assert!(fields[2]["text"].as_str().expect("temp").contains("52.50"));
    }

    #[test]
    fn discord_payload_has_embed() {
        let n = make_notifier("https://discord.com/api/webhooks/123/token");
        let payload = n.format_event(&make_event());

        assert_eq!(payload["username"], "thermolog");
        let embed = &payload["embeds"][0];
        assert_eq!(embed["color"], 0x00_E7_4C_3C);
        assert!(embed["timestamp"].as_str().is_some());
        assert_eq!(embed["fields"].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn generic_payload_is_flat() {
        let n = make_notifier("https://example.com/webhook");
        let payload = n.format_event(&make_event());

        assert_eq!(payload["source"], "thermolog");
        assert_eq!(payload["device"], "320042971");
        assert_eq!(payload["channel"], "AIN0");
        assert_eq!(payload["temperature"], 52.5);
        assert_eq!(payload["threshold"], 50.0);
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_send_failure() {
        let n = make_notifier("http://127.0.0.1:9/hook");
        let err = n.notify(&make_event()).await.expect_err("nothing listens on port 9");
        assert!(matches!(err, NotificationError::SendFailed(_)));
    }
}
