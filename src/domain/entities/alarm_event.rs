use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A channel crossed above its threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmEvent {
    pub device_id: String,
    pub channel_address: String,
    pub channel_label: String,
    pub temperature: f64,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
}

impl AlarmEvent {
    /// Short human-readable title used by every transport.
    #[must_use]
    pub fn title(&self) -> String {
        format!(
            "{} on {} above threshold: {:.2} °C > {:.2} °C",
            self.channel_label, self.device_id, self.temperature, self.threshold
        )
    }
}
