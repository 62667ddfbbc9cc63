use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A converted channel value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelValue {
    /// Measured divider voltage, in volts.
    pub voltage: f64,
    pub resistance: f64,
    /// Degrees Celsius.
    pub temperature: f64,
}

/// One device's converted values for one cycle.
///
/// `values` is index-aligned with the device's channel list; `None` marks a
/// channel whose value is missing this cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedSample {
    pub timestamp: DateTime<Utc>,
    pub device_id: String,
    pub values: Vec<Option<ChannelValue>>,
}

impl ConvertedSample {
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    #[must_use]
    pub fn value(&self, index: usize) -> Option<ChannelValue> {
        self.values.get(index).copied().flatten()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_are_counted() {
        let sample = ConvertedSample {
            timestamp: Utc::now(),
            device_id: "u3".to_string(),
            values: vec![
                Some(ChannelValue {
                    voltage: 1.2,
                    resistance: 9.1,
                    temperature: 26.0,
                }),
                None,
            ],
        };
        assert_eq!(sample.missing_count(), 1);
        assert!(sample.value(1).is_none());
        assert!(sample.value(5).is_none());
        assert!(sample.value(0).is_some());
    }

    #[test]
    fn serde_roundtrip_keeps_gaps() {
        let sample = ConvertedSample {
            timestamp: Utc::now(),
            device_id: "u3".to_string(),
            values: vec![None],
        };
        let json = serde_json::to_string(&sample).expect("serialize");
        let back: ConvertedSample = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, sample);
    }
}
