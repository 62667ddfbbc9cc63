use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw value as returned by the hardware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChannelValue {
    pub millivolts: f64,
    pub address: String,
}

impl RawChannelValue {
    #[must_use]
    pub fn new(millivolts: f64, address: impl Into<String>) -> Self {
        Self {
            millivolts,
            address: address.into(),
        }
    }
}

/// Everything one device returned in one acquisition cycle, in hardware order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub values: Vec<RawChannelValue>,
}
