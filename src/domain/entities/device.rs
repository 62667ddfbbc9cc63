use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A thermistor input on a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Device-local identifier, as enumerated by the hardware.
    pub address: String,
    pub label: String,
    /// Divider reference resistor, in the same unit as the calibration dataset.
    pub reference_resistance: f64,
    /// Alarm fires when the temperature rises above this value.
    pub threshold: f64,
    /// Whether the channel is plotted and exported.
    pub plot: bool,
}

/// An acquisition device and its ordered channels.
///
/// Channel order follows the hardware enumeration and is the join key between
/// raw readings and channel metadata for the life of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    /// Excitation voltage applied across the divider, in volts.
    pub vin: f64,
    pub output_channel: u8,
    pub channels: Vec<Channel>,
}

impl Device {
    #[must_use]
    pub fn channel(&self, address: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.address == address)
    }

    #[must_use]
    pub fn channel_index(&self, address: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.address == address)
    }

    /// Update one channel's threshold. Returns `false` if the address is unknown.
    pub fn set_threshold(&mut self, address: &str, threshold: f64) -> bool {
        match self.channels.iter_mut().find(|c| c.address == address) {
            Some(channel) => {
                channel.threshold = threshold;
                true
            }
            None => false,
        }
    }

    /// First address that appears more than once, if any.
    #[must_use]
    pub fn duplicate_address(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.channels
            .iter()
            .map(|c| c.address.as_str())
            .find(|address| !seen.insert(*address))
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.address.as_str())
    }
}

/// Stable identity of a channel across the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelKey {
    pub device_id: String,
    pub address: String,
}

impl ChannelKey {
    #[must_use]
    pub fn new(device_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            address: address.into(),
        }
    }
}

impl std::fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.device_id, self.address)
    }
}
