use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::reading::RawChannelValue;
use crate::domain::error::ErrorKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HardwareError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device {device} has no channel {address}")]
    ChannelNotFound { device: String, address: String },
    #[error("read from device {device} timed out after {timeout_ms} ms")]
    Timeout { device: String, timeout_ms: u64 },
    #[error("device {device} unavailable: {reason}")]
    Unavailable { device: String, reason: String },
    #[error("hardware transport closed")]
    Closed,
}

impl HardwareError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::AcquisitionFailure
    }
}

/// Access to the acquisition hardware.
///
/// Reads are per device so that each device can be bounded by its own timeout
/// and skipped independently.
#[async_trait]
pub trait DeviceHub: Send + Sync {
    /// Identifiers of every attached device.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError` if the transport cannot enumerate devices.
    fn list_devices(&self) -> Result<Vec<String>, HardwareError>;

    /// Channel addresses of a device, in the order readings will be returned.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::DeviceNotFound` for an unknown device.
    fn list_channels(&self, device_id: &str) -> Result<Vec<String>, HardwareError>;

    /// Configure the given channels as analog inputs.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError` if the device or a channel is unknown.
    fn configure_inputs(&self, device_id: &str, addresses: &[String])
        -> Result<(), HardwareError>;

    /// Drive the excitation output of a device.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError` if the device is unknown or rejects the value.
    fn set_output(
        &self,
        device_id: &str,
        output_channel: u8,
        voltage: f64,
    ) -> Result<(), HardwareError>;

    /// Read every configured input of one device, in hardware order.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError` if the device is unreachable.
    async fn read(&self, device_id: &str) -> Result<Vec<RawChannelValue>, HardwareError>;

    /// Read every device in turn.
    ///
    /// # Errors
    ///
    /// Returns the first `HardwareError` met while enumerating or reading.
    async fn read_all(&self) -> Result<HashMap<String, Vec<RawChannelValue>>, HardwareError> {
        let mut readings = HashMap::new();
        for device_id in self.list_devices()? {
            let values = self.read(&device_id).await?;
            readings.insert(device_id, values);
        }
        Ok(readings)
    }

    /// Release the transport. Further reads fail with `HardwareError::Closed`.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError` if the transport fails to close cleanly.
    fn close(&self) -> Result<(), HardwareError>;
}
