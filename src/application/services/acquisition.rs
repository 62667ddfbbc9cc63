use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::task::JoinSet;

use super::dispatcher::NotificationQueue;
use crate::domain::entities::device::{ChannelKey, Device};
use crate::domain::entities::reading::{RawChannelValue, RawReading};
use crate::domain::entities::time_series::SessionHistory;
use crate::domain::error::ErrorKind;
use crate::domain::ports::hardware::{DeviceHub, HardwareError};
use crate::domain::ports::store::SampleStore;
use crate::domain::services::alarm_evaluator::AlarmEvaluator;
use crate::domain::services::converter::ChannelConverter;
use crate::domain::value_objects::alarm::AlarmState;

/// Counters for a single acquisition cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    pub devices_read: usize,
    pub devices_failed: usize,
    pub samples: usize,
    pub conversion_failures: usize,
    pub persistence_failures: usize,
    pub alarms_raised: usize,
}

impl CycleReport {
    fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            devices_read: 0,
            devices_failed: 0,
            samples: 0,
            conversion_failures: 0,
            persistence_failures: 0,
            alarms_raised: 0,
        }
    }
}

/// A pending threshold change.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdUpdate {
    pub key: ChannelKey,
    pub threshold: f64,
}

/// Cloneable handle for changing alarm thresholds while acquisition runs.
///
/// Updates are queued and applied together at the start of the next cycle.
#[derive(Debug, Clone, Default)]
pub struct ThresholdHandle {
    pending: Arc<Mutex<Vec<ThresholdUpdate>>>,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("threshold must be a finite temperature, got {0}")]
pub struct InvalidThreshold(pub f64);

impl InvalidThreshold {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidConfiguration
    }
}

impl ThresholdHandle {
    /// Queue a new threshold for one channel.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidThreshold`] for NaN or infinite values; nothing is queued.
    pub fn update_threshold(
        &self,
        device_id: impl Into<String>,
        address: impl Into<String>,
        threshold: f64,
    ) -> Result<(), InvalidThreshold> {
        if !threshold.is_finite() {
            return Err(InvalidThreshold(threshold));
        }
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ThresholdUpdate {
                key: ChannelKey::new(device_id, address),
                threshold,
            });
        Ok(())
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn take(&self) -> Vec<ThresholdUpdate> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[derive(Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    Hardware(#[from] HardwareError),
    #[error("device {device} does not expose channel {address}")]
    UnknownChannel { device: String, address: String },
    #[error("device {device} lists channel {address} more than once")]
    DuplicateChannel { device: String, address: String },
}

impl SetupError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Hardware(e) => e.kind(),
            Self::UnknownChannel { .. } | Self::DuplicateChannel { .. } => {
                ErrorKind::InvalidConfiguration
            }
        }
    }
}

/// Bring configured devices in line with the hardware before the first cycle.
///
/// Every configured device must be attached and every configured channel
/// enumerated by it. Channels are reordered to the hardware enumeration order,
/// inputs are configured and the excitation output is driven to `vin`.
///
/// # Errors
///
/// Returns `SetupError` on the first device that cannot be prepared.
pub fn prepare_devices(hub: &dyn DeviceHub, devices: Vec<Device>) -> Result<Vec<Device>, SetupError> {
    let attached = hub.list_devices()?;
    let mut prepared = Vec::with_capacity(devices.len());

    for mut device in devices {
        if !attached.iter().any(|id| *id == device.id) {
            return Err(HardwareError::DeviceNotFound(device.id).into());
        }
        if let Some(address) = device.duplicate_address() {
            return Err(SetupError::DuplicateChannel {
                device: device.id.clone(),
                address: address.to_string(),
            });
        }

        let order = hub.list_channels(&device.id)?;
        if let Some(missing) = device.addresses().find(|a| !order.iter().any(|o| o.as_str() == *a)) {
            return Err(SetupError::UnknownChannel {
                device: device.id.clone(),
                address: missing.to_string(),
            });
        }
        device.channels.sort_by_key(|c| {
            order
                .iter()
                .position(|o| *o == c.address)
                .unwrap_or(usize::MAX)
        });

        let addresses: Vec<String> = device.addresses().map(str::to_string).collect();
        hub.configure_inputs(&device.id, &addresses)?;
        hub.set_output(&device.id, device.output_channel, device.vin)?;

        tracing::info!(
            device = %device.id,
            channels = addresses.len(),
            vin = device.vin,
            "Device ready"
        );
        prepared.push(device);
    }

    Ok(prepared)
}

/// Orchestrates one acquisition cycle: read → convert → buffer → persist → alarm.
pub struct AcquisitionService {
    hub: Arc<dyn DeviceHub>,
    devices: Vec<Device>,
    converter: ChannelConverter,
    evaluator: AlarmEvaluator,
    history: Arc<SessionHistory>,
    store: Arc<dyn SampleStore>,
    alarms: Arc<NotificationQueue>,
    thresholds: ThresholdHandle,
    read_timeout: Duration,
    cycles: u64,
}

impl AcquisitionService {
    /// `devices` should come from [`prepare_devices`] so that channel order
    /// matches the hardware.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hub: Arc<dyn DeviceHub>,
        devices: Vec<Device>,
        converter: ChannelConverter,
        evaluator: AlarmEvaluator,
        history: Arc<SessionHistory>,
        store: Arc<dyn SampleStore>,
        alarms: Arc<NotificationQueue>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            hub,
            devices,
            converter,
            evaluator,
            history,
            store,
            alarms,
            thresholds: ThresholdHandle::default(),
            read_timeout,
            cycles: 0,
        }
    }

    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    #[must_use]
    pub fn history(&self) -> Arc<SessionHistory> {
        Arc::clone(&self.history)
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn SampleStore> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub fn threshold_handle(&self) -> ThresholdHandle {
        self.thresholds.clone()
    }

    #[must_use]
    pub fn alarm_state(&self, device_id: &str, address: &str) -> AlarmState {
        self.evaluator.state(&ChannelKey::new(device_id, address))
    }

    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run a single acquisition cycle.
    ///
    /// Failures are isolated: an unreachable device is skipped, a channel that
    /// fails to convert is stored as missing, and persistence errors are
    /// counted. Nothing here aborts the cycle.
    pub async fn run_once(&mut self) -> CycleReport {
        self.apply_threshold_updates();
        self.cycles += 1;

        let timestamp = Utc::now();
        let mut report = CycleReport::new(timestamp);
        let readings = self.read_devices().await;

        self.history.begin_cycle();
        for (index, outcome) in readings {
            let Some(device) = self.devices.get(index) else {
                continue;
            };
            let values = match outcome {
                Ok(values) => values,
                Err(e) => {
                    tracing::warn!(device = %device.id, kind = %e.kind(), "Skipping device this cycle: {e}");
                    continue;
                }
            };
            report.devices_read += 1;

            let reading = RawReading {
                device_id: device.id.clone(),
                timestamp,
                values,
            };
            let converted = self.converter.convert_reading(device, &reading);
            for failure in &converted.failures {
                tracing::warn!(
                    device = %device.id,
                    channel = %failure.address,
                    kind = %failure.error.kind(),
                    "Conversion failed: {}",
                    failure.error
                );
            }
            for address in &converted.unmatched {
                tracing::warn!(device = %device.id, channel = %address, "Reading for unknown or repeated channel ignored");
            }
            report.conversion_failures += converted.failures.len() + converted.unmatched.len();

            if let Some(buffer) = self.history.buffer(&device.id) {
                buffer.append(&converted.sample);
            }
            report.samples += 1;

            if let Err(e) = self.store.append(device, &converted.sample) {
                report.persistence_failures += 1;
                tracing::warn!(device = %device.id, kind = %e.kind(), "Failed to persist sample: {e}");
            }

            for event in self.evaluator.evaluate_sample(device, &converted.sample) {
                tracing::warn!(
                    device = %event.device_id,
                    channel = %event.channel_label,
                    temperature = event.temperature,
                    threshold = event.threshold,
                    "Alarm raised"
                );
                self.alarms.push(event);
                report.alarms_raised += 1;
            }
        }

        self.history.end_cycle();

        report.devices_failed = self.devices.len() - report.devices_read;
        report
    }

    /// Release the hardware.
    pub fn close(&self) {
        if let Err(e) = self.hub.close() {
            tracing::warn!("Failed to close hardware: {e}");
        }
    }

    fn apply_threshold_updates(&mut self) {
        for update in self.thresholds.take() {
            let applied = self
                .devices
                .iter_mut()
                .find(|d| d.id == update.key.device_id)
                .is_some_and(|d| d.set_threshold(&update.key.address, update.threshold));
            if applied {
                tracing::info!(channel = %update.key, threshold = update.threshold, "Threshold updated");
            } else {
                tracing::warn!(channel = %update.key, "Threshold update for unknown channel ignored");
            }
        }
    }

    /// Read every device in parallel, each bounded by the read timeout.
    /// Results come back in device order.
    async fn read_devices(&self) -> Vec<(usize, Result<Vec<RawChannelValue>, HardwareError>)> {
        let timeout_ms = u64::try_from(self.read_timeout.as_millis()).unwrap_or(u64::MAX);
        let mut reads = JoinSet::new();

        for (index, device) in self.devices.iter().enumerate() {
            let hub = Arc::clone(&self.hub);
            let device_id = device.id.clone();
            let timeout = self.read_timeout;
            reads.spawn(async move {
                let outcome = match tokio::time::timeout(timeout, hub.read(&device_id)).await {
                    Ok(result) => result,
                    Err(_) => Err(HardwareError::Timeout {
                        device: device_id.clone(),
                        timeout_ms,
                    }),
                };
                (index, outcome)
            });
        }

        let mut results = Vec::with_capacity(self.devices.len());
        while let Some(joined) = reads.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => tracing::error!(error = %e, "Device read task failed"),
            }
        }
        results.sort_by_key(|(index, _)| *index);
        results
    }
}
