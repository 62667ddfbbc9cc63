use std::collections::HashMap;
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entities::device::Device;
use crate::domain::entities::reading::RawChannelValue;
use crate::domain::ports::hardware::{DeviceHub, HardwareError};

/// Reads per full oscillation of the simulated signal.
const PERIOD_READS: f64 = 120.0;
/// Peak relative swing of the simulated thermistor resistance.
const SWING: f64 = 0.1;

struct SimChannel {
    address: String,
    reference_resistance: f64,
}

struct SimDevice {
    channels: Vec<SimChannel>,
    inputs: Vec<String>,
    output: f64,
    reads: u64,
}

/// In-process stand-in for the acquisition hardware.
///
/// Every channel follows a slow sine around `nominal_resistance`, phase-shifted
/// per channel, so repeated runs produce the same sequence.
pub struct SimulatedHub {
    devices: Mutex<HashMap<String, SimDevice>>,
    order: Vec<String>,
    nominal_resistance: f64,
    latency: Duration,
    closed: AtomicBool,
}

impl SimulatedHub {
    #[must_use]
    pub fn new(devices: &[Device], nominal_resistance: f64) -> Self {
        let order = devices.iter().map(|d| d.id.clone()).collect();
        let devices = devices
            .iter()
            .map(|device| {
                let channels = device
                    .channels
                    .iter()
                    .map(|c| SimChannel {
                        address: c.address.clone(),
                        reference_resistance: c.reference_resistance,
                    })
                    .collect();
                let sim = SimDevice {
                    channels,
                    inputs: Vec::new(),
                    output: device.vin,
                    reads: 0,
                };
                (device.id.clone(), sim)
            })
            .collect();

        Self {
            devices: Mutex::new(devices),
            order,
            nominal_resistance,
            latency: Duration::ZERO,
            closed: AtomicBool::new(false),
        }
    }

    /// Delay every read by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn with_device<T>(
        &self,
        device_id: &str,
        f: impl FnOnce(&mut SimDevice) -> Result<T, HardwareError>,
    ) -> Result<T, HardwareError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(HardwareError::Closed);
        }
        let mut devices = self.devices.lock().map_err(|_| HardwareError::Unavailable {
            device: device_id.to_string(),
            reason: "simulator state poisoned".to_string(),
        })?;
        let device = devices
            .get_mut(device_id)
            .ok_or_else(|| HardwareError::DeviceNotFound(device_id.to_string()))?;
        f(device)
    }

    fn sample(&self, device: &mut SimDevice) -> Vec<RawChannelValue> {
        let step = device.reads;
        device.reads += 1;

        #[allow(clippy::cast_precision_loss)]
        let base_phase = TAU * (step as f64) / PERIOD_READS;

        device
            .channels
            .iter()
            .enumerate()
            .filter(|(_, c)| device.inputs.is_empty() || device.inputs.contains(&c.address))
            .map(|(index, channel)| {
                #[allow(clippy::cast_precision_loss)]
                let phase = base_phase + (index as f64) * 0.7;
                let resistance = self.nominal_resistance * SWING.mul_add(phase.sin(), 1.0);
                let volts =
                    device.output * resistance / (resistance + channel.reference_resistance);
                RawChannelValue::new(volts * 1000.0, channel.address.clone())
            })
            .collect()
    }
}

#[async_trait]
impl DeviceHub for SimulatedHub {
    fn list_devices(&self) -> Result<Vec<String>, HardwareError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(HardwareError::Closed);
        }
        Ok(self.order.clone())
    }

    fn list_channels(&self, device_id: &str) -> Result<Vec<String>, HardwareError> {
        self.with_device(device_id, |d| {
            Ok(d.channels.iter().map(|c| c.address.clone()).collect())
        })
    }

    fn configure_inputs(&self, device_id: &str, addresses: &[String]) -> Result<(), HardwareError> {
        self.with_device(device_id, |d| {
            if let Some(missing) = addresses
                .iter()
                .find(|a| !d.channels.iter().any(|c| &c.address == *a))
            {
                return Err(HardwareError::ChannelNotFound {
                    device: device_id.to_string(),
                    address: missing.clone(),
                });
            }
            d.inputs = addresses.to_vec();
            Ok(())
        })
    }

    fn set_output(
        &self,
        device_id: &str,
        output_channel: u8,
        voltage: f64,
    ) -> Result<(), HardwareError> {
        self.with_device(device_id, |d| {
            if !voltage.is_finite() || voltage <= 0.0 {
                return Err(HardwareError::Unavailable {
                    device: device_id.to_string(),
                    reason: format!("output {output_channel} rejects {voltage} V"),
                });
            }
            d.output = voltage;
            Ok(())
        })
    }

    async fn read(&self, device_id: &str) -> Result<Vec<RawChannelValue>, HardwareError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.with_device(device_id, |d| Ok(self.sample(d)))
    }

    fn close(&self) -> Result<(), HardwareError> {
        self.closed.store(true, Ordering::SeqCst);
        tracing::debug!("simulated hub closed");
        Ok(())
    }
}
