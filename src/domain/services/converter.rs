use std::sync::Arc;

use crate::domain::entities::device::{Channel, Device};
use crate::domain::entities::reading::RawReading;
use crate::domain::entities::sample::{ChannelValue, ConvertedSample};
use crate::domain::value_objects::calibration::{CalibrationTable, ConversionError};

/// A channel that produced no value this cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFailure {
    pub address: String,
    pub error: ConversionError,
}

/// Result of converting one device reading.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutcome {
    pub sample: ConvertedSample,
    pub failures: Vec<ChannelFailure>,
    /// Raw values whose address matched no configured channel, or repeated one.
    pub unmatched: Vec<String>,
}

/// Turns raw divider millivolts into resistance and temperature.
#[derive(Debug, Clone)]
pub struct ChannelConverter {
    table: Arc<CalibrationTable>,
}

impl ChannelConverter {
    #[must_use]
    pub const fn new(table: Arc<CalibrationTable>) -> Self {
        Self { table }
    }

    #[must_use]
    pub fn table(&self) -> &CalibrationTable {
        &self.table
    }

    /// Convert one raw reading.
    ///
    /// `R = R_ref * V / (Vin - V)` is only meaningful for `0 <= V < Vin`.
    ///
    /// # Errors
    ///
    /// Returns `ConversionError` if the reading is not finite, the voltage is
    /// outside `[0, Vin)`, or the resistance is outside the calibration domain.
    pub fn convert(
        &self,
        device: &Device,
        channel: &Channel,
        raw_millivolts: f64,
    ) -> Result<ChannelValue, ConversionError> {
        if !raw_millivolts.is_finite() {
            return Err(ConversionError::NonFinite(raw_millivolts));
        }

        let voltage = raw_millivolts / 1000.0;
        if voltage < 0.0 || voltage >= device.vin {
            return Err(ConversionError::VoltageOutOfRange {
                voltage,
                vin: device.vin,
            });
        }

        let resistance = channel.reference_resistance * voltage / (device.vin - voltage);
        let temperature = self.table.lookup(resistance)?;

        Ok(ChannelValue {
            voltage,
            resistance,
            temperature,
        })
    }

    /// Convert every channel of a device reading independently.
    ///
    /// A failing channel is recorded and left missing in the sample; it never
    /// prevents the other channels from converting.
    #[must_use]
    pub fn convert_reading(&self, device: &Device, reading: &RawReading) -> ConversionOutcome {
        let mut values: Vec<Option<ChannelValue>> = vec![None; device.channels.len()];
        let mut seen = vec![false; device.channels.len()];
        let mut failures = Vec::new();
        let mut unmatched = Vec::new();

        for raw in &reading.values {
            let Some(index) = device.channel_index(&raw.address) else {
                unmatched.push(raw.address.clone());
                continue;
            };
            let (Some(slot), Some(seen_slot), Some(channel)) = (
                values.get_mut(index),
                seen.get_mut(index),
                device.channels.get(index),
            ) else {
                unmatched.push(raw.address.clone());
                continue;
            };
            if *seen_slot {
                unmatched.push(raw.address.clone());
                continue;
            }
            *seen_slot = true;

            match self.convert(device, channel, raw.millivolts) {
                Ok(value) => *slot = Some(value),
                Err(error) => failures.push(ChannelFailure {
                    address: raw.address.clone(),
                    error,
                }),
            }
        }

        ConversionOutcome {
            sample: ConvertedSample {
                timestamp: reading.timestamp,
                device_id: device.id.clone(),
                values,
            },
            failures,
            unmatched,
        }
    }
}
