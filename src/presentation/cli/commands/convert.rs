use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;

use crate::application::config::AppConfig;
use crate::domain::services::converter::ChannelConverter;
use crate::presentation::cli::commands::calibration::load_calibration;
use crate::presentation::cli::formatters::status_fmt::{
    colorize_temperature, print_section_header,
};

/// # Errors
///
/// Returns an error if the device or channel is not configured, the dataset is
/// invalid, or the reading cannot be converted.
pub fn run_convert(
    config: &AppConfig,
    device_id: &str,
    address: &str,
    millivolts: f64,
) -> anyhow::Result<()> {
    let devices = config.device_entities();
    let device = devices
        .iter()
        .find(|d| d.id == device_id)
        .with_context(|| format!("Device {device_id} is not configured"))?;
    let channel = device
        .channel(address)
        .with_context(|| format!("Device {device_id} has no channel {address}"))?;

    let converter = ChannelConverter::new(Arc::new(load_calibration(config)?));
    let value = converter
        .convert(device, channel, millivolts)
        .with_context(|| format!("Cannot convert {millivolts} mV on {device_id}/{address}"))?;

    print_section_header(&format!("{} / {} ({})", device.name, channel.label, address));
    println!("  Raw         : {millivolts} mV");
    println!("  Voltage     : {:.4} V (Vin {} V)", value.voltage, device.vin);
    println!("  Resistance  : {:.4}", value.resistance);
    println!(
        "  Temperature : {}",
        colorize_temperature(value.temperature, channel.threshold)
    );
    if value.temperature > channel.threshold {
        println!(
            "  {}",
            format!("above threshold {:.2} °C", channel.threshold).red()
        );
    }

    Ok(())
}
