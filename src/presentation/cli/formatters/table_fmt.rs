use colored::Colorize;

use crate::domain::entities::device::Device;
use crate::domain::entities::time_series::{SeriesWindow, SessionHistory};

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Configured devices and channels as an aligned table.
#[must_use]
pub fn format_device_table(devices: &[Device]) -> String {
    let header = format!(
        "{:<12} {:<14} {:>6} {:<6} {:<16} {:>10} {:>9} {:<4}",
        "DEVICE", "NAME", "VIN", "ADDR", "LABEL", "R_REF", "LIMIT", "PLOT"
    );
    let separator = "─".repeat(header.chars().count());
    let mut rows = vec![header, separator];

    for device in devices {
        for channel in &device.channels {
            rows.push(format!(
                "{:<12} {:<14} {:>6.2} {:<6} {:<16} {:>10.2} {:>9.1} {:<4}",
                truncate(&device.id, 12),
                truncate(&device.name, 14),
                device.vin,
                truncate(&channel.address, 6),
                truncate(&channel.label, 16),
                channel.reference_resistance,
                channel.threshold,
                if channel.plot { "yes" } else { "no" },
            ));
        }
    }

    rows.join("\n")
}

struct ChannelStats {
    last: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    missing: usize,
}

fn channel_stats(window: &SeriesWindow, index: usize) -> ChannelStats {
    let temperatures: Vec<Option<f64>> = window
        .column(index)
        .unwrap_or_default()
        .iter()
        .map(|cell| cell.map(|v| v.temperature))
        .collect();
    let present = || temperatures.iter().flatten().copied();

    ChannelStats {
        last: temperatures.last().copied().flatten(),
        min: present().reduce(f64::min),
        max: present().reduce(f64::max),
        missing: temperatures.iter().filter(|t| t.is_none()).count(),
    }
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |t| format!("{t:.2}"))
}

/// Latest value and range of every channel over the last `points` rows.
#[must_use]
pub fn format_history_table(history: &SessionHistory, points: usize) -> String {
    let header = format!(
        "{:<12} {:<16} {:>9} {:>9} {:>9} {:>7} {:>6}",
        "DEVICE", "CHANNEL", "LAST °C", "MIN °C", "MAX °C", "MISSING", "ROWS"
    );
    let separator = "─".repeat(header.chars().count());
    let mut rows = vec![header, separator];

    for device in history.devices() {
        let Some(window) = history.recent_window(&device.id, points) else {
            continue;
        };
        for (index, channel) in device.channels.iter().enumerate() {
            let stats = channel_stats(&window, index);
            let last = format!("{:>9}", cell(stats.last));
            let last = match stats.last {
                Some(t) if t > channel.threshold => last.red().bold().to_string(),
                _ => last,
            };
            rows.push(format!(
                "{:<12} {:<16} {} {:>9} {:>9} {:>7} {:>6}",
                truncate(&device.id, 12),
                truncate(&channel.label, 16),
                last,
                cell(stats.min),
                cell(stats.max),
                stats.missing,
                window.len(),
            ));
        }
    }

    rows.join("\n")
}
