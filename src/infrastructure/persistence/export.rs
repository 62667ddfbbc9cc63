use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::csv_format;
use crate::domain::entities::device::{Channel, Device};
use crate::domain::entities::sample::ChannelValue;
use crate::domain::entities::time_series::{SeriesWindow, SessionHistory};
use crate::domain::ports::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// One exported channel column group.
struct Column<'a> {
    device_index: usize,
    device: &'a Device,
    channel: &'a Channel,
    index: usize,
}

impl Column<'_> {
    /// Device id is part of the name since display names may repeat.
    fn prefix(&self) -> String {
        let device = self.device;
        if device.name.is_empty() || device.name == device.id {
            format!("{} {}", device.id, self.channel.label)
        } else {
            format!("{} ({}) {}", device.name, device.id, self.channel.label)
        }
    }
}

/// A merged row: timestamp, then the occurrence of that timestamp within a device.
type RowKey = (DateTime<Utc>, usize);

#[derive(Serialize)]
struct JsonRow<'a> {
    time: String,
    channels: Vec<JsonCell<'a>>,
}

#[derive(Serialize)]
struct JsonCell<'a> {
    device: &'a str,
    channel: &'a str,
    label: &'a str,
    temperature: Option<f64>,
    voltage: Option<f64>,
    resistance: Option<f64>,
}

/// Write the whole in-memory history as a row-oriented record set.
///
/// Rows are keyed by timestamp across devices; a device without a sample at
/// a given time, or a missing channel value, leaves empty cells. Only
/// channels flagged for plotting are included. Returns the number of rows.
///
/// # Errors
///
/// Returns `StoreError::WriteFailed` if the sink rejects a write.
pub fn export_snapshot<W: Write + ?Sized>(
    history: &SessionHistory,
    sink: &mut W,
    format: ExportFormat,
) -> Result<usize, StoreError> {
    let snapshot = history.snapshot();
    let columns: Vec<Column<'_>> = snapshot
        .iter()
        .enumerate()
        .flat_map(|(device_index, (device, _))| {
            let device: &Device = device;
            device
                .channels
                .iter()
                .enumerate()
                .filter(|(_, c)| c.plot)
                .map(move |(index, channel)| Column {
                    device_index,
                    device,
                    channel,
                    index,
                })
        })
        .collect();

    let rows = merge_rows(&snapshot);
    let write_err = |e: std::io::Error| StoreError::WriteFailed(e.to_string());

    match format {
        ExportFormat::Csv => {
            let mut header = vec!["Time".to_string()];
            for column in &columns {
                header.extend(csv_format::channel_headers(&column.prefix()));
            }
            csv_format::write_row(&mut *sink, &header).map_err(write_err)?;

            for ((time, _), positions) in &rows {
                let mut fields = vec![csv_format::format_time(*time)];
                for column in &columns {
                    fields.extend(csv_format::value_cells(cell(&snapshot, positions, column)));
                }
                csv_format::write_row(&mut *sink, &fields).map_err(write_err)?;
            }
        }
        ExportFormat::Json => {
            let records: Vec<JsonRow<'_>> = rows
                .iter()
                .map(|((time, _), positions)| JsonRow {
                    time: csv_format::format_time(*time),
                    channels: columns
                        .iter()
                        .map(|column| {
                            let value = cell(&snapshot, positions, column);
                            JsonCell {
                                device: &column.device.id,
                                channel: &column.channel.address,
                                label: &column.channel.label,
                                temperature: value.map(|v| v.temperature),
                                voltage: value.map(|v| v.voltage),
                                resistance: value.map(|v| v.resistance),
                            }
                        })
                        .collect(),
                })
                .collect();
            serde_json::to_writer_pretty(&mut *sink, &records)
                .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
            writeln!(sink).map_err(write_err)?;
        }
    }

    sink.flush().map_err(write_err)?;
    Ok(rows.len())
}

/// Export the session to `{folder}/{prefix}_session_{timestamp}.{ext}`.
///
/// # Errors
///
/// Returns `StoreError::WriteFailed` if the folder or file cannot be written.
pub fn export_to_folder(
    history: &SessionHistory,
    folder: &Path,
    prefix: &str,
    format: ExportFormat,
) -> Result<PathBuf, StoreError> {
    std::fs::create_dir_all(folder).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
    let path = folder.join(format!(
        "{prefix}_session_{}.{}",
        csv_format::file_stamp(Utc::now()),
        format.extension()
    ));
    let file = std::fs::File::create(&path)
        .map_err(|e| StoreError::WriteFailed(format!("{}: {e}", path.display())))?;
    let mut writer = std::io::BufWriter::new(file);
    let rows = export_snapshot(history, &mut writer, format)?;
    tracing::info!(rows, path = %path.display(), "Session exported");
    Ok(path)
}

/// For every timestamp, the row index of each device that has one.
///
/// A device holding the same timestamp twice gets one merged row per
/// occurrence, so no sample is hidden.
fn merge_rows(snapshot: &[(&Device, SeriesWindow)]) -> BTreeMap<RowKey, HashMap<usize, usize>> {
    let mut rows: BTreeMap<RowKey, HashMap<usize, usize>> = BTreeMap::new();
    for (device_index, (device, window)) in snapshot.iter().enumerate() {
        let mut seen: HashMap<DateTime<Utc>, usize> = HashMap::new();
        for (row, time) in window.timestamps.iter().enumerate() {
            let occurrence = seen.entry(*time).or_insert(0);
            if *occurrence > 0 {
                tracing::warn!(device = %device.id, time = %time, "Duplicate timestamp in history, exporting as a separate row");
            }
            rows.entry((*time, *occurrence)).or_default().insert(device_index, row);
            *occurrence += 1;
        }
    }
    rows
}

fn cell(
    snapshot: &[(&Device, SeriesWindow)],
    positions: &HashMap<usize, usize>,
    column: &Column<'_>,
) -> Option<ChannelValue> {
    let row = positions.get(&column.device_index)?;
    snapshot
        .get(column.device_index)
        .and_then(|(_, window)| window.cell(*row, column.index))
}
