use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use super::device::Device;
use super::sample::{ChannelValue, ConvertedSample};

/// An owned, read-only copy of consecutive rows from a [`TimeSeriesBuffer`].
///
/// `columns` is index-aligned with the device's channels and every column has
/// the same length as `timestamps`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesWindow {
    pub device_id: String,
    pub timestamps: Vec<DateTime<Utc>>,
    pub columns: Vec<Vec<Option<ChannelValue>>>,
}

impl SeriesWindow {
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    #[must_use]
    pub fn column(&self, channel_index: usize) -> Option<&[Option<ChannelValue>]> {
        self.columns.get(channel_index).map(Vec::as_slice)
    }

    /// Value of one channel at one row.
    #[must_use]
    pub fn cell(&self, row: usize, channel_index: usize) -> Option<ChannelValue> {
        self.columns
            .get(channel_index)
            .and_then(|column| column.get(row))
            .copied()
            .flatten()
    }
}

#[derive(Debug, Default)]
struct Columns {
    appended: u64,
    timestamps: VecDeque<DateTime<Utc>>,
    channels: Vec<VecDeque<Option<ChannelValue>>>,
}

/// Columnar history of one device's converted samples.
///
/// One writer appends under a short write lock; readers copy only the rows
/// they ask for under a read lock.
#[derive(Debug)]
pub struct TimeSeriesBuffer {
    device_id: String,
    channel_count: usize,
    retention: Option<usize>,
    columns: RwLock<Columns>,
}

impl TimeSeriesBuffer {
    #[must_use]
    pub fn new(device_id: impl Into<String>, channel_count: usize) -> Self {
        Self::with_retention(device_id, channel_count, None)
    }

    /// A buffer that keeps at most `retention` rows in memory, dropping the
    /// oldest first. `None` keeps the full session.
    #[must_use]
    pub fn with_retention(
        device_id: impl Into<String>,
        channel_count: usize,
        retention: Option<usize>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            channel_count,
            retention: retention.filter(|&cap| cap > 0),
            columns: RwLock::new(Columns {
                appended: 0,
                timestamps: VecDeque::new(),
                channels: vec![VecDeque::new(); channel_count],
            }),
        }
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Append one sample. Extra values are ignored and absent ones stored as missing.
    pub fn append(&self, sample: &ConvertedSample) {
        let mut columns = self.columns.write().unwrap_or_else(PoisonError::into_inner);
        columns.appended += 1;
        columns.timestamps.push_back(sample.timestamp);
        for (index, column) in columns.channels.iter_mut().enumerate() {
            column.push_back(sample.value(index));
        }

        if let Some(cap) = self.retention {
            while columns.timestamps.len() > cap {
                columns.timestamps.pop_front();
                for column in &mut columns.channels {
                    column.pop_front();
                }
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .timestamps
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows appended since creation, including those dropped by retention.
    #[must_use]
    pub fn appended(&self) -> u64 {
        self.columns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .appended
    }

    /// The last `min(n, len)` rows in chronological order.
    #[must_use]
    pub fn recent_window(&self, n: usize) -> SeriesWindow {
        let columns = self.columns.read().unwrap_or_else(PoisonError::into_inner);
        let skip = columns.timestamps.len().saturating_sub(n);
        SeriesWindow {
            device_id: self.device_id.clone(),
            timestamps: columns.timestamps.iter().skip(skip).copied().collect(),
            columns: columns
                .channels
                .iter()
                .map(|column| column.iter().skip(skip).copied().collect())
                .collect(),
        }
    }

    /// A consistent copy of everything currently held.
    #[must_use]
    pub fn snapshot(&self) -> SeriesWindow {
        self.recent_window(usize::MAX)
    }

    /// Held rows among the first `appended` ever appended.
    #[must_use]
    pub fn snapshot_until(&self, appended: u64) -> SeriesWindow {
        let columns = self.columns.read().unwrap_or_else(PoisonError::into_inner);
        let newer = usize::try_from(columns.appended.saturating_sub(appended)).unwrap_or(usize::MAX);
        let take = columns.timestamps.len().saturating_sub(newer);
        SeriesWindow {
            device_id: self.device_id.clone(),
            timestamps: columns.timestamps.iter().take(take).copied().collect(),
            columns: columns
                .channels
                .iter()
                .map(|column| column.iter().take(take).copied().collect())
                .collect(),
        }
    }

    #[must_use]
    pub const fn channel_count(&self) -> usize {
        self.channel_count
    }
}

/// The in-memory history of a whole acquisition session.
///
/// While a cycle is open, [`SessionHistory::snapshot`] leaves out the rows that
/// cycle has appended so far, so every device is exported up to the same cycle.
#[derive(Debug)]
pub struct SessionHistory {
    devices: Vec<Device>,
    buffers: Vec<Arc<TimeSeriesBuffer>>,
    open_cycle: RwLock<Option<Vec<u64>>>,
}

impl SessionHistory {
    #[must_use]
    pub fn new(devices: &[Device], retention: Option<usize>) -> Self {
        let buffers = devices
            .iter()
            .map(|d| {
                Arc::new(TimeSeriesBuffer::with_retention(
                    d.id.clone(),
                    d.channels.len(),
                    retention,
                ))
            })
            .collect();
        Self {
            devices: devices.to_vec(),
            buffers,
            open_cycle: RwLock::new(None),
        }
    }

    /// Mark the start of a cycle's appends. Waits for running snapshots.
    pub fn begin_cycle(&self) {
        let marks = self.buffers.iter().map(|b| b.appended()).collect();
        *self.open_cycle.write().unwrap_or_else(PoisonError::into_inner) = Some(marks);
    }

    /// Make the current cycle's rows visible to snapshots.
    pub fn end_cycle(&self) {
        *self.open_cycle.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Device and channel metadata as configured at startup.
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    #[must_use]
    pub fn buffer(&self, device_id: &str) -> Option<&Arc<TimeSeriesBuffer>> {
        self.devices
            .iter()
            .position(|d| d.id == device_id)
            .and_then(|i| self.buffers.get(i))
    }

    #[must_use]
    pub fn recent_window(&self, device_id: &str, n: usize) -> Option<SeriesWindow> {
        self.buffer(device_id).map(|b| b.recent_window(n))
    }

    /// Point-in-time copy of every device's history, paired with its metadata.
    ///
    /// All windows end at the same completed cycle. No cycle can start while
    /// the copy is taken.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(&Device, SeriesWindow)> {
        let open = self.open_cycle.read().unwrap_or_else(PoisonError::into_inner);
        self.devices
            .iter()
            .zip(&self.buffers)
            .enumerate()
            .map(|(index, (device, buffer))| {
                let window = match (*open).as_ref().and_then(|marks| marks.get(index)) {
                    Some(&mark) => buffer.snapshot_until(mark),
                    None => buffer.snapshot(),
                };
                (device, window)
            })
            .collect()
    }
}
