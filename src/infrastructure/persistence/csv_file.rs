use std::collections::{HashMap, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, NaiveDate};

use super::csv_format;
use crate::domain::entities::device::Device;
use crate::domain::entities::sample::ConvertedSample;
use crate::domain::ports::store::{SampleStore, StoreError};

const DEFAULT_BACKLOG: usize = 1_000;

struct OpenFile {
    path: PathBuf,
    date: NaiveDate,
    writer: File,
}

#[derive(Default)]
struct DeviceLog {
    file: Option<OpenFile>,
    backlog: VecDeque<String>,
}

/// Appends every sample to a per-device CSV file.
///
/// Files are named `{prefix}_{device}_{YYYY-MM-DD_HH-MM-SS}.csv` and a new one
/// is started when the local date of a sample differs from the open file's.
/// Rows that cannot be written stay in a bounded backlog and are retried
/// before the next row.
pub struct CsvFileStore {
    folder: PathBuf,
    prefix: String,
    backlog_limit: usize,
    logs: Mutex<HashMap<String, DeviceLog>>,
}

impl CsvFileStore {
    /// Nothing touches the filesystem until the first append.
    #[must_use]
    pub fn new(folder: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            prefix: prefix.into(),
            backlog_limit: DEFAULT_BACKLOG,
            logs: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_backlog_limit(mut self, limit: usize) -> Self {
        self.backlog_limit = limit.max(1);
        self
    }

    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// File currently receiving rows for a device.
    #[must_use]
    pub fn current_path(&self, device_id: &str) -> Option<PathBuf> {
        self.logs
            .lock()
            .ok()?
            .get(device_id)?
            .file
            .as_ref()
            .map(|f| f.path.clone())
    }

    /// Rows waiting to be written for a device.
    #[must_use]
    pub fn backlog_len(&self, device_id: &str) -> usize {
        self.logs
            .lock()
            .ok()
            .and_then(|logs| logs.get(device_id).map(|l| l.backlog.len()))
            .unwrap_or(0)
    }

    fn open_file(&self, device: &Device, sample: &ConvertedSample) -> Result<OpenFile, StoreError> {
        std::fs::create_dir_all(&self.folder).map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        let name = format!(
            "{}_{}_{}.csv",
            self.prefix,
            csv_format::sanitize(&device.id),
            csv_format::file_stamp(sample.timestamp)
        );
        let path = self.folder.join(name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::WriteFailed(format!("{}: {e}", path.display())))?;
        let is_new = file
            .metadata()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?
            .len()
            == 0;

        let mut writer = file;
        if is_new {
            let mut header = vec!["Time".to_string()];
            for channel in &device.channels {
                header.extend(csv_format::label_headers(channel));
            }
            let line = format!("{}\n", csv_format::join_row(&header));
            writer
                .write_all(line.as_bytes())
                .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        }

        tracing::info!(device = %device.id, path = %path.display(), "Opened data file");
        Ok(OpenFile {
            path,
            date: local_date(sample),
            writer,
        })
    }

    fn enqueue(&self, log: &mut DeviceLog, device_id: &str, row: String) {
        log.backlog.push_back(row);
        while log.backlog.len() > self.backlog_limit {
            log.backlog.pop_front();
            tracing::warn!(device = %device_id, limit = self.backlog_limit, "CSV backlog full, dropping oldest row");
        }
    }
}

fn local_date(sample: &ConvertedSample) -> NaiveDate {
    sample.timestamp.with_timezone(&Local).date_naive()
}

fn sample_row(sample: &ConvertedSample) -> String {
    let mut fields = vec![csv_format::format_time(sample.timestamp)];
    for value in &sample.values {
        fields.extend(csv_format::value_cells(*value));
    }
    csv_format::join_row(&fields)
}

/// Write queued rows in order, stopping at the first failure.
///
/// Each row goes to the file in one unbuffered write and leaves the backlog
/// only once that write succeeded.
fn drain_backlog(file: &mut OpenFile, backlog: &mut VecDeque<String>) -> Result<(), StoreError> {
    while let Some(row) = backlog.front() {
        let line = format!("{row}\n");
        file.writer
            .write_all(line.as_bytes())
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        backlog.pop_front();
    }
    Ok(())
}

/// Drain what is left for the previous day, then sync the file before it is closed.
fn finish_file(mut file: OpenFile, backlog: &mut VecDeque<String>) -> Result<(), StoreError> {
    drain_backlog(&mut file, backlog)?;
    file.writer
        .sync_data()
        .map_err(|e| StoreError::WriteFailed(format!("{}: {e}", file.path.display())))
}

impl SampleStore for CsvFileStore {
    fn append(&self, device: &Device, sample: &ConvertedSample) -> Result<(), StoreError> {
        let mut logs = self
            .logs
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let log = logs.entry(device.id.clone()).or_default();

        let date = local_date(sample);
        let rotate = log.file.as_ref().is_some_and(|f| f.date != date);
        if rotate {
            if let Some(old) = log.file.take() {
                if let Err(e) = finish_file(old, &mut log.backlog) {
                    tracing::warn!(device = %device.id, "Failed to finish previous data file: {e}");
                }
            }
        }

        self.enqueue(log, &device.id, sample_row(sample));

        if log.file.is_none() {
            log.file = Some(self.open_file(device, sample)?);
        }
        match log.file.as_mut() {
            Some(file) => drain_backlog(file, &mut log.backlog),
            None => Err(StoreError::WriteFailed("no open file".into())),
        }
    }

    fn flush(&self) -> Result<(), StoreError> {
        let mut logs = self
            .logs
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;

        let mut first_error = None;
        for (device_id, log) in logs.iter_mut() {
            let pending = log.backlog.len();
            let result = match log.file.as_mut() {
                Some(file) => drain_backlog(file, &mut log.backlog),
                None if pending == 0 => Ok(()),
                None => Err(StoreError::WriteFailed(format!(
                    "{pending} row(s) for {device_id} have no open file"
                ))),
            };
            if let Err(e) = result {
                tracing::warn!(device = %device_id, "Flush failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
