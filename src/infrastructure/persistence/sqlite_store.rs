use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::domain::entities::device::Device;
use crate::domain::entities::sample::{ChannelValue, ConvertedSample};
use crate::domain::ports::store::{SampleStore, StoreError};

use super::migrations;

/// One channel value as stored in the `samples` table.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSample {
    pub recorded_at: DateTime<Utc>,
    pub device_id: String,
    pub channel: String,
    pub label: String,
    pub value: Option<ChannelValue>,
}

/// SQLite-backed sample store: one row per channel per sample.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new `SQLite` store at the given path.
    ///
    /// Expands `~`, creates parent directories, opens connection,
    /// sets WAL mode and pragmas, and initializes schema.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteFailed` if the database cannot be opened or initialized.
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let expanded = shellexpand::tilde(path);
        let db_path = PathBuf::from(expanded.as_ref());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        }

        let conn =
            Connection::open(&db_path).map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        migrations::initialize_schema(&conn).map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Total number of stored channel rows.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ReadFailed` if the query fails.
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM samples", [], |row| row.get(0))
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        usize::try_from(count).map_err(|e| StoreError::ReadFailed(e.to_string()))
    }

    /// Most recent rows for a device, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ReadFailed` if the query or row decoding fails.
    pub fn recent_samples(
        &self,
        device_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredSample>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;

        let mut stmt = conn
            .prepare(
                "SELECT recorded_at, device_id, channel, label, voltage, resistance, temperature \
                 FROM samples WHERE device_id = ?1 ORDER BY id DESC LIMIT ?2",
            )
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![device_id, limit], parse_sample_row)
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::ReadFailed(e.to_string()))
    }
}

fn parse_sample_row(row: &rusqlite::Row<'_>) -> Result<StoredSample, rusqlite::Error> {
    let recorded_at: String = row.get(0)?;
    let voltage: Option<f64> = row.get(4)?;
    let resistance: Option<f64> = row.get(5)?;
    let temperature: Option<f64> = row.get(6)?;

    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let value = match (voltage, resistance, temperature) {
        (Some(voltage), Some(resistance), Some(temperature)) => Some(ChannelValue {
            voltage,
            resistance,
            temperature,
        }),
        _ => None,
    };

    Ok(StoredSample {
        recorded_at,
        device_id: row.get(1)?,
        channel: row.get(2)?,
        label: row.get(3)?,
        value,
    })
}

impl SampleStore for SqliteStore {
    fn append(&self, device: &Device, sample: &ConvertedSample) -> Result<(), StoreError> {
        let recorded_at = sample.timestamp.to_rfc3339();
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;

        let tx = conn
            .transaction()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        for (index, channel) in device.channels.iter().enumerate() {
            let value = sample.value(index);
            tx.execute(
                "INSERT INTO samples (recorded_at, device_id, channel, label, voltage, resistance, temperature) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    recorded_at,
                    device.id,
                    channel.address,
                    channel.label,
                    value.map(|v| v.voltage),
                    value.map(|v| v.resistance),
                    value.map(|v| v.temperature),
                ],
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        }
        tx.commit()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))
    }

    fn flush(&self) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        conn.query_row("PRAGMA wal_checkpoint(PASSIVE)", [], |_| Ok(()))
            .map_err(|e| StoreError::WriteFailed(e.to_string()))
    }
}
