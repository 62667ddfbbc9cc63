use std::sync::Mutex;

use crate::domain::entities::device::Device;
use crate::domain::entities::sample::ConvertedSample;
use crate::domain::ports::store::{SampleStore, StoreError};

/// In-memory sample store for tests and dry runs.
pub struct InMemoryStore {
    samples: Mutex<Vec<ConvertedSample>>,
    flushes: Mutex<usize>,
}

impl InMemoryStore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            samples: Mutex::new(Vec::new()),
            flushes: Mutex::new(0),
        }
    }

    /// Every stored sample, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ReadFailed` if the lock is poisoned.
    pub fn samples(&self) -> Result<Vec<ConvertedSample>, StoreError> {
        Ok(self
            .samples
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .clone())
    }

    /// Samples stored for one device, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ReadFailed` if the lock is poisoned.
    pub fn samples_for(&self, device_id: &str) -> Result<Vec<ConvertedSample>, StoreError> {
        let samples = self
            .samples
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;
        Ok(samples
            .iter()
            .filter(|s| s.device_id == device_id)
            .cloned()
            .collect())
    }

    /// How many times `flush` has been called.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ReadFailed` if the lock is poisoned.
    pub fn flush_count(&self) -> Result<usize, StoreError> {
        Ok(*self
            .flushes
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleStore for InMemoryStore {
    fn append(&self, device: &Device, sample: &ConvertedSample) -> Result<(), StoreError> {
        if sample.device_id != device.id {
            return Err(StoreError::UnknownDevice(sample.device_id.clone()));
        }
        self.samples
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?
            .push(sample.clone());
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        *self
            .flushes
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))? += 1;
        Ok(())
    }
}
