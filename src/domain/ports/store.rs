use thiserror::Error;

use crate::domain::entities::device::Device;
use crate::domain::entities::sample::ConvertedSample;
use crate::domain::error::ErrorKind;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage read failed: {0}")]
    ReadFailed(String),
    #[error("storage write failed: {0}")]
    WriteFailed(String),
    #[error("unknown device: {0}")]
    UnknownDevice(String),
}

impl StoreError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::PersistenceFailure
    }
}

/// Durable sink for converted samples.
pub trait SampleStore: Send + Sync {
    /// Persist one device's sample for one cycle.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write operation fails.
    fn append(&self, device: &Device, sample: &ConvertedSample) -> Result<(), StoreError>;

    /// Push any buffered or backlogged rows to durable storage.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if pending rows could not be written.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let err = StoreError::WriteFailed("disk full".to_string());
        assert_eq!(err.to_string(), "storage write failed: disk full");
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);

        let err = StoreError::UnknownDevice("u6".to_string());
        assert_eq!(err.to_string(), "unknown device: u6");
    }
}
