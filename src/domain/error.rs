use serde::{Deserialize, Serialize};

/// Coarse classification shared by every error raised in the acquisition pipeline.
///
/// Device- and channel-scoped kinds are recovered inside a cycle; calibration and
/// configuration kinds abort startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    AcquisitionFailure,
    ConversionOutOfRange,
    InvalidCalibration,
    InvalidConfiguration,
    PersistenceFailure,
    NotificationFailure,
}

impl ErrorKind {
    /// Whether an error of this kind must stop the process at startup.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::InvalidCalibration | Self::InvalidConfiguration)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AcquisitionFailure => write!(f, "AcquisitionFailure"),
            Self::ConversionOutOfRange => write!(f, "ConversionOutOfRange"),
            Self::InvalidCalibration => write!(f, "InvalidCalibration"),
            Self::InvalidConfiguration => write!(f, "InvalidConfiguration"),
            Self::PersistenceFailure => write!(f, "PersistenceFailure"),
            Self::NotificationFailure => write!(f, "NotificationFailure"),
        }
    }
}
