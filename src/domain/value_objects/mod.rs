pub mod alarm;
pub mod calibration;
pub mod scheduler_state;

pub use alarm::{AlarmPolicy, AlarmState};
pub use calibration::{CalibrationError, CalibrationPoint, CalibrationTable, ConversionError};
pub use scheduler_state::SchedulerState;
