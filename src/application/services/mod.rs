pub mod acquisition;
pub mod dispatcher;
pub mod scheduler;

pub use acquisition::{prepare_devices, AcquisitionService, CycleReport, InvalidThreshold, SetupError, ThresholdHandle};
pub use dispatcher::{DispatchReport, NotificationDispatcher, NotificationQueue};
pub use scheduler::{Scheduler, SchedulerError, StopReport};
