pub mod hardware;
pub mod notifier;
pub mod store;

pub use hardware::{DeviceHub, HardwareError};
pub use notifier::{NotificationError, Notifier};
pub use store::{SampleStore, StoreError};
