pub mod calibration;
pub mod hardware;
pub mod notifications;
pub mod persistence;
