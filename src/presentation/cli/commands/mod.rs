pub mod calibration;
pub mod check;
pub mod convert;
pub mod run;
