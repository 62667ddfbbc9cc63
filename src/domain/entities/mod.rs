pub mod alarm_event;
pub mod device;
pub mod reading;
pub mod sample;
pub mod time_series;

pub use alarm_event::AlarmEvent;
pub use device::{Channel, ChannelKey, Device};
pub use reading::{RawChannelValue, RawReading};
pub use sample::{ChannelValue, ConvertedSample};
pub use time_series::{SeriesWindow, SessionHistory, TimeSeriesBuffer};
