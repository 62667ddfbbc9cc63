use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use thermolog::domain::entities::alarm_event::AlarmEvent;
use thermolog::domain::entities::device::{Channel, Device};
use thermolog::domain::ports::notifier::{NotificationError, Notifier};
use thermolog::domain::value_objects::calibration::CalibrationTable;
use thermolog::infrastructure::calibration::csv_dataset::load_dataset;

pub const DEVICE_ID: &str = "320042971";

pub fn fixture_path(name: &str) -> PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// 10 kΩ NTC curve in ohms: 10 000 Ω is exactly 25 °C.
pub fn datasheet() -> CalibrationTable {
    load_dataset(&fixture_path("thermistor-datasheet-10k.csv")).expect("fixture datasheet")
}

pub fn channel(address: &str, label: &str, threshold: f64) -> Channel {
    Channel {
        address: address.to_string(),
        label: label.to_string(),
        reference_resistance: 10_000.0,
        threshold,
        plot: true,
    }
}

pub fn device(threshold: f64) -> Device {
    Device {
        id: DEVICE_ID.to_string(),
        name: "U3-HV".to_string(),
        vin: 2.5,
        output_channel: 0,
        channels: vec![
            channel("AIN0", "Up temp", threshold),
            channel("AIN1", "Mid temp", threshold),
        ],
    }
}

/// Records every alarm it is asked to deliver.
#[derive(Default)]
pub struct TrackingNotifier {
    events: Mutex<Vec<AlarmEvent>>,
}

impl TrackingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<AlarmEvent> {
        self.events.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Notifier for TrackingNotifier {
    async fn notify(&self, event: &AlarmEvent) -> Result<(), NotificationError> {
        self.events.lock().expect("lock").push(event.clone());
        Ok(())
    }
}
