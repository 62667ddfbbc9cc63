use std::sync::Arc;
use std::time::Duration;

use thermolog::application::services::{prepare_devices, AcquisitionService, NotificationQueue};
use thermolog::domain::entities::time_series::SessionHistory;
use thermolog::domain::ports::hardware::DeviceHub;
use thermolog::domain::services::alarm_evaluator::AlarmEvaluator;
use thermolog::domain::services::converter::ChannelConverter;
use thermolog::infrastructure::hardware::simulated::SimulatedHub;
use thermolog::infrastructure::persistence::export::{export_to_folder, ExportFormat};
use thermolog::infrastructure::persistence::in_memory_store::InMemoryStore;

use crate::common::{datasheet, device};

async fn recorded_session(cycles: usize) -> Arc<SessionHistory> {
    let mut hidden = device(40.0);
    hidden.channels[1].plot = false;

    let hub: Arc<dyn DeviceHub> = Arc::new(SimulatedHub::new(&[hidden.clone()], 10_000.0));
    let devices = prepare_devices(hub.as_ref(), vec![hidden]).expect("prepare");
    let history = Arc::new(SessionHistory::new(&devices, None));
    let mut service = AcquisitionService::new(
        hub,
        devices,
        ChannelConverter::new(Arc::new(datasheet())),
        AlarmEvaluator::default(),
        Arc::clone(&history),
        Arc::new(InMemoryStore::new()),
        Arc::new(NotificationQueue::new(4)),
        Duration::from_secs(1),
    );
    for _ in 0..cycles {
        service.run_once().await;
        // distinct cycle timestamps
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    history
}

#[tokio::test]
async fn csv_export_has_one_row_per_cycle_and_plotted_channels_only() {
    let history = recorded_session(4).await;
    let dir = tempfile::tempdir().expect("tempdir");

    let path = export_to_folder(&history, dir.path(), "temperature_data", ExportFormat::Csv)
        .expect("export");
    let name = path.file_name().and_then(|n| n.to_str()).expect("file name");
    assert!(name.starts_with("temperature_data_session_"));
    assert!(name.ends_with(".csv"));

    let content = std::fs::read_to_string(&path).expect("read export");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(
        lines[0],
        "Time,U3-HV (320042971) Up temp Temperature (C),U3-HV (320042971) Up temp Voltage (V),\
         U3-HV (320042971) Up temp Resistance"
    );
    assert!(!lines[0].contains("Mid temp"));
    for row in &lines[1..] {
        assert_eq!(row.split(',').count(), 4);
    }
}

#[tokio::test]
async fn json_export_lists_channel_values() {
    let history = recorded_session(2).await;
    let dir = tempfile::tempdir().expect("tempdir");

    let path = export_to_folder(&history, dir.path(), "run", ExportFormat::Json).expect("export");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).expect("read")).expect("json");

    let rows = json.as_array().expect("array");
    assert_eq!(rows.len(), 2);
    let cell = &rows[0]["channels"][0];
    assert_eq!(cell["channel"], "AIN0");
    assert_eq!(cell["label"], "Up temp");
    let temperature = cell["temperature"].as_f64().expect("temperature");
    assert!(temperature > 20.0 && temperature < 30.0);
}
