use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use thermolog::application::config::{AppConfig, StorageBackend};
use thermolog::application::services::{NotificationQueue, SchedulerError};
use thermolog::domain::entities::alarm_event::AlarmEvent;
use thermolog::domain::ports::hardware::DeviceHub;
use thermolog::domain::ports::notifier::{NotificationError, Notifier};
use thermolog::domain::ports::store::SampleStore;
use thermolog::domain::value_objects::scheduler_state::SchedulerState;
use thermolog::infrastructure::hardware::simulated::SimulatedHub;
use thermolog::infrastructure::persistence::csv_file::CsvFileStore;
use thermolog::presentation::cli::commands::run::build_scheduler;

use crate::common::{datasheet, DEVICE_ID, TrackingNotifier};

fn config(threshold: f64) -> AppConfig {
    let mut config = AppConfig::default();
    config.general.sample_interval_secs = 0.02;
    config.general.read_timeout_ms = 500;
    config.general.shutdown_timeout_secs = 2;
    config.storage.backend = StorageBackend::Memory;
    for device in &mut config.devices {
        device.vin = 2.5;
        for channel in &mut device.channels {
            channel.reference_resistance = 10_000.0;
            channel.threshold = threshold;
        }
    }
    config
}

fn hub(config: &AppConfig) -> Arc<dyn DeviceHub> {
    Arc::new(SimulatedHub::new(&config.device_entities(), 10_000.0))
}

/// A transport that never answers.
struct HangingNotifier {
    calls: AtomicUsize,
}

#[async_trait]
impl Notifier for HangingNotifier {
    async fn notify(&self, _event: &AlarmEvent) -> Result<(), NotificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

fn event(n: u8) -> AlarmEvent {
    AlarmEvent {
        device_id: DEVICE_ID.to_string(),
        channel_address: format!("AIN{n}"),
        channel_label: format!("ch{n}"),
        temperature: 60.0,
        threshold: 40.0,
        timestamp: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn scheduler_runs_cycles_and_delivers_alarms_on_stop() {
    let config = config(0.0);
    let notifier = TrackingNotifier::new();
    let store: Arc<dyn SampleStore> =
        Arc::new(thermolog::infrastructure::persistence::in_memory_store::InMemoryStore::new());

    let mut scheduler = build_scheduler(
        &config,
        datasheet(),
        hub(&config),
        store,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    )
    .expect("scheduler");
    let mut states = scheduler.subscribe();

    scheduler.start().expect("start");
    assert_eq!(scheduler.state(), SchedulerState::Running);
    tokio::time::sleep(Duration::from_millis(150)).await;

    let report = scheduler.stop().await;
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(*states.borrow_and_update(), SchedulerState::Stopped);
    assert!(report.cycles >= 2, "only {} cycles", report.cycles);
    assert!(report.flushed);

    // Every channel is above a 0 °C threshold from the first cycle: one alarm each.
    let events = notifier.events();
    assert_eq!(events.len(), 2);
    assert_eq!(report.notifications.delivered, 2);

    let window = scheduler
        .history()
        .recent_window(DEVICE_ID, 1_000)
        .expect("device history");
    assert_eq!(u64::try_from(window.len()).expect("fits"), report.cycles);
}

#[tokio::test]
async fn scheduler_cannot_restart_and_stop_is_idempotent() {
    let config = config(100.0);
    let store: Arc<dyn SampleStore> =
        Arc::new(thermolog::infrastructure::persistence::in_memory_store::InMemoryStore::new());
    let mut scheduler = build_scheduler(
        &config,
        datasheet(),
        hub(&config),
        store,
        TrackingNotifier::new(),
    )
    .expect("scheduler");

    scheduler.start().expect("start");
    assert_eq!(
        scheduler.start(),
        Err(SchedulerError::NotIdle(SchedulerState::Running))
    );

    let first = scheduler.stop().await;
    let second = scheduler.stop().await;
    assert_eq!(first, second);
    assert!(scheduler.start().is_err());
}

#[tokio::test]
async fn csv_store_receives_every_cycle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(100.0);
    let csv = Arc::new(CsvFileStore::new(dir.path(), "temperature_data"));

    let mut scheduler = build_scheduler(
        &config,
        datasheet(),
        hub(&config),
        Arc::clone(&csv) as Arc<dyn SampleStore>,
        TrackingNotifier::new(),
    )
    .expect("scheduler");

    scheduler.start().expect("start");
    tokio::time::sleep(Duration::from_millis(100)).await;
    let report = scheduler.stop().await;

    let path = csv.current_path(DEVICE_ID).expect("file opened");
    let content = std::fs::read_to_string(path).expect("read csv");
    let lines: Vec<&str> = content.lines().collect();
    assert!(lines[0].starts_with("Time,"));
    assert_eq!(u64::try_from(lines.len() - 1).expect("fits"), report.cycles);
}

#[tokio::test]
async fn full_queue_drops_oldest_alarm() {
    let queue = NotificationQueue::new(2);
    assert!(queue.push(event(0)));
    assert!(queue.push(event(1)));
    assert!(queue.push(event(2)));

    assert_eq!(queue.dropped(), 1);
    assert_eq!(queue.len(), 2);
    let first = queue.next().await.expect("event");
    assert_eq!(first.channel_address, "AIN1");

    queue.close();
    assert!(!queue.push(event(3)));
    assert_eq!(queue.next().await.map(|e| e.channel_address), Some("AIN2".to_string()));
    assert!(queue.next().await.is_none());
}

#[tokio::test]
async fn hanging_transport_does_not_hold_back_cycles() {
    let mut config = config(0.0);
    config.general.shutdown_timeout_secs = 1;
    let notifier = Arc::new(HangingNotifier {
        calls: AtomicUsize::new(0),
    });
    let store: Arc<dyn SampleStore> =
        Arc::new(thermolog::infrastructure::persistence::in_memory_store::InMemoryStore::new());

    let mut scheduler = build_scheduler(
        &config,
        datasheet(),
        hub(&config),
        store,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    )
    .expect("scheduler");

    scheduler.start().expect("start");
    tokio::time::sleep(Duration::from_millis(300)).await;
    let rows = scheduler
        .history()
        .recent_window(DEVICE_ID, 1_000)
        .expect("device history")
        .len();
    assert!(rows >= 5, "only {rows} cycles while the transport hung");
    assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);

    let stopping = Instant::now();
    let report = scheduler.stop().await;
    assert!(stopping.elapsed() < Duration::from_secs(3));
    assert!(report.cycles >= 5);
    assert_eq!(report.notifications.delivered, 0);
    assert!(report.notifications.abandoned >= 1);
}
