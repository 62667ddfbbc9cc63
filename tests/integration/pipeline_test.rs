use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use thermolog::application::services::{prepare_devices, AcquisitionService, NotificationQueue};
use thermolog::domain::entities::device::Channel;
use thermolog::domain::entities::reading::{RawChannelValue, RawReading};
use thermolog::domain::entities::sample::{ChannelValue, ConvertedSample};
use thermolog::domain::entities::time_series::{SessionHistory, TimeSeriesBuffer};
use thermolog::domain::ports::hardware::DeviceHub;
use thermolog::domain::ports::store::SampleStore;
use thermolog::domain::services::alarm_evaluator::AlarmEvaluator;
use thermolog::domain::services::converter::ChannelConverter;
use thermolog::domain::value_objects::alarm::{AlarmPolicy, AlarmState};
use thermolog::domain::value_objects::calibration::ConversionError;
use thermolog::infrastructure::hardware::simulated::SimulatedHub;
use thermolog::infrastructure::persistence::in_memory_store::InMemoryStore;

use crate::common::{channel, datasheet, device, DEVICE_ID};

fn at(second: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, second)
        .single()
        .expect("valid time")
}

fn alarm_indices(policy: AlarmPolicy, channel: &Channel, series: &[Option<f64>]) -> Vec<usize> {
    let mut evaluator = AlarmEvaluator::new(policy);
    series
        .iter()
        .enumerate()
        .filter_map(|(i, t)| {
            let second = u32::try_from(i).expect("small index");
            evaluator
                .evaluate(DEVICE_ID, channel, *t, at(second))
                .map(|_| i)
        })
        .collect()
}

#[test]
fn divider_reading_converts_through_datasheet() {
    let converter = ChannelConverter::new(Arc::new(datasheet()));
    let device = device(40.0);

    let value = converter
        .convert(&device, &device.channels[0], 1250.0)
        .expect("in range");

    assert!((value.voltage - 1.25).abs() < 1e-12);
    assert!((value.resistance - 10_000.0).abs() < 1e-6);
    assert!((value.temperature - 25.0).abs() < 1e-9);
}

#[test]
fn reading_at_excitation_voltage_is_out_of_range_and_isolated() {
    let converter = ChannelConverter::new(Arc::new(datasheet()));
    let device = device(40.0);
    let reading = RawReading {
        device_id: DEVICE_ID.to_string(),
        timestamp: at(0),
        values: vec![
            RawChannelValue::new(2500.0, "AIN0"),
            RawChannelValue::new(1250.0, "AIN1"),
        ],
    };

    let outcome = converter.convert_reading(&device, &reading);

    assert_eq!(outcome.failures.len(), 1);
    assert!(matches!(
        outcome.failures[0].error,
        ConversionError::VoltageOutOfRange { .. }
    ));
    assert!(outcome.sample.value(0).is_none());
    let mid = outcome.sample.value(1).expect("AIN1 converts");
    assert!((mid.temperature - 25.0).abs() < 1e-9);
}

#[test]
fn one_event_per_excursion_above_threshold() {
    let ch = channel("AIN0", "Up temp", 50.0);
    let series = [Some(48.0), Some(52.0), Some(53.0), Some(49.0), Some(51.0)];
    assert_eq!(alarm_indices(AlarmPolicy::default(), &ch, &series), vec![1, 4]);
}

#[test]
fn hysteresis_band_suppresses_chatter() {
    let ch = channel("AIN0", "Up temp", 50.0);
    let series = [Some(51.0), Some(49.0), Some(51.0), Some(47.0), Some(51.0)];
    assert_eq!(
        alarm_indices(AlarmPolicy::with_hysteresis(2.0), &ch, &series),
        vec![0, 4]
    );
}

#[test]
fn missing_samples_neither_end_nor_start_an_excursion() {
    let ch = channel("AIN0", "Up temp", 50.0);
    let series = [Some(52.0), None, Some(53.0), None, Some(45.0), None, Some(55.0)];
    assert_eq!(alarm_indices(AlarmPolicy::default(), &ch, &series), vec![0, 6]);
}

#[test]
fn recent_window_is_a_stable_chronological_copy() {
    let buffer = TimeSeriesBuffer::new(DEVICE_ID, 1);
    let value = |t: f64| {
        Some(ChannelValue {
            voltage: 1.0,
            resistance: 10_000.0,
            temperature: t,
        })
    };
    for second in 0..5 {
        buffer.append(&ConvertedSample {
            timestamp: at(second),
            device_id: DEVICE_ID.to_string(),
            values: vec![value(f64::from(second))],
        });
    }

    let window = buffer.recent_window(3);
    assert_eq!(window.timestamps, vec![at(2), at(3), at(4)]);

    buffer.append(&ConvertedSample {
        timestamp: at(5),
        device_id: DEVICE_ID.to_string(),
        values: vec![None],
    });
    assert_eq!(window.timestamps, vec![at(2), at(3), at(4)]);
    assert_eq!(buffer.recent_window(100).len(), 6);
}

#[tokio::test]
async fn simulated_cycles_feed_history_store_and_alarms() {
    let table = datasheet();
    let hub: Arc<dyn DeviceHub> = Arc::new(SimulatedHub::new(&[device(40.0)], 10_000.0));
    let devices = prepare_devices(hub.as_ref(), vec![device(40.0)]).expect("prepare");
    let history = Arc::new(SessionHistory::new(&devices, None));
    let store = Arc::new(InMemoryStore::new());
    let queue = Arc::new(NotificationQueue::new(8));

    let mut service = AcquisitionService::new(
        hub,
        devices,
        ChannelConverter::new(Arc::new(table)),
        AlarmEvaluator::default(),
        Arc::clone(&history),
        Arc::clone(&store) as Arc<dyn SampleStore>,
        Arc::clone(&queue),
        Duration::from_secs(1),
    );

    for _ in 0..3 {
        let report = service.run_once().await;
        assert_eq!(report.devices_read, 1);
        assert_eq!(report.conversion_failures, 0);
        assert_eq!(report.alarms_raised, 0);
    }
    assert_eq!(history.recent_window(DEVICE_ID, 10).expect("device").len(), 3);
    assert_eq!(store.samples().expect("samples").len(), 3);
    assert!(queue.is_empty());

    let handle = service.threshold_handle();
    handle
        .update_threshold(DEVICE_ID, "AIN1", 0.0)
        .expect("finite threshold");
    let report = service.run_once().await;
    assert_eq!(report.alarms_raised, 1);
    assert_eq!(service.alarm_state(DEVICE_ID, "AIN1"), AlarmState::Triggered);
    assert_eq!(service.alarm_state(DEVICE_ID, "AIN0"), AlarmState::Normal);

    let event = queue.next().await.expect("queued alarm");
    assert_eq!(event.channel_address, "AIN1");
    assert!(event.temperature > 20.0 && event.temperature < 30.0);
}
