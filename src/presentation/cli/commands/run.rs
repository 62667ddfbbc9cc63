use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;

use crate::application::config::{expand_path, AppConfig, StorageBackend};
use crate::application::services::{
    prepare_devices, AcquisitionService, NotificationDispatcher, Scheduler,
};
use crate::domain::entities::time_series::SessionHistory;
use crate::domain::ports::hardware::DeviceHub;
use crate::domain::ports::notifier::Notifier;
use crate::domain::ports::store::SampleStore;
use crate::domain::services::alarm_evaluator::AlarmEvaluator;
use crate::domain::services::converter::ChannelConverter;
use crate::domain::value_objects::calibration::CalibrationTable;
use crate::infrastructure::hardware::simulated::SimulatedHub;
use crate::infrastructure::notifications::composite::CompositeNotifier;
use crate::infrastructure::notifications::email::EmailNotifier;
use crate::infrastructure::notifications::log_file::LogFileNotifier;
use crate::infrastructure::notifications::terminal::TerminalNotifier;
use crate::infrastructure::notifications::webhook::WebhookNotifier;
use crate::infrastructure::persistence::csv_file::CsvFileStore;
use crate::infrastructure::persistence::export::{export_to_folder, ExportFormat};
use crate::infrastructure::persistence::in_memory_store::InMemoryStore;
use crate::infrastructure::persistence::sqlite_store::SqliteStore;
use crate::presentation::cli::commands::calibration::load_calibration;
use crate::presentation::cli::formatters::status_fmt::{
    colorize_state, print_banner, print_section_header,
};
use crate::presentation::cli::formatters::table_fmt::format_history_table;

/// Open the sample store selected by `[storage] backend`.
///
/// # Errors
///
/// Returns an error if the SQLite database cannot be opened.
pub fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn SampleStore>> {
    let storage = &config.storage;
    let store: Arc<dyn SampleStore> = match storage.backend {
        StorageBackend::Csv => Arc::new(CsvFileStore::new(
            expand_path(&storage.save_folder),
            storage.file_prefix.clone(),
        )),
        StorageBackend::Sqlite => Arc::new(
            SqliteStore::new(&storage.database_path)
                .context("Failed to open sample database")?,
        ),
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
    };
    Ok(store)
}

/// Every notification channel enabled in `[notifications]`.
///
/// # Errors
///
/// Returns an error if the webhook HTTP client cannot be built.
pub fn build_notifier(config: &AppConfig) -> anyhow::Result<CompositeNotifier> {
    let settings = &config.notifications;
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

    if settings.terminal {
        notifiers.push(Box::new(TerminalNotifier::new()));
    }
    if settings.log_file {
        let folder = expand_path(&config.storage.log_folder);
        notifiers.push(Box::new(LogFileNotifier::in_folder(&folder)));
    }
    if let Some(url) = &settings.webhook_url {
        let webhook = WebhookNotifier::new(url.clone()).context("Failed to set up webhook")?;
        notifiers.push(Box::new(webhook));
    }
    if let Some(email) = &settings.email {
        notifiers.push(Box::new(EmailNotifier::new(email.clone())));
    }

    if notifiers.is_empty() {
        tracing::warn!("No notification channel enabled, alarms are only logged");
    }
    Ok(CompositeNotifier::new(notifiers))
}

/// Prepare the hardware and wire the acquisition pipeline.
///
/// # Errors
///
/// Returns an error if a configured device or channel does not match the
/// hardware, or if the hardware rejects its setup.
pub fn build_scheduler(
    config: &AppConfig,
    table: CalibrationTable,
    hub: Arc<dyn DeviceHub>,
    store: Arc<dyn SampleStore>,
    notifier: Arc<dyn Notifier>,
) -> anyhow::Result<Scheduler> {
    let devices = prepare_devices(hub.as_ref(), config.device_entities())
        .context("Failed to prepare acquisition devices")?;

    let history = Arc::new(SessionHistory::new(&devices, config.general.history_limit));
    let dispatcher =
        NotificationDispatcher::spawn(notifier, config.notifications.queue_capacity);

    let service = AcquisitionService::new(
        hub,
        devices,
        ChannelConverter::new(Arc::new(table)),
        AlarmEvaluator::new(config.alarm_policy()),
        history,
        store,
        dispatcher.queue(),
        config.read_timeout(),
    );

    Ok(Scheduler::new(
        service,
        dispatcher,
        config.sample_interval(),
        config.shutdown_timeout(),
    ))
}

/// Resistance the simulated sensors oscillate around: the middle of the curve.
fn nominal_resistance(table: &CalibrationTable) -> f64 {
    let (min, max) = table.domain();
    if min > 0.0 {
        (min * max).sqrt()
    } else {
        (min + max) / 2.0
    }
}

/// Acquire until Ctrl+C, then stop cleanly and optionally export the session.
///
/// # Errors
///
/// Returns an error if calibration, storage, notifications or device setup
/// fail at startup.
pub async fn run_acquisition(
    config: &AppConfig,
    export: Option<ExportFormat>,
) -> anyhow::Result<()> {
    let table = load_calibration(config)?;
    let hub: Arc<dyn DeviceHub> = Arc::new(SimulatedHub::new(
        &config.device_entities(),
        nominal_resistance(&table),
    ));
    tracing::warn!("No hardware driver linked, using the simulated device hub");

    let store = open_store(config)?;
    let notifier: Arc<dyn Notifier> = Arc::new(build_notifier(config)?);
    let mut scheduler = build_scheduler(config, table, hub, store, notifier)?;
    let history = scheduler.history();

    print_banner("thermolog: thermistor acquisition");
    scheduler.start().context("Failed to start acquisition")?;
    println!(
        "  {} every {} s, Ctrl+C to stop",
        colorize_state(scheduler.state()),
        config.general.sample_interval_secs
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    tracing::info!("Shutdown signal received");
    println!("\nStopping thermolog...");

    let report = scheduler.stop().await;

    println!();
    print_section_header("Session");
    println!("{}", format_history_table(&history, config.general.max_display_points));
    println!();
    println!(
        "  {} cycles, {} alarm(s) delivered, {} failed, {} dropped, {} abandoned",
        report.cycles,
        report.notifications.delivered,
        report.notifications.failed,
        report.notifications.dropped,
        report.notifications.abandoned
    );
    if !report.flushed {
        println!("  {}", "sample store was not fully flushed".yellow());
    }

    let format = export.or(config.storage.export_on_stop.then_some(ExportFormat::Csv));
    if let Some(format) = format {
        let folder = expand_path(&config.storage.save_folder);
        let path = export_to_folder(&history, &folder, &config.storage.file_prefix, format)
            .context("Failed to export session")?;
        println!("  Session exported to {}", path.display());
    }

    Ok(())
}
