use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::acquisition::{AcquisitionService, ThresholdHandle};
use super::dispatcher::{DispatchReport, NotificationDispatcher};
use crate::domain::entities::time_series::SessionHistory;
use crate::domain::error::ErrorKind;
use crate::domain::ports::store::SampleStore;
use crate::domain::value_objects::scheduler_state::SchedulerState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("scheduler cannot start from state {0}")]
    NotIdle(SchedulerState),
}

impl SchedulerError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::AcquisitionFailure
    }
}

/// What happened during shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopReport {
    pub cycles: u64,
    pub flushed: bool,
    pub notifications: DispatchReport,
}

/// Drives acquisition cycles at a fixed period until stopped.
///
/// Cycles never overlap. A tick that falls inside a running cycle is skipped
/// and logged.
pub struct Scheduler {
    service: Option<AcquisitionService>,
    task: Option<JoinHandle<AcquisitionService>>,
    dispatcher: NotificationDispatcher,
    history: Arc<SessionHistory>,
    store: Arc<dyn SampleStore>,
    thresholds: ThresholdHandle,
    period: Duration,
    drain_deadline: Duration,
    cancel: CancellationToken,
    state: watch::Sender<SchedulerState>,
    last_report: Option<StopReport>,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        service: AcquisitionService,
        dispatcher: NotificationDispatcher,
        period: Duration,
        drain_deadline: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            history: service.history(),
            store: service.store(),
            thresholds: service.threshold_handle(),
            service: Some(service),
            task: None,
            dispatcher,
            period,
            drain_deadline,
            cancel: CancellationToken::new(),
            state,
            last_report: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn history(&self) -> Arc<SessionHistory> {
        Arc::clone(&self.history)
    }

    #[must_use]
    pub fn threshold_handle(&self) -> ThresholdHandle {
        self.thresholds.clone()
    }

    /// Begin periodic acquisition. The first cycle runs immediately.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::NotIdle` unless the scheduler is `Idle`.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        let current = self.state();
        if !current.can_transition_to(SchedulerState::Running) {
            return Err(SchedulerError::NotIdle(current));
        }
        let Some(service) = self.service.take() else {
            return Err(SchedulerError::NotIdle(current));
        };

        tracing::info!(period_ms = self.period.as_millis(), "Acquisition started");
        self.task = Some(tokio::spawn(run_loop(
            service,
            self.period,
            self.cancel.clone(),
        )));
        self.set_state(SchedulerState::Running);
        Ok(())
    }

    /// Stop acquisition and release resources.
    ///
    /// Waits for an in-flight cycle, flushes the store, then drains pending
    /// notifications until the drain deadline. Calling it again, or on a
    /// scheduler that never started, is harmless.
    pub async fn stop(&mut self) -> StopReport {
        match self.state() {
            SchedulerState::Stopped | SchedulerState::Stopping => {
                return self.last_report.unwrap_or_default();
            }
            SchedulerState::Running => self.set_state(SchedulerState::Stopping),
            SchedulerState::Idle => {}
        }

        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(service) => self.service = Some(service),
                Err(e) => tracing::error!(error = %e, "Acquisition task failed"),
            }
        }

        let cycles = self.service.as_ref().map_or(0, AcquisitionService::cycles);
        if let Some(service) = &self.service {
            service.close();
        }

        let flushed = match self.store.flush() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(kind = %e.kind(), "Failed to flush sample store: {e}");
                false
            }
        };

        let notifications = self.dispatcher.shutdown(self.drain_deadline).await;

        let report = StopReport {
            cycles,
            flushed,
            notifications,
        };
        self.last_report = Some(report);
        self.set_state(SchedulerState::Stopped);
        tracing::info!(
            cycles,
            delivered = notifications.delivered,
            abandoned = notifications.abandoned,
            "Acquisition stopped"
        );
        report
    }

    fn set_state(&self, next: SchedulerState) {
        self.state.send_replace(next);
    }
}

async fn run_loop(
    mut service: AcquisitionService,
    period: Duration,
    cancel: CancellationToken,
) -> AcquisitionService {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("Acquisition loop cancelled");
                break;
            }
            _ = interval.tick() => {
                let started = Instant::now();
                let report = service.run_once().await;
                let elapsed = started.elapsed();
                tracing::debug!(
                    devices_read = report.devices_read,
                    devices_failed = report.devices_failed,
                    conversion_failures = report.conversion_failures,
                    alarms = report.alarms_raised,
                    elapsed_ms = elapsed.as_millis(),
                    "Cycle complete"
                );
                if elapsed > period {
                    tracing::warn!(
                        elapsed_ms = elapsed.as_millis(),
                        period_ms = period.as_millis(),
                        "Cycle overran its period, skipping missed tick"
                    );
                }
            }
        }
    }

    service
}
