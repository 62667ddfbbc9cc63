use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::domain::entities::alarm_event::AlarmEvent;
use crate::domain::ports::notifier::Notifier;

#[derive(Debug, Default)]
struct QueueState {
    events: VecDeque<AlarmEvent>,
    closed: bool,
}

/// Bounded FIFO of pending alarm events.
///
/// `push` never waits: when the queue is full the oldest pending event is
/// dropped to make room.
#[derive(Debug)]
pub struct NotificationQueue {
    capacity: usize,
    state: Mutex<QueueState>,
    ready: Notify,
    dropped: AtomicUsize,
}

impl NotificationQueue {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(QueueState::default()),
            ready: Notify::new(),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Enqueue an event. Returns `false` if the queue has been closed.
    pub fn push(&self, event: AlarmEvent) -> bool {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.closed {
                tracing::warn!(
                    device = %event.device_id,
                    channel = %event.channel_address,
                    "Notification queue closed, alarm not dispatched"
                );
                return false;
            }
            if state.events.len() >= self.capacity {
                if let Some(old) = state.events.pop_front() {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        device = %old.device_id,
                        channel = %old.channel_address,
                        capacity = self.capacity,
                        "Notification queue full, dropping oldest alarm"
                    );
                }
            }
            state.events.push_back(event);
        }
        self.ready.notify_one();
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events discarded because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Refuse further events. Already queued events can still be taken.
    pub fn close(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed = true;
        self.ready.notify_one();
    }

    /// Next event in FIFO order, or `None` once the queue is closed and empty.
    pub async fn next(&self) -> Option<AlarmEvent> {
        loop {
            {
                let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(event) = state.events.pop_front() {
                    return Some(event);
                }
                if state.closed {
                    return None;
                }
            }
            self.ready.notified().await;
        }
    }

    fn discard_all(&self) -> usize {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let remaining = state.events.len();
        state.events.clear();
        remaining
    }
}

#[derive(Debug, Default)]
struct DispatchCounters {
    delivered: AtomicUsize,
    failed: AtomicUsize,
}

/// Outcome of draining the dispatcher at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
    pub dropped: usize,
    pub abandoned: usize,
}

/// Delivers queued alarm events to a notifier from a dedicated task.
///
/// Failed deliveries are logged and not retried.
pub struct NotificationDispatcher {
    queue: Arc<NotificationQueue>,
    counters: Arc<DispatchCounters>,
    worker: Option<JoinHandle<()>>,
}

impl NotificationDispatcher {
    /// Start the worker on the current tokio runtime.
    #[must_use]
    pub fn spawn(notifier: Arc<dyn Notifier>, capacity: usize) -> Self {
        let queue = Arc::new(NotificationQueue::new(capacity));
        let counters = Arc::new(DispatchCounters::default());

        let worker = tokio::spawn(deliver(
            Arc::clone(&queue),
            notifier,
            Arc::clone(&counters),
        ));

        Self {
            queue,
            counters,
            worker: Some(worker),
        }
    }

    /// Producer side of the queue, handed to the acquisition cycle.
    #[must_use]
    pub fn queue(&self) -> Arc<NotificationQueue> {
        Arc::clone(&self.queue)
    }

    /// Close the queue and wait up to `deadline` for pending events to be
    /// delivered. Whatever is still queued after that is abandoned.
    pub async fn shutdown(&mut self, deadline: Duration) -> DispatchReport {
        self.queue.close();

        let mut abandoned = 0;
        if let Some(mut worker) = self.worker.take() {
            match tokio::time::timeout(deadline, &mut worker).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Notification worker failed"),
                Err(_) => {
                    worker.abort();
                    abandoned = self.queue.discard_all();
                    tracing::warn!(
                        abandoned,
                        deadline_ms = deadline.as_millis(),
                        "Notification drain deadline reached, abandoning pending alarms"
                    );
                }
            }
        }

        DispatchReport {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.queue.dropped(),
            abandoned,
        }
    }
}

impl Drop for NotificationDispatcher {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

async fn deliver(
    queue: Arc<NotificationQueue>,
    notifier: Arc<dyn Notifier>,
    counters: Arc<DispatchCounters>,
) {
    while let Some(event) = queue.next().await {
        match notifier.notify(&event).await {
            Ok(()) => {
                counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    device = %event.device_id,
                    channel = %event.channel_address,
                    kind = %e.kind(),
                    "Alarm notification failed: {e}"
                );
            }
        }
    }
    tracing::debug!("Notification worker stopped");
}
