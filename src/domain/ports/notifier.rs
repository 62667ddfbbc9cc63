use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::alarm_event::AlarmEvent;
use crate::domain::error::ErrorKind;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("failed to send notification: {0}")]
    SendFailed(String),
    #[error("notification channel unavailable: {0}")]
    ChannelUnavailable(String),
}

impl NotificationError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::NotificationFailure
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver an alarm event through this transport.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if the notification fails to send
    /// or the channel is unavailable.
    async fn notify(&self, event: &AlarmEvent) -> Result<(), NotificationError>;
}
