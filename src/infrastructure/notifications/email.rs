use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::application::config::EmailConfig;
use crate::domain::entities::alarm_event::AlarmEvent;
use crate::domain::ports::notifier::{NotificationError, Notifier};

/// Sends a plain-text email per alarm through an SMTP relay (STARTTLS).
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    #[must_use]
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, event: &AlarmEvent) -> Result<Message, NotificationError> {
        if self.config.recipients.is_empty() {
            return Err(NotificationError::ChannelUnavailable(
                "email has no recipients".to_string(),
            ));
        }

        let from: Mailbox = self
            .config
            .from
            .parse()
            .map_err(|e| NotificationError::SendFailed(format!("invalid sender address: {e}")))?;

        let mut builder = Message::builder()
            .from(from)
            .subject(format!("[thermolog] {}", event.title()))
            .header(ContentType::TEXT_PLAIN);

        for recipient in &self.config.recipients {
            let to: Mailbox = recipient.parse().map_err(|e| {
                NotificationError::SendFailed(format!("invalid recipient {recipient}: {e}"))
            })?;
            builder = builder.to(to);
        }

        builder
            .body(render_body(event))
            .map_err(|e| NotificationError::SendFailed(format!("email build failed: {e}")))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotificationError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(
            &self.config.smtp_host,
        )
        .map_err(|e| NotificationError::ChannelUnavailable(format!("SMTP relay: {e}")))?
        .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(builder.build())
    }
}

fn render_body(event: &AlarmEvent) -> String {
    format!(
        "Device: {}\nChannel: {} ({})\nTemperature: {:.2} °C\nThreshold: {:.2} °C\nTime: {}\n",
        event.device_id,
        event.channel_label,
        event.channel_address,
        event.temperature,
        event.threshold,
        event.timestamp.to_rfc3339(),
    )
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, event: &AlarmEvent) -> Result<(), NotificationError> {
        let message = self.build_message(event)?;
        let mailer = self.transport()?;

        mailer
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP send failed: {e}")))?;

        tracing::info!(
            recipients = self.config.recipients.len(),
            device = %event.device_id,
            channel = %event.channel_address,
            "alarm email sent"
        );
        Ok(())
    }
}
