//! Mail transport that writes messages to the log

use async_trait::async_trait;
use tracing::info;

use crate::domain::{EmailMessage, EmailSender};

/// Logs every message instead of delivering it. Used when no SMTP relay is
/// configured; always reports success.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl EmailSender for LogMailer {
    async fn send(&self, message: EmailMessage) -> bool {
        info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            body_len = message.html_body.len(),
            "Email dispatched"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_accepts_messages() {
        let mailer = LogMailer::new("noreply@warehouse.local");
        let sent = mailer
            .send(EmailMessage {
                to: "a@x.com".into(),
                subject: "Hello".into(),
                html_body: "<p>hi</p>".into(),
            })
            .await;
        assert!(sent);
    }
}
