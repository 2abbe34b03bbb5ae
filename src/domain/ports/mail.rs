//! Outbound mail port

use async_trait::async_trait;

/// A single HTML message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Fire-and-forget mail dispatch. Returns whether the transport accepted the
/// message; delivery failures are never raised to the caller.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> bool;
}
