//! Mail transports

mod log_mailer;

pub use log_mailer::LogMailer;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::domain::{EmailMessage, EmailSender};

    /// Keeps every message and answers with a fixed dispatch result.
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<EmailMessage>>,
        accept: bool,
    }

    impl RecordingMailer {
        pub fn accepting() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                accept: true,
            }
        }

        pub fn rejecting() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                accept: false,
            }
        }

        pub fn messages(&self) -> Vec<EmailMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EmailSender for RecordingMailer {
        async fn send(&self, message: EmailMessage) -> bool {
            self.sent.lock().unwrap().push(message);
            self.accept
        }
    }
}
