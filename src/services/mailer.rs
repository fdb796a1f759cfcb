//! Mail delivery collaborator.
//!
//! The core only needs `send`; delivery failures surface to the caller as
//! errors and are never retried here.

use std::sync::{Arc, Mutex};

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Writes outgoing mail to the log. Default for local operation where no
/// SMTP relay is configured.
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!(recipient = to, subject, "Outgoing mail: {body}");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Captures mail in memory. Used by the integration tests to read
/// confirmation codes back out.
#[derive(Default)]
pub struct RecordingMailer {
    outbox: Arc<Mutex<Vec<OutgoingMail>>>,
}

impl RecordingMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle onto the outbox, valid after the mailer is moved into
    /// the service stack.
    #[must_use]
    pub fn outbox(&self) -> Arc<Mutex<Vec<OutgoingMail>>> {
        Arc::clone(&self.outbox)
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        self.outbox
            .lock()
            .expect("outbox mutex poisoned")
            .push(OutgoingMail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}
