//! Outgoing mail. Only a logging sender ships; a real transport plugs in
//! behind [`Mailer`].

use std::sync::Mutex;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// # Errors
    ///
    /// Returns `MailError::Delivery` when the message cannot be handed off.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Logs messages instead of sending them.
///
/// Bodies carry one-time codes, so they only appear at debug level.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        tracing::info!(to, subject, body_len = body.len(), "mail (log only)");
        tracing::debug!(to, body, "mail body");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Keeps messages in memory so tests can read them back.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl MemoryMailer {
    #[must_use]
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        self.sent
            .lock()
            .map_err(|e| MailError::Delivery(e.to_string()))?
            .push(SentMail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}
