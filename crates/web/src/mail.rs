//! Outbound mail.
//!
//! The handlers only need two messages delivered; how they are rendered and
//! sent is up to the [`Mailer`] implementation.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("can't deliver mail to {recipient}: {reason}")]
    Delivery { recipient: String, reason: String },
}

impl MailError {
    pub fn delivery<R: ToString, S: ToString>(recipient: R, reason: S) -> Self {
        Self::Delivery { recipient: recipient.to_string(), reason: reason.to_string() }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_activation(&self, email: &str, code: u32) -> Result<(), MailError>;

    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), MailError>;
}

/// Writes every message to the log instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_activation(&self, email: &str, code: u32) -> Result<(), MailError> {
        info!(%email, code, "activation code mail");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), MailError> {
        info!(%email, %token, "password reset mail");
        Ok(())
    }
}
