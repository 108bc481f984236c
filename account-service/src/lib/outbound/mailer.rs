use async_trait::async_trait;

use crate::account::errors::MailerError;
use crate::account::ports::Mailer;

/// Mailer that writes messages to the log instead of sending them.
///
/// Stands in wherever no delivery provider is wired up. The raw tokens
/// land in the log, so this adapter is only for local environments.
#[derive(Debug, Default)]
pub struct LoggingMailer;

impl LoggingMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for LoggingMailer {
    async fn send_email_verification(&self, email: &str, token: &str) -> Result<(), MailerError> {
        tracing::info!(
            email = %email,
            token = %token,
            "Email verification requested, no delivery provider configured"
        );
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), MailerError> {
        tracing::info!(
            email = %email,
            token = %token,
            "Password reset requested, no delivery provider configured"
        );
        Ok(())
    }
}
