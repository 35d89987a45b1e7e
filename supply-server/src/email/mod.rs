//! Outbound mail
//!
//! [`Notifier`] is what the credential service talks to. [`SesNotifier`]
//! delivers through AWS SES v2; [`LogNotifier`] only records that a mail
//! would have been sent.

use async_trait::async_trait;
use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a password reset token to `to`
    async fn send_password_reset(
        &self,
        to: &str,
        full_name: &str,
        token: &str,
    ) -> Result<(), BoxError>;
}

fn password_reset_body(full_name: &str, token: &str) -> String {
    format!(
        "Hello {full_name},\n\n\
         A password reset was requested for your account.\n\
         Your reset token is: {token}\n\
         It is valid for 1 hour and can be used once.\n\n\
         If you did not request this, ignore this message."
    )
}

/// AWS SES v2 delivery
pub struct SesNotifier {
    ses: SesClient,
    from: String,
}

impl SesNotifier {
    pub fn new(ses: SesClient, from: impl Into<String>) -> Self {
        Self {
            ses,
            from: from.into(),
        }
    }
}

#[async_trait]
impl Notifier for SesNotifier {
    async fn send_password_reset(
        &self,
        to: &str,
        full_name: &str,
        token: &str,
    ) -> Result<(), BoxError> {
        let subject = Content::builder().data("Reset your password").build()?;

        let body = Body::builder()
            .text(
                Content::builder()
                    .data(password_reset_body(full_name, token))
                    .build()?,
            )
            .build();

        let message = Message::builder().subject(subject).body(body).build();

        self.ses
            .send_email()
            .from_email_address(&self.from)
            .destination(Destination::builder().to_addresses(to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await?;

        tracing::info!(to = to, "Password reset mail sent");
        Ok(())
    }
}

/// Development delivery: logs the recipient, never the token
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_password_reset(
        &self,
        to: &str,
        _full_name: &str,
        _token: &str,
    ) -> Result<(), BoxError> {
        tracing::info!(to = to, "Password reset mail (log backend, not delivered)");
        Ok(())
    }
}
