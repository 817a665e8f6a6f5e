//! Transactional email.
//!
//! `Mailer` is the contract the finance workflows depend on. `EmailService`
//! delivers over SMTP with `lettre`; `LogMailer` only traces, for development
//! and tests. Callers treat delivery as best effort.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::EmailConfig;

/// Email service errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    BuildError(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    SendError(String),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

impl EmailError {
    /// Returns the error code for logs.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BuildError(_) => "EMAIL_BUILD_ERROR",
            Self::SendError(_) => "EMAIL_SEND_ERROR",
            Self::InvalidAddress(_) => "EMAIL_INVALID_ADDRESS",
        }
    }
}

/// Templates the finance workflows send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    /// Instructor submitted a payout request.
    PayoutRequested,
    /// Admin completed a payout.
    PayoutProcessed,
    /// Payout failed or was reversed.
    PayoutFailed,
    /// Instructor cancelled a pending payout.
    PayoutCancelled,
    /// Student received a refund.
    RefundProcessed,
    /// One-time verification code.
    OneTimeCode,
}

/// A message addressed to one recipient.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Template to render.
    pub template: EmailTemplate,
    /// Values substituted into the template.
    pub template_data: Value,
}

impl EmailMessage {
    /// Renders the plain-text body.
    #[must_use]
    pub fn render_body(&self) -> String {
        let field = |key: &str| {
            self.template_data
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let name = field("name");
        let greeting = if name.is_empty() {
            "Hi,".to_string()
        } else {
            format!("Hi {name},")
        };
        let line = match self.template {
            EmailTemplate::PayoutRequested => format!(
                "We received your payout request of {}. We will let you know once it is processed.",
                field("amount")
            ),
            EmailTemplate::PayoutProcessed => format!(
                "Your payout of {} has been sent. Reference: {}.",
                field("amount"),
                field("gatewayId")
            ),
            EmailTemplate::PayoutFailed => format!(
                "Your payout of {} could not be completed: {}. The amount is back in your available balance.",
                field("amount"),
                field("reason")
            ),
            EmailTemplate::PayoutCancelled => format!(
                "Your payout request of {} was cancelled and the amount is back in your available balance.",
                field("amount")
            ),
            EmailTemplate::RefundProcessed => format!(
                "A refund of {} has been issued for your purchase. Reason: {}.",
                field("amount"),
                field("reason")
            ),
            EmailTemplate::OneTimeCode => format!(
                "Your verification code is {}. It expires in {} minutes.",
                field("code"),
                field("expiresInMinutes")
            ),
        };
        format!("{greeting}\n\n{line}\n\nThe Edumart Team")
    }
}

/// Outbound email contract.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one message.
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}

/// SMTP mailer backed by `lettre`.
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailService {
    /// Creates a new email service.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let transport = if config.smtp_username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| EmailError::SendError(e.to_string()))?
                .port(config.smtp_port)
                .credentials(Credentials::new(
                    config.smtp_username.clone(),
                    config.smtp_password.clone(),
                ))
                .build()
        };
        Ok(Self { config, transport })
    }

    fn build(&self, message: &EmailMessage) -> Result<Message, EmailError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);
        Message::builder()
            .from(
                from.parse()
                    .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.render_body())
            .map_err(|e| EmailError::BuildError(e.to_string()))
    }
}

#[async_trait]
impl Mailer for EmailService {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let email = self.build(&message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;
        tracing::debug!(to = %message.to, template = ?message.template, "email sent");
        Ok(())
    }
}

/// Mailer that only logs. Used when `email.enabled = false`.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            template = ?message.template,
            "email delivery disabled, message logged"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(template: EmailTemplate, data: Value) -> EmailMessage {
        EmailMessage {
            to: "instructor@example.com".to_string(),
            subject: "Payout update".to_string(),
            template,
            template_data: data,
        }
    }

    #[test]
    fn test_render_payout_processed() {
        let body = message(
            EmailTemplate::PayoutProcessed,
            json!({"name": "Asha", "amount": "₹1,000.00", "gatewayId": "PO-20240101-ABCDEF12"}),
        )
        .render_body();
        assert!(body.starts_with("Hi Asha,"));
        assert!(body.contains("₹1,000.00"));
        assert!(body.contains("PO-20240101-ABCDEF12"));
    }

    #[test]
    fn test_render_tolerates_missing_fields() {
        let body = message(EmailTemplate::RefundProcessed, json!({})).render_body();
        assert!(body.starts_with("Hi,"));
        assert!(body.contains("refund"));
    }

    #[test]
    fn test_invalid_recipient_rejected() {
        let service = EmailService::new(EmailConfig::default()).unwrap();
        let mut msg = message(EmailTemplate::PayoutRequested, json!({}));
        msg.to = "not an address".to_string();
        assert!(matches!(
            service.build(&msg),
            Err(EmailError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_log_mailer_never_fails() {
        let mailer = LogMailer;
        assert!(
            mailer
                .send(message(EmailTemplate::PayoutFailed, json!({"reason": "bounced"})))
                .await
                .is_ok()
        );
    }
}
