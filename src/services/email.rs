//! Outbound email.
//!
//! Activation emails go out through SMTP via lettre; the transport is behind
//! a trait so tests and local development run against the mock.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::error::AppError;

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_activation_email(&self, to: &str, code: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SmtpEmailService {
    mailer: SmtpTransport,
    sender: String,
}

impl SmtpEmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let mailer = SmtpTransport::starttls_relay(&config.host)
            .map_err(|e| AppError::EmailError(e.to_string()))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "email service initialized");

        Ok(Self {
            mailer,
            sender: config.sender.clone(),
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailService {
    async fn send_activation_email(&self, to: &str, code: &str) -> Result<(), AppError> {
        let html_body = format!(
            r###"<html>
  <body style="font-family: Arial, sans-serif;">
    <h2>Activate your Health Monitoring account</h2>
    <p>Enter the following code on the activation page to finish creating your account:</p>
    <p style="font-size: 28px; letter-spacing: 6px; font-weight: bold;">{code}</p>
    <p style="color: #666; font-size: 12px;">
      This code expires in 10 minutes. If you didn't register, please ignore this email.
    </p>
  </body>
</html>
"###
        );
        let plain_body = format!(
            "Activate your Health Monitoring account\n\n\
             Enter the following code on the activation page: {code}\n\n\
             This code expires in 10 minutes. If you didn't register, please ignore this email."
        );

        let email = Message::builder()
            .from(self
                .sender
                .parse()
                .map_err(|e: lettre::address::AddressError| AppError::EmailError(e.to_string()))?)
            .to(to
                .parse()
                .map_err(|e: lettre::address::AddressError| AppError::EmailError(e.to_string()))?)
            .subject("Activate your Health Monitoring account")
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .map_err(|e| AppError::EmailError(e.to_string()))?;

        // SMTP send is blocking; keep it off the async runtime.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to, "activation email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to, "failed to send activation email");
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

/// Sender for tests and for dev setups without SMTP. Logs instead of
/// delivering.
#[derive(Clone, Default)]
pub struct MockEmailService;

#[async_trait]
impl EmailSender for MockEmailService {
    async fn send_activation_email(&self, to: &str, code: &str) -> Result<(), AppError> {
        tracing::debug!(to = %to, code = %code, "mock email sender invoked");
        Ok(())
    }
}
