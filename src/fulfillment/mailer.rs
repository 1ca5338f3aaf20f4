//! SMTP certificate delivery via lettre.

use async_trait::async_trait;
use lettre::message::MultiPart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::info;

use crate::config::SmtpConfig;
use crate::error::FulfillmentError;
use crate::fulfillment::{Fulfillment, certificate};

/// Sends the rendered certificate as a plain + HTML multipart email over a
/// STARTTLS SMTP relay.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn build_message(
        &self,
        email: &str,
        full_name: &str,
        course: &str,
    ) -> Result<Message, FulfillmentError> {
        let from = self.config.from_address.parse().map_err(|e| {
            FulfillmentError::InvalidAddress {
                address: self.config.from_address.clone(),
                reason: format!("{e}"),
            }
        })?;
        let to = email.parse().map_err(|e| FulfillmentError::InvalidAddress {
            address: email.to_string(),
            reason: format!("{e}"),
        })?;

        let plain = certificate::plain_body(full_name, course);
        let html = certificate::render_html(full_name, course, &certificate::issue_date());

        Message::builder()
            .from(from)
            .to(to)
            .subject(certificate::SUBJECT)
            .multipart(MultiPart::alternative_plain_html(plain, html))
            .map_err(|e| FulfillmentError::MessageBuild(e.to_string()))
    }

    fn transport(&self) -> Result<SmtpTransport, FulfillmentError> {
        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.expose_secret().to_string(),
        );
        Ok(SmtpTransport::starttls_relay(&self.config.host)
            .map_err(|e| FulfillmentError::Smtp(format!("relay setup failed: {e}")))?
            .port(self.config.port)
            .credentials(creds)
            .build())
    }
}

#[async_trait]
impl Fulfillment for SmtpMailer {
    async fn send(
        &self,
        email: &str,
        full_name: &str,
        course: &str,
    ) -> Result<(), FulfillmentError> {
        let message = self.build_message(email, full_name, course)?;
        let transport = self.transport()?;

        // lettre's SmtpTransport is blocking.
        let result = tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| FulfillmentError::Smtp(format!("send task failed: {e}")))?;

        result.map_err(|e| FulfillmentError::Smtp(e.to_string()))?;
        info!(to = %email, course = %course, "Certificate email sent");
        Ok(())
    }
}
