//! Certificate fulfillment — rendering + delivery.

pub mod certificate;
pub mod mailer;

use async_trait::async_trait;

use crate::error::FulfillmentError;

pub use mailer::SmtpMailer;

/// Generates and delivers a completion certificate to one submitter.
#[async_trait]
pub trait Fulfillment: Send + Sync {
    async fn send(
        &self,
        email: &str,
        full_name: &str,
        course: &str,
    ) -> Result<(), FulfillmentError>;
}
