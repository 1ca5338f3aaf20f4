//! Error types for cert-courier.

use std::time::Duration;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Fulfillment error: {0}")]
    Fulfillment(#[from] FulfillmentError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to decode credentials: {0}")]
    CredentialDecode(String),
}

/// Submission store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Store API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid store response: {0}")]
    InvalidResponse(String),
}

/// Certificate delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum FulfillmentError {
    #[error("Invalid recipient address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    MessageBuild(String),

    #[error("SMTP send failed: {0}")]
    Smtp(String),

    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
