//! Service configuration, built from environment variables at startup.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default HTTP listen port.
const DEFAULT_PORT: u16 = 5000;

/// Default sheet poll interval in seconds.
const DEFAULT_POLL_SECS: u64 = 5;

/// Decoded Google authorized-user credential, as found inside the
/// base64-encoded `GOOGLE_CREDENTIALS_JSON_BASE64` variable.
#[derive(Debug, Deserialize)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// SMTP settings for certificate delivery.
#[derive(Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

/// Full service configuration.
#[derive(Debug)]
pub struct AppConfig {
    /// Spreadsheet identifier to watch.
    pub sheet_id: String,
    pub credentials: GoogleCredentials,
    pub smtp: SmtpConfig,
    /// HTTP listen port.
    pub port: u16,
    /// Delay between watch ticks.
    pub poll_interval: Duration,
}

impl AppConfig {
    /// Build config from environment variables.
    ///
    /// Required: `SHEET_ID`, `GOOGLE_CREDENTIALS_JSON_BASE64`, `EMAIL_ADDRESS`,
    /// `EMAIL_PASSWORD`. Missing values are a startup failure; the watch loop
    /// must never start without them.
    pub fn from_env() -> Result<Self, ConfigError> {
        let sheet_id = required_env("SHEET_ID")?;
        let encoded_creds = required_env("GOOGLE_CREDENTIALS_JSON_BASE64")?;
        let username = required_env("EMAIL_ADDRESS")?;
        let password = required_env("EMAIL_PASSWORD")?;

        let credentials = decode_credentials(&encoded_creds)?;

        let smtp_host =
            std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string());
        let smtp_port: u16 = parse_env("SMTP_PORT", 587)?;
        let port: u16 = parse_env("PORT", DEFAULT_PORT)?;
        let poll_secs: u64 = parse_env("CHECK_INTERVAL_SECS", DEFAULT_POLL_SECS)?;

        Ok(Self {
            sheet_id,
            credentials,
            smtp: SmtpConfig {
                host: smtp_host,
                port: smtp_port,
                from_address: username.clone(),
                username,
                password: SecretString::from(password),
            },
            port,
            poll_interval: Duration::from_secs(poll_secs),
        })
    }
}

fn required_env(key: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{e}"),
        }),
        Err(_) => Ok(default),
    }
}

/// Decode the base64-wrapped credential JSON.
pub fn decode_credentials(encoded: &str) -> Result<GoogleCredentials, ConfigError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| ConfigError::CredentialDecode(format!("invalid base64: {e}")))?;
    let json = String::from_utf8(bytes)
        .map_err(|e| ConfigError::CredentialDecode(format!("invalid UTF-8: {e}")))?;
    serde_json::from_str(&json)
        .map_err(|e| ConfigError::CredentialDecode(format!("invalid JSON: {e}")))
}
