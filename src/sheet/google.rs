//! Google Sheets v4 REST adapter.
//!
//! Reads the whole sheet with `values.get` and writes single cells with
//! `values.update`. Authenticates with an authorized-user credential via the
//! OAuth2 refresh-token grant; access tokens are cached until shortly before
//! they expire.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::GoogleCredentials;
use crate::error::StoreError;
use crate::sheet::store::SubmissionStore;

/// Columns A through I — timestamp up to processed-at.
const READ_RANGE: &str = "A:I";

/// Per-request HTTP timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Refresh the access token this long before its reported expiry.
const TOKEN_SLACK_SECS: i64 = 60;

const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Submission store backed by the Google Sheets REST API.
pub struct GoogleSheetsStore {
    client: reqwest::Client,
    sheet_id: String,
    credentials: GoogleCredentials,
    api_base: String,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleSheetsStore {
    pub fn new(sheet_id: String, credentials: GoogleCredentials) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("HTTP client construction failed");
        Self {
            client,
            sheet_id,
            credentials,
            api_base: DEFAULT_API_BASE.to_string(),
            token: Mutex::new(None),
        }
    }

    /// Point the adapter at a different API base (tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/{}/values/{range}", self.api_base, self.sheet_id)
    }

    /// Return a valid bearer token, exchanging the refresh token if the
    /// cached one is missing or about to expire.
    async fn bearer_token(&self) -> Result<String, StoreError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Refreshing Sheets access token");
        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.expose_secret()),
                ("refresh_token", self.credentials.refresh_token.expose_secret()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| StoreError::Auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: i64,
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Auth(format!("invalid token response: {e}")))?;

        let expires_at =
            Utc::now() + chrono::Duration::seconds((token.expires_in - TOKEN_SLACK_SECS).max(0));
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at,
        });
        Ok(token.access_token)
    }
}

#[async_trait]
impl SubmissionStore for GoogleSheetsStore {
    async fn list_rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let token = self.bearer_token().await?;

        let response = self
            .client
            .get(self.values_url(READ_RANGE))
            .query(&[("majorDimension", "ROWS")])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, body });
        }

        #[derive(Deserialize)]
        struct ValuesResponse {
            #[serde(default)]
            values: Vec<Vec<String>>,
        }

        let values: ValuesResponse = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        Ok(values.values)
    }

    async fn update_cell(&self, row: usize, col: usize, value: &str) -> Result<(), StoreError> {
        let token = self.bearer_token().await?;
        let cell = format!("{}{row}", column_letter(col));

        let body = serde_json::json!({
            "range": cell,
            "majorDimension": "ROWS",
            "values": [[value]],
        });

        let response = self
            .client
            .put(self.values_url(&cell))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, body });
        }
        Ok(())
    }
}

/// 1-based column index to A1 letters (1 → A, 27 → AA).
fn column_letter(mut col: usize) -> String {
    let mut letters = String::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.insert(0, (b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    letters
}
