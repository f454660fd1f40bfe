//! HTTP client for the attendance backend's QR endpoints

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

use crate::backend::model::QrTokenRecord;

/// Non-2xx bodies are surfaced to the operator truncated to this many chars.
const BODY_SNIPPET_MAX_CHARS: usize = 400;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure (timeout, connection refused, DNS). Transient;
    /// the next poll tick retries it without explicit backoff.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status. Not retried automatically.
    #[error("backend returned HTTP {status}: {body}")]
    Backend { status: u16, body: String },

    /// 2xx status but the body was not the JSON shape the backend contract
    /// promises. Treated as a contract violation, not retried automatically.
    #[error("backend response was not valid JSON with the expected fields")]
    MalformedResponse,
}

/// Thin read client over the backend's QR token endpoints.
///
/// No retries, no caching, no credentials of its own: the poll loop owns
/// re-attempts and the regenerate call forwards the operator's bearer token.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: String, timeout_seconds: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// `GET /qr/{company_id}/current` — the token without rotation metadata.
    pub async fn fetch_current(&self, company_id: i64) -> Result<QrTokenRecord, FetchError> {
        self.get_json(&format!("/qr/{}/current", company_id)).await
    }

    /// `GET /qr/{company_id}/version` — the token plus `updated_at`, used by
    /// the polling display to detect manual regeneration.
    pub async fn fetch_version(&self, company_id: i64) -> Result<QrTokenRecord, FetchError> {
        self.get_json(&format!("/qr/{}/version", company_id)).await
    }

    /// `POST /qr/regenerate` — asks the backend to rotate the token now.
    /// Authenticated; the caller's bearer token is forwarded as-is.
    pub async fn regenerate(&self, bearer_token: &str) -> Result<(), FetchError> {
        let url = format!("{}/qr/regenerate", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(bearer_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!("🚫 QR regenerate rejected by backend (HTTP {})", status);
            Err(FetchError::Backend {
                status: status.as_u16(),
                body: truncate_body(&body),
            })
        }
    }

    async fn get_json<T>(&self, endpoint: &str) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_transport_error)?;

        Self::decode_response(response).await
    }

    async fn decode_response<T>(response: Response) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Backend {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        // Read the text first so an HTML error page behind a 200 is reported
        // as a contract violation instead of a transport failure.
        let body = response.text().await.map_err(map_transport_error)?;
        serde_json::from_str(&body).map_err(|_| FetchError::MalformedResponse)
    }
}

/// Map reqwest errors to the fetch taxonomy.
fn map_transport_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Network(format!("request timed out: {}", error))
    } else if error.is_connect() {
        FetchError::Network(format!("connection failed: {}", error))
    } else {
        FetchError::Network(error.to_string())
    }
}

fn truncate_body(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_MAX_CHARS).collect()
}
