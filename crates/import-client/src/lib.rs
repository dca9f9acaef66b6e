//! Submission of sealed bundles to the GuardSpine import endpoint.
//!
//! [`ImportClient::submit`] never fails: HTTP errors, timeouts and transport
//! failures come back as a [`SubmitResponse`] with `ok == false`.

use std::time::Duration;

use evidence_core::ImportBundle;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const IMPORT_PATH: &str = "/api/v1/bundles/import";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Errors building a client. Submission itself reports through
/// [`SubmitResponse`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ImportClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ImportClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// `GUARDSPINE_API_URL`, `GUARDSPINE_API_TOKEN`, `GUARDSPINE_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let mut config = Self::new(
            std::env::var("GUARDSPINE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        );
        config.token = std::env::var("GUARDSPINE_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        if let Some(ms) = std::env::var("GUARDSPINE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.timeout_ms = ms;
        }
        config
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), IMPORT_PATH)
    }
}

/// Outcome of one submission.
///
/// `status` is the HTTP status, or 0 when no response arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub ok: bool,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitResponse {
    fn failed(status: u16, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            status,
            data: None,
            error: Some(error.into()),
        }
    }
}

pub struct ImportClient {
    config: ImportClientConfig,
    http_client: reqwest::Client,
}

impl ImportClient {
    pub fn new(config: ImportClientConfig) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("guardspine-import-client/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ImportClientConfig::from_env())
    }

    pub fn config(&self) -> &ImportClientConfig {
        &self.config
    }

    /// POST the bundle as JSON. Not retried.
    pub async fn submit(&self, bundle: &ImportBundle) -> SubmitResponse {
        let mut request = self.http_client.post(self.config.endpoint()).json(bundle);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(bundle_id = %bundle.bundle_id, timeout_ms = self.config.timeout_ms, "bundle submission timed out");
                return SubmitResponse::failed(
                    0,
                    format!("request timed out after {}ms", self.config.timeout_ms),
                );
            }
            Err(e) => {
                warn!(bundle_id = %bundle.bundle_id, error = %e, "bundle submission failed");
                return SubmitResponse::failed(0, e.to_string());
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return SubmitResponse::failed(status.as_u16(), e.to_string()),
        };
        let data = serde_json::from_str::<serde_json::Value>(&text).ok();

        if status.is_success() {
            info!(bundle_id = %bundle.bundle_id, status = status.as_u16(), "bundle submitted");
            SubmitResponse {
                ok: true,
                status: status.as_u16(),
                data,
                error: None,
            }
        } else {
            warn!(bundle_id = %bundle.bundle_id, status = status.as_u16(), "bundle rejected by import endpoint");
            let error = data
                .as_ref()
                .and_then(|d| d.get("error").or_else(|| d.get("detail")))
                .and_then(|e| e.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {status}"));
            SubmitResponse {
                ok: false,
                status: status.as_u16(),
                data,
                error: Some(error),
            }
        }
    }
}
