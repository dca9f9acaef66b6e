//! Sanitizer served over HTTP: `POST <base>/v1/sanitize`.

use std::time::Duration;

use async_trait::async_trait;
use evidence_core::{
    EngineDescriptor, InputFormat, SanitizeError, SanitizeRequest, SanitizeResult, Sanitizer,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RedactionError, Result};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const SANITIZE_PATH: &str = "/v1/sanitize";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSanitizerConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_ms: u64,
}

impl RemoteSanitizerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// `GUARDSPINE_SANITIZER_URL`, `GUARDSPINE_SANITIZER_TOKEN`,
    /// `GUARDSPINE_SANITIZER_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("GUARDSPINE_SANITIZER_URL").map_err(|_| {
            RedactionError::InvalidConfig("GUARDSPINE_SANITIZER_URL is not set".to_string())
        })?;
        let mut config = Self::new(base_url);
        config.token = std::env::var("GUARDSPINE_SANITIZER_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        if let Some(ms) = std::env::var("GUARDSPINE_SANITIZER_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.timeout_ms = ms;
        }
        Ok(config)
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
        format!("{}{}", self.base_url.trim_end_matches('/'), SANITIZE_PATH)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoteRequest<'a> {
    text: &'a str,
    input_format: InputFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<&'a str>,
    include_findings: bool,
}

pub struct RemoteSanitizer {
    config: RemoteSanitizerConfig,
    http_client: reqwest::Client,
}

impl RemoteSanitizer {
    pub fn new(config: RemoteSanitizerConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("guardspine-redaction/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &RemoteSanitizerConfig {
        &self.config
    }
}

#[async_trait]
impl Sanitizer for RemoteSanitizer {
    fn descriptor(&self) -> EngineDescriptor {
        EngineDescriptor {
            name: "remote".to_string(),
            version: "unknown".to_string(),
            method: "remote".to_string(),
            token_format: "unknown".to_string(),
        }
    }

    async fn sanitize(
        &self,
        text: &str,
        request: &SanitizeRequest,
    ) -> std::result::Result<SanitizeResult, SanitizeError> {
        let body = RemoteRequest {
            text,
            input_format: request.input_format,
            purpose: request.purpose.as_deref(),
            include_findings: request.include_findings,
        };
        let mut call = self.http_client.post(self.config.endpoint()).json(&body);
        if let Some(token) = &self.config.token {
            call = call.bearer_auth(token);
        }

        let response = call.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            debug!(status = %status, "remote sanitizer refused request");
            return Err(SanitizeError::Unavailable(format!("HTTP {status}: {detail}")));
        }
        response
            .json::<SanitizeResult>()
            .await
            .map_err(|e| SanitizeError::InvalidResponse(e.to_string()))
    }
}

impl RemoteSanitizer {
    fn transport_error(&self, err: reqwest::Error) -> SanitizeError {
        if err.is_timeout() {
            SanitizeError::Timeout {
                limit_ms: self.config.timeout_ms,
            }
        } else {
            SanitizeError::Unavailable(err.to_string())
        }
    }
}
