//! Sanitizer backed by an external program.
//!
//! The program receives the path of a temporary file holding the text as
//! its last argument and the request as JSON in `GUARDSPINE_SANITIZE_REQUEST`.
//! It must print a sanitize result (camelCase JSON) on stdout and exit 0.

use std::io::Write;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use evidence_core::{
    EngineDescriptor, SanitizeError, SanitizeRequest, SanitizeResult, Sanitizer,
};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{RedactionError, Result};

pub const REQUEST_ENV: &str = "GUARDSPINE_SANITIZE_REQUEST";
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSanitizerConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

impl CommandSanitizerConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// `GUARDSPINE_SANITIZER_CMD` (whitespace-separated program and
    /// arguments) and `GUARDSPINE_SANITIZER_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var("GUARDSPINE_SANITIZER_CMD").map_err(|_| {
            RedactionError::InvalidConfig("GUARDSPINE_SANITIZER_CMD is not set".to_string())
        })?;
        let mut parts = raw.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| {
            RedactionError::InvalidConfig("GUARDSPINE_SANITIZER_CMD is empty".to_string())
        })?;
        let mut config = Self::new(program).with_args(parts);
        if let Some(ms) = std::env::var("GUARDSPINE_SANITIZER_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.timeout_ms = ms;
        }
        Ok(config)
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

pub struct CommandSanitizer {
    config: CommandSanitizerConfig,
}

impl CommandSanitizer {
    pub fn new(config: CommandSanitizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CommandSanitizerConfig {
        &self.config
    }
}

#[async_trait]
impl Sanitizer for CommandSanitizer {
    fn descriptor(&self) -> EngineDescriptor {
        EngineDescriptor {
            name: self.config.program.clone(),
            version: "unknown".to_string(),
            method: "external_command".to_string(),
            token_format: "unknown".to_string(),
        }
    }

    async fn sanitize(
        &self,
        text: &str,
        request: &SanitizeRequest,
    ) -> std::result::Result<SanitizeResult, SanitizeError> {
        // Removed when `input` drops, whichever way this function returns.
        let mut input = tempfile::NamedTempFile::new()?;
        input.write_all(text.as_bytes())?;
        input.flush()?;

        let request_json = serde_json::to_string(request)
            .map_err(|e| SanitizeError::InvalidResponse(e.to_string()))?;
        let child = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(input.path())
            .env(REQUEST_ENV, request_json)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SanitizeError::Unavailable(format!("cannot run {}: {e}", self.config.program))
            })?;

        let limit = Duration::from_millis(self.config.timeout_ms);
        let output = tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| SanitizeError::Timeout {
                limit_ms: self.config.timeout_ms,
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SanitizeError::Unavailable(format!(
                "{} exited with {}: {}",
                self.config.program,
                output.status,
                stderr.trim()
            )));
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| SanitizeError::InvalidResponse(e.to_string()))
    }
}
