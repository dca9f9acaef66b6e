//! Catch-all provider for systems without a dedicated integration.

use chrono::{DateTime, Utc};
use evidence_core::{
    EventType, NormalizedEvent, Result, Validation, WebhookProvider, WebhookRequest,
};
use serde::Deserialize;

use crate::payload::{invalid, parse_object};
use crate::signature::tokens_match;

const NAME: &str = "generic";

/// Body shape accepted by the generic provider; field names follow
/// [`NormalizedEvent`].
#[derive(Debug, Deserialize)]
struct GenericPayload {
    #[serde(default = "unknown_event")]
    event_type: EventType,
    repo: String,
    #[serde(default = "unknown_author")]
    author: String,
    #[serde(default)]
    pr_number: Option<u64>,
    #[serde(default)]
    sha: Option<String>,
    #[serde(default)]
    diff_url: Option<String>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    changed_files: Vec<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

fn unknown_event() -> EventType {
    EventType::Unknown
}

fn unknown_author() -> String {
    "unknown".to_string()
}

/// Matches every request. Without a token it accepts unauthenticated
/// traffic, which the handler reports as a security event.
#[derive(Debug, Clone, Default)]
pub struct GenericProvider {
    token: Option<String>,
}

impl GenericProvider {
    /// Require `authorization: Bearer <token>`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn unauthenticated() -> Self {
        Self::default()
    }
}

impl WebhookProvider for GenericProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn matches(&self, _request: &WebhookRequest) -> bool {
        true
    }

    fn validate(&self, request: &WebhookRequest) -> std::result::Result<Validation, String> {
        let Some(expected) = self.token.as_deref() else {
            return Ok(Validation::Unauthenticated);
        };
        let presented = request
            .header("authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| "missing bearer token".to_string())?;
        if tokens_match(presented.trim(), expected) {
            Ok(Validation::Verified)
        } else {
            Err("token mismatch".to_string())
        }
    }

    fn parse(&self, request: &WebhookRequest) -> Result<NormalizedEvent> {
        let value = parse_object(NAME, &request.body)?;
        let body: GenericPayload =
            serde_json::from_value(value.clone()).map_err(|e| invalid(NAME, e))?;

        let mut event = NormalizedEvent::new(NAME, body.event_type, body.repo, body.author)
            .with_labels(body.labels)
            .with_changed_files(body.changed_files);
        if let Some(n) = body.pr_number {
            event = event.with_pr_number(n);
        }
        if let Some(sha) = body.sha {
            event = event.with_sha(sha);
        }
        if let Some(url) = body.diff_url {
            event = event.with_diff_url(url);
        }
        if let Some(action) = body.action {
            event = event.with_action(action);
        }
        if let Some(ts) = body.timestamp {
            event = event.with_timestamp(ts);
        }
        Ok(event.with_raw_payload(value))
    }
}
