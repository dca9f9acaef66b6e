//! GitLab webhooks: `x-gitlab-event` + `x-gitlab-token`.

use evidence_core::{
    EventType, NormalizedEvent, Result, Validation, WebhookProvider, WebhookRequest,
};
use serde_json::Value;

use crate::payload::{commit_files, invalid, names_at, parse_object, require_str, str_at, u64_at};
use crate::signature::tokens_match;

pub const EVENT_HEADER: &str = "x-gitlab-event";
pub const TOKEN_HEADER: &str = "x-gitlab-token";

const NAME: &str = "gitlab";

/// Checks the shared secret token GitLab echoes on every delivery.
#[derive(Debug, Clone, Default)]
pub struct GitLabProvider {
    token: Option<String>,
}

impl GitLabProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn without_token() -> Self {
        Self::default()
    }
}

impl WebhookProvider for GitLabProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn matches(&self, request: &WebhookRequest) -> bool {
        request.has_header(EVENT_HEADER)
    }

    fn validate(&self, request: &WebhookRequest) -> std::result::Result<Validation, String> {
        let expected = self
            .token
            .as_deref()
            .ok_or_else(|| "no webhook token configured".to_string())?;
        let presented = request
            .header(TOKEN_HEADER)
            .ok_or_else(|| format!("missing {TOKEN_HEADER} header"))?;
        if tokens_match(presented, expected) {
            Ok(Validation::Verified)
        } else {
            Err("token mismatch".to_string())
        }
    }

    fn parse(&self, request: &WebhookRequest) -> Result<NormalizedEvent> {
        let payload = parse_object(NAME, &request.body)?;
        let repo = require_str(NAME, &payload, "/project/path_with_namespace")?.to_string();

        let event = match str_at(&payload, "/object_kind") {
            Some("merge_request") => merge_request(repo, &payload)?,
            Some("push") => push(repo, &payload),
            other => {
                let mut event =
                    NormalizedEvent::new(NAME, EventType::Unknown, repo, user(&payload));
                if let Some(kind) = other {
                    event = event.with_action(kind);
                }
                event
            }
        };
        Ok(event.with_raw_payload(payload))
    }
}

fn user(payload: &Value) -> &str {
    str_at(payload, "/user/username")
        .or_else(|| str_at(payload, "/user_username"))
        .unwrap_or("unknown")
}

fn merge_request(repo: String, payload: &Value) -> Result<NormalizedEvent> {
    let iid = u64_at(payload, "/object_attributes/iid")
        .ok_or_else(|| invalid(NAME, "merge_request event without an iid"))?;
    let mut event = NormalizedEvent::new(NAME, EventType::MergeRequest, repo, user(payload))
        .with_pr_number(iid)
        .with_labels(names_at(payload, "/labels", "title"));
    if let Some(sha) = str_at(payload, "/object_attributes/last_commit/id") {
        event = event.with_sha(sha);
    }
    if let Some(url) = str_at(payload, "/object_attributes/url") {
        event = event.with_diff_url(format!("{url}.diff"));
    }
    if let Some(action) = str_at(payload, "/object_attributes/action") {
        event = event.with_action(action);
    }
    Ok(event)
}

fn push(repo: String, payload: &Value) -> NormalizedEvent {
    let mut event = NormalizedEvent::new(NAME, EventType::Push, repo, user(payload))
        .with_changed_files(commit_files(payload));
    if let Some(sha) = str_at(payload, "/checkout_sha").or_else(|| str_at(payload, "/after")) {
        event = event.with_sha(sha);
    }
    event
}
