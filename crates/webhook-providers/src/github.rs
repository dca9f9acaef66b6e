//! GitHub webhooks: `x-github-event` + `x-hub-signature-256`.

use evidence_core::{
    EventType, NormalizedEvent, Result, Validation, WebhookProvider, WebhookRequest,
};
use serde_json::Value;

use crate::payload::{
    commit_files, invalid, names_at, parse_object, require_str, str_at, u64_at,
};
use crate::signature::verify_hmac_sha256;

pub const EVENT_HEADER: &str = "x-github-event";
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const NAME: &str = "github";

/// Verifies HMAC-SHA256 signatures with the repository's webhook secret.
/// Without a secret every request is rejected.
#[derive(Debug, Clone, Default)]
pub struct GitHubProvider {
    secret: Option<Vec<u8>>,
}

impl GitHubProvider {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: Some(secret.into()),
        }
    }

    /// Provider that matches GitHub traffic but accepts none of it.
    pub fn without_secret() -> Self {
        Self::default()
    }
}

impl WebhookProvider for GitHubProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn matches(&self, request: &WebhookRequest) -> bool {
        request.has_header(EVENT_HEADER)
    }

    fn validate(&self, request: &WebhookRequest) -> std::result::Result<Validation, String> {
        let secret = self
            .secret
            .as_deref()
            .ok_or_else(|| "no webhook secret configured".to_string())?;
        let header = request
            .header(SIGNATURE_HEADER)
            .ok_or_else(|| format!("missing {SIGNATURE_HEADER} header"))?;
        verify_hmac_sha256(secret, &request.body, header)?;
        Ok(Validation::Verified)
    }

    fn parse(&self, request: &WebhookRequest) -> Result<NormalizedEvent> {
        let kind = request.header(EVENT_HEADER).unwrap_or_default();
        let payload = parse_object(NAME, &request.body)?;
        let repo = require_str(NAME, &payload, "/repository/full_name")?.to_string();

        let event = match kind {
            "pull_request" => pull_request(repo, &payload)?,
            "push" => push(repo, &payload),
            "check_run" => check_run(repo, &payload),
            other => {
                tracing::debug!(event = other, "unrecognised GitHub event kind");
                NormalizedEvent::new(NAME, EventType::Unknown, repo, sender(&payload))
                    .with_action(other)
            }
        };
        Ok(event.with_raw_payload(payload))
    }
}

fn sender(payload: &Value) -> &str {
    str_at(payload, "/sender/login").unwrap_or("unknown")
}

fn pull_request(repo: String, payload: &Value) -> Result<NormalizedEvent> {
    let number = u64_at(payload, "/pull_request/number")
        .or_else(|| u64_at(payload, "/number"))
        .ok_or_else(|| invalid(NAME, "pull_request event without a number"))?;
    let author = str_at(payload, "/pull_request/user/login").unwrap_or_else(|| sender(payload));

    let mut event = NormalizedEvent::new(NAME, EventType::PullRequest, repo, author)
        .with_pr_number(number)
        .with_labels(names_at(payload, "/pull_request/labels", "name"));
    if let Some(sha) = str_at(payload, "/pull_request/head/sha") {
        event = event.with_sha(sha);
    }
    if let Some(url) = str_at(payload, "/pull_request/diff_url") {
        event = event.with_diff_url(url);
    }
    if let Some(action) = str_at(payload, "/action") {
        event = event.with_action(action);
    }
    Ok(event)
}

fn push(repo: String, payload: &Value) -> NormalizedEvent {
    let author = str_at(payload, "/pusher/name").unwrap_or_else(|| sender(payload));
    let mut event = NormalizedEvent::new(NAME, EventType::Push, repo, author)
        .with_changed_files(commit_files(payload));
    if let Some(sha) = str_at(payload, "/after") {
        event = event.with_sha(sha);
    }
    if let Some(url) = str_at(payload, "/compare") {
        event = event.with_diff_url(url);
    }
    event
}

fn check_run(repo: String, payload: &Value) -> NormalizedEvent {
    let mut event = NormalizedEvent::new(NAME, EventType::CheckRun, repo, sender(payload));
    if let Some(sha) = str_at(payload, "/check_run/head_sha") {
        event = event.with_sha(sha);
    }
    if let Some(number) = u64_at(payload, "/check_run/pull_requests/0/number") {
        event = event.with_pr_number(number);
    }
    if let Some(action) = str_at(payload, "/action") {
        event = event.with_action(action);
    }
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::sign_hmac_sha256;
    use serde_json::json;

    fn signed(kind: &str, body: &Value) -> WebhookRequest {
        let bytes = serde_json::to_vec(body).unwrap();
        let sig = sign_hmac_sha256(b"hook-secret", &bytes);
        WebhookRequest::new(bytes)
            .with_header("X-GitHub-Event", kind)
            .with_header("X-Hub-Signature-256", sig)
    }

    #[test]
    fn test_validate_signature() {
        let provider = GitHubProvider::new("hook-secret");
        let req = signed("push", &json!({"repository": {"full_name": "o/r"}}));
        assert_eq!(provider.validate(&req), Ok(Validation::Verified));

        let wrong = GitHubProvider::new("other-secret");
        assert!(wrong.validate(&req).is_err());
        assert!(GitHubProvider::without_secret().validate(&req).is_err());
    }

    #[test]
    fn test_parse_pull_request() {
        let body = json!({
            "action": "opened",
            "number": 7,
            "pull_request": {
                "number": 7,
                "user": {"login": "octocat"},
                "head": {"sha": "abc123"},
                "diff_url": "https://github.com/o/r/pull/7.diff",
                "labels": [{"name": "security"}, {"name": "db"}]
            },
            "repository": {"full_name": "o/r"}
        });
        let event = GitHubProvider::new("hook-secret")
            .parse(&signed("pull_request", &body))
            .unwrap();
        assert_eq!(event.event_type, EventType::PullRequest);
        assert_eq!(event.pr_number, Some(7));
        assert_eq!(event.author, "octocat");
        assert_eq!(event.labels, vec!["security", "db"]);
        assert_eq!(event.action.as_deref(), Some("opened"));
        assert!(event.payload().is_some());
    }

    #[test]
    fn test_parse_check_run_links_pr() {
        let body = json!({
            "action": "completed",
            "check_run": {"head_sha": "f00", "pull_requests": [{"number": 12}]},
            "repository": {"full_name": "o/r"},
            "sender": {"login": "ci-bot"}
        });
        let event = GitHubProvider::new("s").parse(&signed("check_run", &body)).unwrap();
        assert_eq!(event.event_type, EventType::CheckRun);
        assert_eq!(event.pr_number, Some(12));
        assert_eq!(event.author, "ci-bot");
    }

    #[test]
    fn test_missing_repository_is_invalid() {
        let err = GitHubProvider::new("s")
            .parse(&signed("push", &json!({"after": "abc"})))
            .unwrap_err();
        assert!(matches!(err, evidence_core::EvidenceError::InvalidPayload { .. }));
    }
}
