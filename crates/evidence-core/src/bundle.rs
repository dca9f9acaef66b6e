//! Unsealed bundle assembly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EvidenceItem, ImmutabilityProof, NormalizedEvent, SchemaVersion};
use crate::items::short_sha;

/// Bundle as assembled from one event, before sealing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedBundle {
    pub bundle_id: String,
    pub schema_version: SchemaVersion,
    pub artifact_id: String,
    pub risk_tier: String,
    pub scope: String,
    pub items: Vec<EvidenceItem>,
    pub created_at: DateTime<Utc>,
    pub provider: String,
    /// Attached by sealing; `None` means no integrity guarantee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immutability_proof: Option<ImmutabilityProof>,
}

impl EmittedBundle {
    pub fn is_sealed(&self) -> bool {
        self.immutability_proof.is_some()
    }
}

/// Stable artifact identifier for the thing the event is about.
///
/// `org/repo` with PR 42 gives `org-repo-pr-42`; with only a SHA it gives
/// `org-repo-<sha[0..8]>`. Without either the epoch-millisecond suffix makes
/// it unique but not reproducible.
pub fn artifact_id(event: &NormalizedEvent) -> String {
    let base = event.repo.replace('/', "-");
    match (event.pr_number, event.sha.as_deref()) {
        (Some(n), _) => format!("{base}-pr-{n}"),
        (None, Some(sha)) if !sha.is_empty() => format!("{base}-{}", short_sha(sha)),
        _ => format!("{base}-{}", Utc::now().timestamp_millis()),
    }
}

/// `<provider>:<event_type>:<repo>[:#<pr>][:<action>]`
pub fn scope(event: &NormalizedEvent) -> String {
    let mut parts = vec![
        event.provider.clone(),
        event.event_type.to_string(),
        event.repo.clone(),
    ];
    if let Some(n) = event.pr_number {
        parts.push(format!("#{n}"));
    }
    if let Some(action) = &event.action {
        parts.push(action.clone());
    }
    parts.join(":")
}

/// Aggregate items and tier into an unsealed bundle with a fresh id.
pub fn assemble(
    event: &NormalizedEvent,
    items: Vec<EvidenceItem>,
    risk_tier: String,
) -> EmittedBundle {
    EmittedBundle {
        bundle_id: uuid::Uuid::new_v4().to_string(),
        schema_version: SchemaVersion::V0_2_0,
        artifact_id: artifact_id(event),
        risk_tier,
        scope: scope(event),
        items,
        created_at: Utc::now(),
        provider: event.provider.clone(),
        immutability_proof: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventType;
    use crate::items::build_items;

    fn base() -> NormalizedEvent {
        NormalizedEvent::new("github", EventType::PullRequest, "org/repo", "octocat")
    }

    #[test]
    fn test_artifact_id_prefers_pr_number() {
        let ev = base().with_pr_number(42).with_sha("deadbeef12345678");
        assert_eq!(artifact_id(&ev), "org-repo-pr-42");
    }

    #[test]
    fn test_artifact_id_uses_short_sha() {
        let ev = base().with_sha("deadbeef12345678");
        assert_eq!(artifact_id(&ev), "org-repo-deadbeef");
    }

    #[test]
    fn test_artifact_id_timestamp_fallback() {
        let id = artifact_id(&base());
        let suffix = id.strip_prefix("org-repo-").expect("prefix");
        assert!(!suffix.is_empty());
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_nested_repo_slashes_replaced() {
        let ev = NormalizedEvent::new("gitlab", EventType::MergeRequest, "group/sub/proj", "a")
            .with_pr_number(3);
        assert_eq!(artifact_id(&ev), "group-sub-proj-pr-3");
    }

    #[test]
    fn test_scope_full() {
        let ev = base().with_pr_number(7).with_action("opened");
        assert_eq!(scope(&ev), "github:pull_request:org/repo:#7:opened");
    }

    #[test]
    fn test_scope_minimal() {
        let ev = NormalizedEvent::new("github", EventType::Push, "org/repo", "a");
        assert_eq!(scope(&ev), "github:push:org/repo");
    }

    #[test]
    fn test_scope_action_without_pr() {
        let ev = NormalizedEvent::new("github", EventType::CheckRun, "org/repo", "a")
            .with_action("completed");
        assert_eq!(scope(&ev), "github:check_run:org/repo:completed");
    }

    #[test]
    fn test_assemble_is_unsealed_with_fresh_ids() {
        let ev = base().with_pr_number(1);
        let a = assemble(&ev, build_items(&ev), "high".into());
        let b = assemble(&ev, build_items(&ev), "high".into());
        assert!(!a.is_sealed());
        assert_ne!(a.bundle_id, b.bundle_id);
        assert_eq!(a.items, b.items);
        assert_eq!(a.provider, "github");
        assert_eq!(a.risk_tier, "high");
    }
}
