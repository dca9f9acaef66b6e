//! Evidence item construction from a normalized event.

use serde_json::json;

use crate::domain::{EventType, EvidenceItem, EvidenceKind, NormalizedEvent};

/// Build the evidence items for one event, in order metadata, diff,
/// check result.
///
/// - metadata is always present
/// - diff appears when the event has a diff URL; its content is the raw
///   payload when one was retained, else the URL string
/// - check_result appears for `check_run` events that retained a payload
pub fn build_items(event: &NormalizedEvent) -> Vec<EvidenceItem> {
    let mut items = vec![metadata_item(event)];

    if let Some(url) = &event.diff_url {
        let content = event
            .payload()
            .cloned()
            .unwrap_or_else(|| serde_json::Value::String(url.clone()));
        items.push(EvidenceItem::new(
            EvidenceKind::Diff,
            diff_summary(event),
            Some(url.clone()),
            content,
        ));
    }

    if event.event_type == EventType::CheckRun {
        if let Some(payload) = event.payload() {
            items.push(EvidenceItem::new(
                EvidenceKind::CheckResult,
                format!("Check run result for {}", event.repo),
                None,
                payload.clone(),
            ));
        }
    }

    items
}

fn metadata_item(event: &NormalizedEvent) -> EvidenceItem {
    let content = json!({
        "repo": event.repo,
        "author": event.author,
        "sha": event.sha,
        "labels": event.labels,
        "changed_files": event.changed_files,
    });
    EvidenceItem::new(
        EvidenceKind::Metadata,
        format!(
            "{} {} by {} ({} files changed)",
            event.provider,
            event.event_type,
            event.author,
            event.changed_files.len()
        ),
        None,
        content,
    )
}

fn diff_summary(event: &NormalizedEvent) -> String {
    match (event.pr_number, event.sha.as_deref()) {
        (Some(n), _) => format!("Diff for {} #{}", event.repo, n),
        (None, Some(sha)) => format!("Diff for {} at {}", event.repo, short_sha(sha)),
        (None, None) => format!("Diff for {}", event.repo),
    }
}

/// First eight characters of a commit SHA.
pub(crate) fn short_sha(sha: &str) -> &str {
    match sha.char_indices().nth(8) {
        Some((idx, _)) => &sha[..idx],
        None => sha,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{canonical_json, sha256_literal};

    fn push_event() -> NormalizedEvent {
        NormalizedEvent::new("github", EventType::Push, "org/repo", "octocat")
            .with_sha("deadbeef12345678")
    }

    #[test]
    fn test_metadata_always_present() {
        let items = build_items(&push_event());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, EvidenceKind::Metadata);
        assert_eq!(
            items[0].content()["sha"],
            serde_json::Value::String("deadbeef12345678".into())
        );
    }

    #[test]
    fn test_metadata_hash_is_sha256_of_canonical_string() {
        let items = build_items(&push_event());
        let canonical = canonical_json(items[0].content());
        assert_eq!(items[0].content_hash(), sha256_literal(canonical.as_bytes()));
    }

    #[test]
    fn test_diff_falls_back_to_url() {
        let ev = push_event().with_diff_url("https://example.com/org/repo/commit/deadbeef.diff");
        let items = build_items(&ev);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].kind, EvidenceKind::Diff);
        assert_eq!(
            items[1].content(),
            &serde_json::Value::String("https://example.com/org/repo/commit/deadbeef.diff".into())
        );
        assert_eq!(
            items[1].url.as_deref(),
            Some("https://example.com/org/repo/commit/deadbeef.diff")
        );
    }

    #[test]
    fn test_diff_uses_raw_payload_when_present() {
        let payload = serde_json::json!({ "action": "opened", "number": 7 });
        let ev = push_event()
            .with_diff_url("https://example.com/pr/7.diff")
            .with_raw_payload(payload.clone());
        let items = build_items(&ev);
        assert_eq!(items[1].content(), &payload);
    }

    #[test]
    fn test_check_result_only_for_check_run_with_payload() {
        let payload = serde_json::json!({ "check_run": { "conclusion": "success" } });

        let check = NormalizedEvent::new("github", EventType::CheckRun, "org/repo", "ci")
            .with_raw_payload(payload.clone());
        let items = build_items(&check);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].kind, EvidenceKind::CheckResult);

        let no_payload = NormalizedEvent::new("github", EventType::CheckRun, "org/repo", "ci");
        assert_eq!(build_items(&no_payload).len(), 1);

        let push = push_event().with_raw_payload(payload);
        assert_eq!(build_items(&push).len(), 1);
    }

    #[test]
    fn test_hashes_are_deterministic() {
        let ev = push_event()
            .with_labels(["bug", "security"])
            .with_changed_files(["b.rs", "a.rs"])
            .with_diff_url("https://example.com/d.diff");
        let first: Vec<String> = build_items(&ev)
            .iter()
            .map(|i| i.content_hash().to_string())
            .collect();
        let second: Vec<String> = build_items(&ev.clone())
            .iter()
            .map(|i| i.content_hash().to_string())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_short_sha() {
        assert_eq!(short_sha("deadbeef12345678"), "deadbeef");
        assert_eq!(short_sha("abc"), "abc");
    }
}
