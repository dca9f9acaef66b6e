//! Sanitizer contract and the redaction pass run before sealing.
//!
//! Sanitization rewrites item content and rehashes it before any wire item
//! or chain link is derived, so the hash chain only ever covers redacted
//! content. A failure on one item never aborts the batch: the item keeps its
//! content and the summary status records the degradation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::canonical::sha256_literal;
use crate::domain::{EvidenceItem, SanitizationStatus, SanitizationSummary};
use crate::metrics::METRICS;
use crate::obs;

/// Purpose tag sent with every webhook item.
pub const WEBHOOK_PURPOSE: &str = "webhook_payload";

/// Shape of the text handed to the sanitizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Text,
    Json,
    Diff,
    Markdown,
}

/// Per-call options for a sanitizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeRequest {
    pub input_format: InputFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default)]
    pub include_findings: bool,
}

impl SanitizeRequest {
    /// `{inputFormat: json, purpose: webhook_payload}`
    pub fn webhook_payload() -> Self {
        Self {
            input_format: InputFormat::Json,
            purpose: Some(WEBHOOK_PURPOSE.to_string()),
            include_findings: false,
        }
    }
}

/// What a sanitizer returns for one piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeResult {
    pub sanitized_text: String,
    pub changed: bool,
    #[serde(default)]
    pub redaction_count: u64,
    #[serde(default)]
    pub redactions_by_type: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_hash: Option<String>,
}

impl SanitizeResult {
    /// Result for text the sanitizer left alone.
    pub fn unchanged(text: &str) -> Self {
        Self {
            sanitized_text: text.to_string(),
            ..Self::default()
        }
    }
}

/// Static facts about a sanitizer, used when results do not report them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineDescriptor {
    pub name: String,
    pub version: String,
    pub method: String,
    pub token_format: String,
}

/// Errors from a single sanitizer invocation.
#[derive(Debug, thiserror::Error)]
pub enum SanitizeError {
    #[error("sanitizer unavailable: {0}")]
    Unavailable(String),

    #[error("sanitizer timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    #[error("invalid sanitizer response: {0}")]
    InvalidResponse(String),

    #[error("sanitizer io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Text redaction capability.
///
/// Implementations must be safe to call concurrently; the pipeline issues
/// one call per item and awaits them together.
#[async_trait]
pub trait Sanitizer: Send + Sync {
    fn descriptor(&self) -> EngineDescriptor;

    /// Fingerprint of the salt this engine keys tokens with, if it knows it.
    fn salt_fingerprint(&self) -> Option<String> {
        None
    }

    async fn sanitize(
        &self,
        text: &str,
        request: &SanitizeRequest,
    ) -> std::result::Result<SanitizeResult, SanitizeError>;
}

/// Run every item through the sanitizer and rehash what changed.
///
/// Calls are issued concurrently and consumed in item order. Returns the
/// rewritten items and the aggregate summary.
pub async fn sanitize_items(
    mut items: Vec<EvidenceItem>,
    sanitizer: &dyn Sanitizer,
    salt_fingerprint: &str,
) -> (Vec<EvidenceItem>, SanitizationSummary) {
    let request = SanitizeRequest::webhook_payload();
    let inputs: Vec<String> = items.iter().map(EvidenceItem::canonical_content).collect();

    let results = join_all(inputs.iter().map(|text| sanitizer.sanitize(text, &request))).await;

    let descriptor = sanitizer.descriptor();
    let mut engine_name = None;
    let mut engine_version = None;
    let mut method = None;
    let mut applied = 0usize;
    let mut failures = 0usize;
    let mut redaction_count = 0u64;
    let mut redactions_by_type: BTreeMap<String, u64> = BTreeMap::new();

    for (index, (item, result)) in items.iter_mut().zip(results).enumerate() {
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                failures += 1;
                degraded(index, &e);
                continue;
            }
        };

        engine_name = engine_name.or(result.engine_name);
        engine_version = engine_version.or(result.engine_version);
        method = method.or(result.method);

        if !result.changed {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(&result.sanitized_text) {
            Ok(content) => {
                item.replace_content(content);
                applied += 1;
                redaction_count += result.redaction_count;
                for (kind, count) in result.redactions_by_type {
                    *redactions_by_type.entry(kind).or_insert(0) += count;
                }
            }
            Err(e) => {
                failures += 1;
                degraded(index, &e);
            }
        }
    }

    let outputs: String = items.iter().map(EvidenceItem::canonical_content).collect();
    let status = match (failures, applied) {
        (0, 0) => SanitizationStatus::None,
        (0, _) => SanitizationStatus::Sanitized,
        (_, 0) => SanitizationStatus::Error,
        _ => SanitizationStatus::Partial,
    };
    METRICS.add_redactions(redaction_count);

    let summary = SanitizationSummary {
        engine_name: engine_name.unwrap_or(descriptor.name),
        engine_version: engine_version.unwrap_or(descriptor.version),
        method: method.unwrap_or(descriptor.method),
        token_format: descriptor.token_format,
        salt_fingerprint: salt_fingerprint.to_string(),
        redaction_count,
        redactions_by_type,
        status,
        input_hash: sha256_literal(inputs.concat().as_bytes()),
        output_hash: sha256_literal(outputs.as_bytes()),
    };
    (items, summary)
}

fn degraded(index: usize, reason: &dyn std::fmt::Display) {
    METRICS.inc_sanitization_degraded();
    obs::emit_sanitization_degraded(index, reason);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::hash_canonical;
    use crate::domain::EvidenceKind;
    use serde_json::json;

    /// Replaces the literal word `secret`; answers `not json` for `corrupt`;
    /// fails outright for `offline`.
    struct WordSanitizer;

    #[async_trait]
    impl Sanitizer for WordSanitizer {
        fn descriptor(&self) -> EngineDescriptor {
            EngineDescriptor {
                name: "word".into(),
                version: "1.0.0".into(),
                method: "deterministic_hmac".into(),
                token_format: "[HIDDEN:<id>]".into(),
            }
        }

        async fn sanitize(
            &self,
            text: &str,
            request: &SanitizeRequest,
        ) -> std::result::Result<SanitizeResult, SanitizeError> {
            assert_eq!(request.input_format, InputFormat::Json);
            assert_eq!(request.purpose.as_deref(), Some(WEBHOOK_PURPOSE));
            if text.contains("offline") {
                return Err(SanitizeError::Unavailable("engine offline".into()));
            }
            if text.contains("corrupt") {
                return Ok(SanitizeResult {
                    sanitized_text: "not json {".into(),
                    changed: true,
                    redaction_count: 1,
                    ..SanitizeResult::default()
                });
            }
            let count = text.matches("secret").count() as u64;
            if count == 0 {
                return Ok(SanitizeResult::unchanged(text));
            }
            Ok(SanitizeResult {
                sanitized_text: text.replace("secret", "[HIDDEN:1]"),
                changed: true,
                redaction_count: count,
                redactions_by_type: BTreeMap::from([("word".to_string(), count)]),
                ..SanitizeResult::default()
            })
        }
    }

    fn item(content: serde_json::Value) -> EvidenceItem {
        EvidenceItem::new(EvidenceKind::Metadata, "m", None, content)
    }

    #[tokio::test]
    async fn test_changed_item_hash_covers_sanitized_content() {
        let items = vec![item(json!({ "token": "secret" }))];
        let raw_hash = items[0].content_hash().to_string();

        let (items, summary) = sanitize_items(items, &WordSanitizer, "sha256:salt").await;

        assert_eq!(items[0].content(), &json!({ "token": "[HIDDEN:1]" }));
        assert_eq!(items[0].content_hash(), hash_canonical(items[0].content()));
        assert_ne!(items[0].content_hash(), raw_hash);
        assert_eq!(summary.status, SanitizationStatus::Sanitized);
        assert_eq!(summary.redaction_count, 1);
        assert_eq!(summary.salt_fingerprint, "sha256:salt");
    }

    #[tokio::test]
    async fn test_nothing_to_redact_is_none() {
        let items = vec![item(json!({ "a": 1 })), item(json!("plain"))];
        let (out, summary) = sanitize_items(items.clone(), &WordSanitizer, "fp").await;
        assert_eq!(out, items);
        assert_eq!(summary.status, SanitizationStatus::None);
        assert_eq!(summary.redaction_count, 0);
        assert_eq!(summary.input_hash, summary.output_hash);
    }

    #[tokio::test]
    async fn test_counts_aggregate_across_items() {
        let items = vec![
            item(json!({ "a": "secret", "b": "secret" })),
            item(json!({ "c": "secret" })),
        ];
        let (_, summary) = sanitize_items(items, &WordSanitizer, "fp").await;
        assert_eq!(summary.redaction_count, 3);
        assert_eq!(summary.redactions_by_type.get("word"), Some(&3));
    }

    #[tokio::test]
    async fn test_parse_failure_is_partial_and_continues() {
        let items = vec![
            item(json!({ "note": "corrupt" })),
            item(json!({ "token": "secret" })),
        ];
        let original_first = items[0].clone();
        let (out, summary) = sanitize_items(items, &WordSanitizer, "fp").await;

        assert_eq!(out[0], original_first);
        assert_eq!(out[1].content(), &json!({ "token": "[HIDDEN:1]" }));
        assert_eq!(summary.status, SanitizationStatus::Partial);
        assert_eq!(summary.redaction_count, 1);
    }

    #[tokio::test]
    async fn test_all_failures_is_error() {
        let items = vec![item(json!({ "note": "corrupt" })), item(json!("offline"))];
        let (_, summary) = sanitize_items(items, &WordSanitizer, "fp").await;
        assert_eq!(summary.status, SanitizationStatus::Error);
    }

    #[tokio::test]
    async fn test_aggregate_hashes_cover_concatenation_in_order() {
        let items = vec![item(json!({ "k": "secret" })), item(json!([1, 2]))];
        let before: String = items.iter().map(EvidenceItem::canonical_content).collect();
        let (out, summary) = sanitize_items(items, &WordSanitizer, "fp").await;
        let after: String = out.iter().map(EvidenceItem::canonical_content).collect();

        assert_eq!(summary.input_hash, sha256_literal(before.as_bytes()));
        assert_eq!(summary.output_hash, sha256_literal(after.as_bytes()));
        assert_eq!(after, r#"{"k":"[HIDDEN:1]"}[1,2]"#);
    }

    #[tokio::test]
    async fn test_engine_metadata_falls_back_to_descriptor() {
        let (_, summary) = sanitize_items(vec![item(json!(1))], &WordSanitizer, "fp").await;
        assert_eq!(summary.engine_name, "word");
        assert_eq!(summary.engine_version, "1.0.0");
        assert_eq!(summary.method, "deterministic_hmac");
        assert_eq!(summary.token_format, "[HIDDEN:<id>]");
    }

    #[test]
    fn test_request_wire_shape() {
        let json = serde_json::to_value(SanitizeRequest::webhook_payload()).unwrap();
        assert_eq!(
            json,
            json!({ "inputFormat": "json", "purpose": "webhook_payload", "includeFindings": false })
        );
    }

    #[test]
    fn test_result_parses_camel_case() {
        let result: SanitizeResult = serde_json::from_value(json!({
            "sanitizedText": "x",
            "changed": true,
            "redactionCount": 2,
            "redactionsByType": { "email": 2 },
            "engineName": "rehydra"
        }))
        .unwrap();
        assert_eq!(result.redaction_count, 2);
        assert_eq!(result.engine_name.as_deref(), Some("rehydra"));
    }

    /// Sleeps `delay` ms before tagging the item with its own `tag`, so
    /// earlier items can finish last.
    #[derive(Default)]
    struct SlowSanitizer {
        finished: std::sync::Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl Sanitizer for SlowSanitizer {
        fn descriptor(&self) -> EngineDescriptor {
            WordSanitizer.descriptor()
        }

        async fn sanitize(
            &self,
            text: &str,
            _request: &SanitizeRequest,
        ) -> std::result::Result<SanitizeResult, SanitizeError> {
            let value: serde_json::Value = serde_json::from_str(text).unwrap();
            let delay = value["delay"].as_u64().unwrap();
            let tag = value["tag"].as_u64().unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            self.finished.lock().unwrap().push(tag);
            Ok(SanitizeResult {
                sanitized_text: json!({ "tag": tag, "redacted": true }).to_string(),
                changed: true,
                redaction_count: tag,
                redactions_by_type: BTreeMap::from([(format!("tag{tag}"), tag)]),
                ..SanitizeResult::default()
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_reassemble_in_item_order() {
        let items = vec![
            item(json!({ "tag": 1, "delay": 30 })),
            item(json!({ "tag": 2, "delay": 20 })),
            item(json!({ "tag": 3, "delay": 10 })),
        ];
        let engine = SlowSanitizer::default();
        let (out, summary) = sanitize_items(items, &engine, "fp").await;

        assert_eq!(*engine.finished.lock().unwrap(), vec![3, 2, 1]);
        let tags: Vec<u64> = out
            .iter()
            .map(|i| i.content()["tag"].as_u64().unwrap())
            .collect();
        assert_eq!(tags, vec![1, 2, 3]);
        let expected: String = (1..=3)
            .map(|tag| crate::canonical::canonical_json(&json!({ "redacted": true, "tag": tag })))
            .collect();
        assert_eq!(summary.output_hash, sha256_literal(expected.as_bytes()));
        assert_eq!(summary.redaction_count, 6);
        assert_eq!(
            summary.redactions_by_type.keys().collect::<Vec<_>>(),
            vec!["tag1", "tag2", "tag3"]
        );
        assert_eq!(summary.status, SanitizationStatus::Sanitized);
    }
}
