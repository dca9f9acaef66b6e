//! JSON extraction helpers for provider payloads.

use std::collections::BTreeSet;

use evidence_core::{EvidenceError, Result};
use serde_json::Value;

/// Parse a request body as a JSON object.
pub(crate) fn parse_object(provider: &str, body: &[u8]) -> Result<Value> {
    let value: Value = serde_json::from_slice(body).map_err(|e| invalid(provider, e))?;
    if !value.is_object() {
        return Err(invalid(provider, "body is not a JSON object"));
    }
    Ok(value)
}

pub(crate) fn invalid(provider: &str, reason: impl std::fmt::Display) -> EvidenceError {
    EvidenceError::InvalidPayload {
        provider: provider.to_string(),
        reason: reason.to_string(),
    }
}

pub(crate) fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

pub(crate) fn u64_at(value: &Value, pointer: &str) -> Option<u64> {
    value.pointer(pointer).and_then(Value::as_u64)
}

/// Required string field; missing is an invalid payload.
pub(crate) fn require_str<'a>(provider: &str, value: &'a Value, pointer: &str) -> Result<&'a str> {
    str_at(value, pointer).ok_or_else(|| invalid(provider, format!("missing {pointer}")))
}

/// `field` of every object in the array at `pointer`.
pub(crate) fn names_at(value: &Value, pointer: &str, field: &str) -> Vec<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.get(field).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Union of added, modified and removed paths across push commits.
pub(crate) fn commit_files(value: &Value) -> BTreeSet<String> {
    let mut files = BTreeSet::new();
    let commits = value
        .get("commits")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for commit in commits {
        for key in ["added", "modified", "removed"] {
            if let Some(paths) = commit.get(key).and_then(Value::as_array) {
                files.extend(paths.iter().filter_map(Value::as_str).map(str::to_string));
            }
        }
    }
    files
}
