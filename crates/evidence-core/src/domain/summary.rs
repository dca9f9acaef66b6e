//! Redaction summary carried by sanitized bundles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Outcome of sanitizing a bundle's items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitizationStatus {
    /// The sanitizer ran and found nothing to redact.
    None,
    /// Every changed item had its redaction applied.
    Sanitized,
    /// Some redactions could not be applied; the rest were.
    Partial,
    /// No redaction could be applied.
    Error,
}

impl SanitizationStatus {
    /// Whether downstream consumers must treat the content as possibly unredacted.
    pub fn is_degraded(self) -> bool {
        matches!(self, Self::Partial | Self::Error)
    }
}

impl std::fmt::Display for SanitizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Sanitized => write!(f, "sanitized"),
            Self::Partial => write!(f, "partial"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Aggregate record of what the sanitizer did across all items.
///
/// `input_hash` and `output_hash` cover the concatenated canonical content of
/// every item, before and after sanitization, in item order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizationSummary {
    pub engine_name: String,
    pub engine_version: String,
    pub method: String,
    pub token_format: String,
    pub salt_fingerprint: String,
    pub redaction_count: u64,
    pub redactions_by_type: BTreeMap<String, u64>,
    pub status: SanitizationStatus,
    pub input_hash: String,
    pub output_hash: String,
}
