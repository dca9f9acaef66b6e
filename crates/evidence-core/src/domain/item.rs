//! Evidence items: one hashed piece of content inside a bundle.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_json, hash_canonical};

/// What an evidence item attests to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Diff,
    Metadata,
    CheckResult,
}

impl EvidenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Diff => "diff",
            Self::Metadata => "metadata",
            Self::CheckResult => "check_result",
        }
    }
}

impl std::fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single piece of evidence with its content hash.
///
/// `content_hash` is always `sha256:` over the canonical encoding of
/// `content`. The only way to change content after construction is
/// [`EvidenceItem::replace_content`], which rehashes in the same step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub kind: EvidenceKind,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    content: serde_json::Value,
    content_hash: String,
}

impl EvidenceItem {
    pub fn new(
        kind: EvidenceKind,
        summary: impl Into<String>,
        url: Option<String>,
        content: serde_json::Value,
    ) -> Self {
        let content_hash = hash_canonical(&content);
        Self {
            kind,
            summary: summary.into(),
            url,
            content,
            content_hash,
        }
    }

    pub fn content(&self) -> &serde_json::Value {
        &self.content
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// The exact string the content hash covers.
    pub fn canonical_content(&self) -> String {
        canonical_json(&self.content)
    }

    /// Swap in new content (sanitized output) and recompute the hash.
    pub fn replace_content(&mut self, content: serde_json::Value) {
        self.content_hash = hash_canonical(&content);
        self.content = content;
    }

    /// Recompute the hash and compare with the stored one.
    pub fn verify_hash(&self) -> bool {
        hash_canonical(&self.content) == self.content_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::sha256_literal;
    use serde_json::json;

    #[test]
    fn test_hash_covers_canonical_content() {
        let item = EvidenceItem::new(
            EvidenceKind::Metadata,
            "meta",
            None,
            json!({ "b": 2, "a": 1 }),
        );
        assert_eq!(item.canonical_content(), r#"{"a":1,"b":2}"#);
        assert_eq!(item.content_hash(), sha256_literal(br#"{"a":1,"b":2}"#));
    }

    #[test]
    fn test_replace_content_rehashes() {
        let mut item = EvidenceItem::new(EvidenceKind::Diff, "d", None, json!({ "token": "s3cret" }));
        let before = item.content_hash().to_string();
        item.replace_content(json!({ "token": "[HIDDEN:abc]" }));
        assert_ne!(item.content_hash(), before);
        assert!(item.verify_hash());
    }

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(EvidenceKind::CheckResult.as_str(), "check_result");
        assert_eq!(
            serde_json::to_string(&EvidenceKind::Diff).unwrap(),
            r#""diff""#
        );
    }
}
