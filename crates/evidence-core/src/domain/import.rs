//! Sealed wire format submitted to the GuardSpine import endpoint.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::proof::{ChainError, ImmutabilityProof};
use super::summary::SanitizationSummary;

/// Bundle schema versions understood by sealing authorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SchemaVersion {
    /// Base schema; no top-level sanitization block.
    #[serde(rename = "0.2.0")]
    V0_2_0,
    /// Adds the top-level `sanitization` summary.
    #[serde(rename = "0.2.1")]
    V0_2_1,
}

impl SchemaVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V0_2_0 => "0.2.0",
            Self::V0_2_1 => "0.2.1",
        }
    }

    /// Version to declare for a draft, given whether it carries a summary.
    pub fn for_draft(has_sanitization: bool) -> Self {
        if has_sanitization {
            Self::V0_2_1
        } else {
            Self::V0_2_0
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item in wire shape, with the hash the sealing authority assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportItem {
    pub item_id: String,
    pub content_type: String,
    pub content: serde_json::Value,
    pub content_hash: String,
}

/// Final sealed bundle.
///
/// Only produced by a successful seal; an `ImportBundle` always carries a
/// proof whose chain describes its items one-to-one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBundle {
    pub bundle_id: String,
    pub version: SchemaVersion,
    pub created_at: DateTime<Utc>,
    pub items: Vec<ImportItem>,
    pub immutability_proof: ImmutabilityProof,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanitization: Option<SanitizationSummary>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Check a proof against the items it claims to cover.
///
/// Verifies linkage and sequencing, then that link `i` names item `i` with
/// the same id, content type and content hash. Root hash derivation belongs
/// to the authority and is not checked here.
pub fn check_proof_covers(
    proof: &ImmutabilityProof,
    items: &[ImportItem],
) -> Result<(), ChainError> {
    if proof.hash_chain.len() != items.len() {
        return Err(ChainError::LengthMismatch {
            links: proof.hash_chain.len(),
            items: items.len(),
        });
    }
    proof.verify_links()?;

    for (index, (link, item)) in proof.hash_chain.iter().zip(items).enumerate() {
        let field = if link.item_id != item.item_id {
            Some("item_id")
        } else if link.content_type != item.content_type {
            Some("content_type")
        } else if link.content_hash != item.content_hash {
            Some("content_hash")
        } else {
            None
        };
        if let Some(field) = field {
            return Err(ChainError::ItemMismatch {
                index,
                item_id: item.item_id.clone(),
                field,
            });
        }
    }
    Ok(())
}

impl ImportBundle {
    /// Structural integrity check of the attached proof.
    pub fn verify_structure(&self) -> Result<(), ChainError> {
        check_proof_covers(&self.immutability_proof, &self.items)
    }
}
