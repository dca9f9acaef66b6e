//! Sealing client: wire conversion, authority call and version negotiation.
//!
//! Sealing fails hard. There is no path that returns an [`ImportBundle`]
//! without an immutability proof that covers its items.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::bundle::EmittedBundle;
use crate::canonical::{hash_canonical, is_hash_literal};
use crate::domain::{
    check_proof_covers, EvidenceError, EvidenceItem, EvidenceKind, ImmutabilityProof,
    ImportBundle, ImportItem, Result, SanitizationSummary, SchemaVersion,
};
use crate::metrics::METRICS;
use crate::obs;

/// Content-type namespace for webhook evidence.
pub const CONTENT_TYPE_PREFIX: &str = "guardspine/webhook/";

/// `item-<index>-<kind>`
pub fn wire_item_id(index: usize, kind: EvidenceKind) -> String {
    format!("item-{index}-{kind}")
}

/// `guardspine/webhook/<kind>`
pub fn wire_content_type(kind: EvidenceKind) -> String {
    format!("{CONTENT_TYPE_PREFIX}{kind}")
}

/// Item as handed to the sealing authority, before it assigns hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftItem {
    pub item_id: String,
    pub content_type: String,
    pub content: serde_json::Value,
}

impl DraftItem {
    pub fn from_evidence(index: usize, item: &EvidenceItem) -> Self {
        let mut content = json!({
            "kind": item.kind,
            "summary": item.summary,
            "content": item.content(),
        });
        if let (Some(url), Some(map)) = (&item.url, content.as_object_mut()) {
            map.insert("url".to_string(), json!(url));
        }
        Self {
            item_id: wire_item_id(index, item.kind),
            content_type: wire_content_type(item.kind),
            content,
        }
    }
}

/// Unsealed structure submitted to a [`SealingAuthority`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealDraft {
    pub bundle_id: String,
    pub version: SchemaVersion,
    pub created_at: DateTime<Utc>,
    pub items: Vec<DraftItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanitization: Option<SanitizationSummary>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl SealDraft {
    /// Draft for a bundle; declares 0.2.1 exactly when a summary is attached.
    pub fn from_bundle(bundle: &EmittedBundle, sanitization: Option<SanitizationSummary>) -> Self {
        let metadata = BTreeMap::from([
            ("artifact_id".to_string(), json!(bundle.artifact_id)),
            ("risk_tier".to_string(), json!(bundle.risk_tier)),
            ("scope".to_string(), json!(bundle.scope)),
            ("provider".to_string(), json!(bundle.provider)),
        ]);
        Self {
            bundle_id: bundle.bundle_id.clone(),
            version: SchemaVersion::for_draft(sanitization.is_some()),
            created_at: bundle.created_at,
            items: bundle
                .items
                .iter()
                .enumerate()
                .map(|(i, item)| DraftItem::from_evidence(i, item))
                .collect(),
            sanitization,
            metadata,
        }
    }

    /// Re-declare as 0.2.0, keeping any summary under `metadata.sanitization`.
    pub fn downgrade(&mut self) -> Result<()> {
        self.version = SchemaVersion::V0_2_0;
        if let Some(summary) = self.sanitization.take() {
            self.metadata
                .insert("sanitization".to_string(), serde_json::to_value(summary)?);
        }
        Ok(())
    }
}

/// What an authority hands back for a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedDraft {
    pub items: Vec<ImportItem>,
    #[serde(default)]
    pub immutability_proof: Option<ImmutabilityProof>,
}

/// Structured failures reported by a sealing authority.
#[derive(Debug, thiserror::Error)]
pub enum SealError {
    /// The authority does not accept the declared schema version.
    #[error("schema version {version} not supported by sealing authority")]
    UnsupportedVersion { version: SchemaVersion },

    #[error("sealing authority unavailable: {0}")]
    Unavailable(String),

    #[error("draft rejected: {0}")]
    Rejected(String),
}

impl From<SealError> for EvidenceError {
    fn from(err: SealError) -> Self {
        match err {
            SealError::Unavailable(reason) => EvidenceError::SealingUnavailable(reason),
            other => EvidenceError::SealingRejected(other.to_string()),
        }
    }
}

/// External collaborator that computes the hash chain for a draft.
#[async_trait]
pub trait SealingAuthority: Send + Sync {
    async fn seal(&self, draft: &SealDraft) -> std::result::Result<SealedDraft, SealError>;
}

/// Converts bundles to drafts, calls the authority and validates its answer.
#[derive(Clone)]
pub struct SealingClient {
    authority: Option<Arc<dyn SealingAuthority>>,
}

impl SealingClient {
    pub fn new(authority: Arc<dyn SealingAuthority>) -> Self {
        Self {
            authority: Some(authority),
        }
    }

    /// Client with no authority; every `seal` call fails with
    /// [`EvidenceError::SealingUnavailable`].
    pub fn unconfigured() -> Self {
        Self { authority: None }
    }

    pub fn is_configured(&self) -> bool {
        self.authority.is_some()
    }

    /// Seal a bundle.
    ///
    /// A 0.2.1 draft rejected with [`SealError::UnsupportedVersion`] is
    /// retried once as 0.2.0 with the summary moved into metadata. Every
    /// other failure propagates unchanged.
    pub async fn seal(
        &self,
        bundle: &EmittedBundle,
        sanitization: Option<SanitizationSummary>,
    ) -> Result<ImportBundle> {
        let result = self.try_seal(bundle, sanitization).await;
        match &result {
            Ok(sealed) => {
                METRICS.inc_bundles_sealed();
                obs::emit_bundle_sealed(
                    &sealed.bundle_id,
                    sealed.version.as_str(),
                    &sealed.immutability_proof.root_hash,
                );
            }
            Err(e) => {
                METRICS.inc_seal_failures();
                obs::emit_seal_failed(&bundle.bundle_id, e);
            }
        }
        result
    }

    async fn try_seal(
        &self,
        bundle: &EmittedBundle,
        sanitization: Option<SanitizationSummary>,
    ) -> Result<ImportBundle> {
        let authority = self.authority.as_ref().ok_or_else(|| {
            EvidenceError::SealingUnavailable("no sealing authority configured".to_string())
        })?;

        let mut draft = SealDraft::from_bundle(bundle, sanitization);
        let sealed = match authority.seal(&draft).await {
            Err(SealError::UnsupportedVersion { version }) if version == SchemaVersion::V0_2_1 => {
                METRICS.inc_version_downgrades();
                obs::emit_version_downgrade(
                    &draft.bundle_id,
                    SchemaVersion::V0_2_1.as_str(),
                    SchemaVersion::V0_2_0.as_str(),
                );
                draft.downgrade()?;
                authority.seal(&draft).await?
            }
            other => other?,
        };

        let proof = sealed.immutability_proof.ok_or_else(|| {
            EvidenceError::SealingRejected("authority returned no immutability proof".to_string())
        })?;
        if !is_hash_literal(&proof.root_hash) {
            return Err(EvidenceError::SealingRejected(format!(
                "root hash {:?} is not a sha256 literal",
                proof.root_hash
            )));
        }
        check_items_match(&draft.items, &sealed.items)?;
        check_proof_covers(&proof, &sealed.items)
            .map_err(|e| EvidenceError::SealingRejected(format!("malformed proof: {e}")))?;

        Ok(ImportBundle {
            bundle_id: draft.bundle_id,
            version: draft.version,
            created_at: draft.created_at,
            items: sealed.items,
            immutability_proof: proof,
            sanitization: draft.sanitization,
            metadata: draft.metadata,
        })
    }
}

/// The authority must return exactly the drafted items, in order, each
/// hashed over its canonical content.
fn check_items_match(drafted: &[DraftItem], sealed: &[ImportItem]) -> Result<()> {
    if drafted.len() != sealed.len() {
        return Err(EvidenceError::SealingRejected(format!(
            "authority returned {} items for {} drafted",
            sealed.len(),
            drafted.len()
        )));
    }
    for (d, s) in drafted.iter().zip(sealed) {
        if d.item_id != s.item_id || d.content_type != s.content_type || d.content != s.content {
            return Err(EvidenceError::SealingRejected(format!(
                "authority altered item {}",
                d.item_id
            )));
        }
        if !is_hash_literal(&s.content_hash) {
            return Err(EvidenceError::SealingRejected(format!(
                "item {} hash {:?} is not a sha256 literal",
                s.item_id, s.content_hash
            )));
        }
        if s.content_hash != hash_canonical(&s.content) {
            return Err(EvidenceError::SealingRejected(format!(
                "item {} hash does not cover its content",
                s.item_id
            )));
        }
    }
    Ok(())
}
