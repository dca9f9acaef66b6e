//! Linear hash-chain sealing authority.

use std::collections::BTreeSet;

use async_trait::async_trait;
use evidence_core::{
    hash_canonical, sha256_literal, ChainLink, DraftItem, ImmutabilityProof, ImportItem,
    SchemaVersion, SealDraft, SealError, SealedDraft, SealingAuthority, CHAIN_ROOT_SENTINEL,
};

/// Hashes each item's canonical content and links the hashes in order.
///
/// `root_hash` is the SHA-256 literal of the link content hashes
/// concatenated in chain order.
#[derive(Debug, Clone)]
pub struct HashChainSealer {
    supported: BTreeSet<SchemaVersion>,
}

impl Default for HashChainSealer {
    fn default() -> Self {
        Self::new()
    }
}

impl HashChainSealer {
    /// Accepts every schema version this build knows.
    pub fn new() -> Self {
        Self::supporting([SchemaVersion::V0_2_0, SchemaVersion::V0_2_1])
    }

    /// Accepts only the given versions; used to model older authorities.
    pub fn supporting(versions: impl IntoIterator<Item = SchemaVersion>) -> Self {
        Self {
            supported: versions.into_iter().collect(),
        }
    }

    pub fn supports(&self, version: SchemaVersion) -> bool {
        self.supported.contains(&version)
    }
}

#[async_trait]
impl SealingAuthority for HashChainSealer {
    async fn seal(&self, draft: &SealDraft) -> Result<SealedDraft, SealError> {
        if !self.supports(draft.version) {
            tracing::debug!(version = %draft.version, "rejecting unsupported schema version");
            return Err(SealError::UnsupportedVersion {
                version: draft.version,
            });
        }
        if draft.items.is_empty() {
            return Err(SealError::Rejected("draft has no items".to_string()));
        }
        if draft.version == SchemaVersion::V0_2_0 && draft.sanitization.is_some() {
            return Err(SealError::Rejected(
                "top-level sanitization requires schema 0.2.1".to_string(),
            ));
        }
        Ok(seal_items(&draft.items))
    }
}

/// Hash and chain draft items.
pub fn seal_items(drafted: &[DraftItem]) -> SealedDraft {
    let items: Vec<ImportItem> = drafted
        .iter()
        .map(|d| ImportItem {
            item_id: d.item_id.clone(),
            content_type: d.content_type.clone(),
            content: d.content.clone(),
            content_hash: hash_canonical(&d.content),
        })
        .collect();
    let proof = chain_items(&items);
    SealedDraft {
        items,
        immutability_proof: Some(proof),
    }
}

/// Build the proof for already hashed items.
pub fn chain_items(items: &[ImportItem]) -> ImmutabilityProof {
    let mut previous = CHAIN_ROOT_SENTINEL.to_string();
    let mut hash_chain = Vec::with_capacity(items.len());
    for (sequence, item) in items.iter().enumerate() {
        hash_chain.push(ChainLink {
            item_id: item.item_id.clone(),
            content_type: item.content_type.clone(),
            content_hash: item.content_hash.clone(),
            previous_hash: std::mem::replace(&mut previous, item.content_hash.clone()),
            sequence: sequence as u64,
        });
    }
    let root_hash = root_hash(&hash_chain);
    ImmutabilityProof {
        hash_chain,
        root_hash,
    }
}

/// SHA-256 literal over the concatenated link content hashes.
pub fn root_hash(chain: &[ChainLink]) -> String {
    let joined: String = chain.iter().map(|l| l.content_hash.as_str()).collect();
    sha256_literal(joined.as_bytes())
}
