//! Offline verification of sealed bundles produced by [`HashChainSealer`].
//!
//! [`HashChainSealer`]: crate::HashChainSealer

use evidence_core::{hash_canonical, ChainError, ImportBundle};
use serde::Serialize;

use crate::sealer::root_hash;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("item {item_id} content hash {found} does not match its content ({expected})")]
    ContentHash {
        item_id: String,
        expected: String,
        found: String,
    },

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Summary of a bundle that passed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub bundle_id: String,
    pub version: String,
    pub items: usize,
    pub root_hash: String,
}

/// Recompute item hashes, chain linkage and the root hash.
pub fn verify_import_bundle(bundle: &ImportBundle) -> Result<VerifyReport, VerifyError> {
    for item in &bundle.items {
        let expected = hash_canonical(&item.content);
        if expected != item.content_hash {
            return Err(VerifyError::ContentHash {
                item_id: item.item_id.clone(),
                expected,
                found: item.content_hash.clone(),
            });
        }
    }
    bundle.verify_structure()?;

    let proof = &bundle.immutability_proof;
    let expected_root = root_hash(&proof.hash_chain);
    if expected_root != proof.root_hash {
        return Err(ChainError::RootMismatch {
            expected: expected_root,
            found: proof.root_hash.clone(),
        }
        .into());
    }

    Ok(VerifyReport {
        bundle_id: bundle.bundle_id.clone(),
        version: bundle.version.to_string(),
        items: bundle.items.len(),
        root_hash: proof.root_hash.clone(),
    })
}
