//! Hash-chain immutability proof attached to sealed bundles.

use serde::{Deserialize, Serialize};

/// `previous_hash` of the first link in every chain.
pub const CHAIN_ROOT_SENTINEL: &str =
    "sha256:0000000000000000000000000000000000000000000000000000000000000000";

/// One link of the hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    pub item_id: String,
    pub content_type: String,
    pub content_hash: String,
    pub previous_hash: String,
    pub sequence: u64,
}

/// Ordered hash chain plus the root hash computed over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmutabilityProof {
    pub hash_chain: Vec<ChainLink>,
    pub root_hash: String,
}

/// Structural defects found in a proof.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("link {index} has sequence {found}")]
    SequenceGap { index: usize, found: u64 },

    #[error("link {index} previous_hash {found} does not match {expected}")]
    BrokenLink {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("proof has {links} links for {items} items")]
    LengthMismatch { links: usize, items: usize },

    #[error("link {index} does not describe item {item_id}: {field} differs")]
    ItemMismatch {
        index: usize,
        item_id: String,
        field: &'static str,
    },

    #[error("root hash mismatch: expected {expected}, got {found}")]
    RootMismatch { expected: String, found: String },
}

impl ImmutabilityProof {
    /// Check sequence numbering and previous-hash linkage.
    ///
    /// `chain[i].sequence == i` and `chain[i].previous_hash` equals
    /// `chain[i-1].content_hash` (the root sentinel for `i == 0`).
    pub fn verify_links(&self) -> Result<(), ChainError> {
        let mut expected_previous: &str = CHAIN_ROOT_SENTINEL;
        for (index, link) in self.hash_chain.iter().enumerate() {
            if link.sequence != index as u64 {
                return Err(ChainError::SequenceGap {
                    index,
                    found: link.sequence,
                });
            }
            if link.previous_hash != expected_previous {
                return Err(ChainError::BrokenLink {
                    index,
                    expected: expected_previous.to_string(),
                    found: link.previous_hash.clone(),
                });
            }
            expected_previous = link.content_hash.as_str();
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.hash_chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hash_chain.is_empty()
    }
}
