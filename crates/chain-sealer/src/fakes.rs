//! In-memory sealing authorities (testing only)
//!
//! `ScriptedSealer` replays queued outcomes and records every draft it sees;
//! `UnavailableSealer` always reports the authority as unreachable.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use evidence_core::{SealDraft, SealError, SealedDraft, SealingAuthority};

use crate::sealer::seal_items;

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Seal with the reference hash chain.
    Seal,
    /// Return the items but no proof.
    NoProof,
    /// Return a hand-built response as is.
    Respond(SealedDraft),
    UnsupportedVersion,
    Unavailable(String),
    Rejected(String),
}

/// Replays [`Scripted`] outcomes in order; seals normally once the queue
/// is empty.
#[derive(Debug, Default)]
pub struct ScriptedSealer {
    script: Mutex<VecDeque<Scripted>>,
    drafts: Mutex<Vec<SealDraft>>,
}

impl ScriptedSealer {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            drafts: Mutex::default(),
        }
    }

    /// Drafts received so far, in call order.
    pub fn drafts(&self) -> Vec<SealDraft> {
        self.drafts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls(&self) -> usize {
        self.drafts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl SealingAuthority for ScriptedSealer {
    async fn seal(&self, draft: &SealDraft) -> Result<SealedDraft, SealError> {
        self.drafts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(draft.clone());
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Scripted::Seal);

        match next {
            Scripted::Seal => Ok(seal_items(&draft.items)),
            Scripted::NoProof => Ok(SealedDraft {
                immutability_proof: None,
                ..seal_items(&draft.items)
            }),
            Scripted::Respond(response) => Ok(response),
            Scripted::UnsupportedVersion => Err(SealError::UnsupportedVersion {
                version: draft.version,
            }),
            Scripted::Unavailable(reason) => Err(SealError::Unavailable(reason)),
            Scripted::Rejected(reason) => Err(SealError::Rejected(reason)),
        }
    }
}

/// Authority that is never reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSealer;

#[async_trait]
impl SealingAuthority for UnavailableSealer {
    async fn seal(&self, _draft: &SealDraft) -> Result<SealedDraft, SealError> {
        Err(SealError::Unavailable("connection refused".to_string()))
    }
}
