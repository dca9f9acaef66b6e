//! Domain model for webhook evidence.
//!
//! - `NormalizedEvent`: provider-agnostic webhook record (input)
//! - `EvidenceItem`: one hashed piece of content
//! - `SanitizationSummary`: aggregate redaction record
//! - `ImmutabilityProof`: hash chain attached at sealing time
//! - `ImportBundle`: sealed wire format (output)

pub mod error;
pub mod event;
pub mod import;
pub mod item;
pub mod proof;
pub mod summary;

pub use error::{EvidenceError, Result};
pub use event::{EventType, NormalizedEvent};
pub use import::{check_proof_covers, ImportBundle, ImportItem, SchemaVersion};
pub use item::{EvidenceItem, EvidenceKind};
pub use proof::{ChainError, ChainLink, ImmutabilityProof, CHAIN_ROOT_SENTINEL};
pub use summary::{SanitizationStatus, SanitizationSummary};
