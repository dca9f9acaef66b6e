//! Reference sealing authority for GuardSpine evidence bundles.
//!
//! [`HashChainSealer`] implements the core `SealingAuthority` contract with
//! a linear SHA-256 chain; [`verify_import_bundle`] checks its output.

pub mod fakes;
pub mod sealer;
pub mod verify;

pub use sealer::{chain_items, root_hash, seal_items, HashChainSealer};
pub use verify::{verify_import_bundle, VerifyError, VerifyReport};
