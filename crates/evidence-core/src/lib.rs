//! GuardSpine webhook evidence core.
//!
//! Turns a normalized webhook event into a sealed, tamper-evident evidence
//! bundle: risk classification, item construction, optional redaction and
//! hash-chain sealing through an external authority.

pub mod bundle;
pub mod canonical;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod items;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod risk;
pub mod sanitize;
pub mod seal;
pub mod telemetry;

pub use bundle::{artifact_id, assemble, scope, EmittedBundle};
pub use canonical::{canonical_json, hash_canonical, is_hash_literal, sha256_literal, HASH_PREFIX};
pub use config::{PipelineConfig, RiskConfig, RiskPaths, DEFAULT_RISK_TIER};
pub use dispatch::{
    MemoryReporter, SecurityEvent, SecurityReporter, TracingReporter, Validation,
    WebhookHandler, WebhookProvider, WebhookRequest,
};
pub use domain::{
    ChainError, ChainLink, EventType, EvidenceError, EvidenceItem, EvidenceKind,
    ImmutabilityProof, ImportBundle, ImportItem, NormalizedEvent, Result, SanitizationStatus,
    SanitizationSummary, SchemaVersion, CHAIN_ROOT_SENTINEL,
};
pub use items::build_items;
pub use pipeline::{EvidencePipeline, SealedEvidence};
pub use risk::classify;
pub use sanitize::{
    sanitize_items, EngineDescriptor, InputFormat, SanitizeError, SanitizeRequest,
    SanitizeResult, Sanitizer,
};
pub use seal::{DraftItem, SealDraft, SealError, SealedDraft, SealingAuthority, SealingClient};
pub use telemetry::init_tracing;

/// Crate version, also the highest bundle schema this build emits.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
