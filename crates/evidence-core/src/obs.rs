//! Structured tracing hooks for the bundle lifecycle.
//!
//! Every emit function logs one event with a stable `event` field so log
//! pipelines can filter on it. Degraded or failed paths log at `warn!`.

use tracing::{info, warn};

/// RAII guard that enters a bundle-scoped span for one pipeline run.
///
/// ```ignore
/// let _span = BundleSpan::enter(&bundle.bundle_id);
/// // every event below carries bundle_id
/// ```
pub struct BundleSpan {
    _span: tracing::span::EnteredSpan,
}

impl BundleSpan {
    pub fn enter(bundle_id: &str) -> Self {
        let span = tracing::info_span!("evidence.bundle", bundle_id = %bundle_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Bundle-scoped span for async work; attach with `Instrument::instrument`.
pub fn bundle_span(bundle_id: &str) -> tracing::Span {
    tracing::info_span!("evidence.bundle", bundle_id = %bundle_id)
}

pub fn emit_bundle_assembled(bundle_id: &str, artifact_id: &str, risk_tier: &str, items: usize) {
    info!(
        event = "bundle.assembled",
        bundle_id = %bundle_id,
        artifact_id = %artifact_id,
        risk_tier = %risk_tier,
        items = items,
    );
}

pub fn emit_sanitization_completed(bundle_id: &str, status: &str, redaction_count: u64) {
    info!(
        event = "sanitization.completed",
        bundle_id = %bundle_id,
        status = %status,
        redaction_count = redaction_count,
    );
}

/// One item's redaction could not be applied; content stays as it was.
pub fn emit_sanitization_degraded(item_index: usize, reason: &dyn std::fmt::Display) {
    warn!(event = "sanitization.degraded", item_index = item_index, reason = %reason);
}

pub fn emit_version_downgrade(bundle_id: &str, from: &str, to: &str) {
    warn!(
        event = "seal.version_downgrade",
        bundle_id = %bundle_id,
        from = %from,
        to = %to,
    );
}

pub fn emit_bundle_sealed(bundle_id: &str, version: &str, root_hash: &str) {
    info!(
        event = "bundle.sealed",
        bundle_id = %bundle_id,
        version = %version,
        root_hash = %root_hash,
    );
}

pub fn emit_seal_failed(bundle_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "seal.failed", bundle_id = %bundle_id, error = %error);
}

pub fn emit_security_event(kind: &str, provider: &str, detail: &str) {
    warn!(event = "security", kind = %kind, provider = %provider, detail = %detail);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_span_create() {
        let _span = BundleSpan::enter("bundle-123");
    }
}
