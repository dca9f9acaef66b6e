//! End-to-end driver: event in, sealed bundle out.

use std::sync::Arc;

use tracing::Instrument;

use crate::bundle::{assemble, EmittedBundle};
use crate::config::PipelineConfig;
use crate::domain::{ImportBundle, NormalizedEvent, Result, SanitizationSummary};
use crate::items::build_items;
use crate::metrics::METRICS;
use crate::obs;
use crate::risk::classify;
use crate::sanitize::{sanitize_items, Sanitizer};
use crate::seal::{SealingAuthority, SealingClient};

/// Fingerprint recorded when neither config nor engine supplies one.
pub const UNKNOWN_SALT_FINGERPRINT: &str = "unknown";

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct SealedEvidence {
    /// Assembled bundle with the proof attached.
    pub bundle: EmittedBundle,
    /// Wire form accepted by the import endpoint.
    pub import: ImportBundle,
}

/// Classify, build, assemble, sanitize and seal.
///
/// Shareable across tasks behind an `Arc`; each call is independent.
#[derive(Clone)]
pub struct EvidencePipeline {
    config: PipelineConfig,
    sanitizer: Option<Arc<dyn Sanitizer>>,
    sealer: SealingClient,
}

impl EvidencePipeline {
    /// Pipeline with no sanitizer and no sealing authority.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            sanitizer: None,
            sealer: SealingClient::unconfigured(),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    pub fn with_sealing_authority(mut self, authority: Arc<dyn SealingAuthority>) -> Self {
        self.sealer = SealingClient::new(authority);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Unsealed bundle for an event. Carries no integrity guarantee.
    pub fn draft(&self, event: &NormalizedEvent) -> EmittedBundle {
        let tier = classify(event, &self.config.risk);
        let bundle = assemble(event, build_items(event), tier);
        METRICS.inc_bundles_assembled();
        obs::emit_bundle_assembled(
            &bundle.bundle_id,
            &bundle.artifact_id,
            &bundle.risk_tier,
            bundle.items.len(),
        );
        bundle
    }

    /// Redact bundle items if a sanitizer is configured.
    pub async fn sanitize(
        &self,
        mut bundle: EmittedBundle,
    ) -> (EmittedBundle, Option<SanitizationSummary>) {
        let Some(sanitizer) = &self.sanitizer else {
            return (bundle, None);
        };
        let fingerprint = self
            .config
            .salt_fingerprint
            .clone()
            .or_else(|| sanitizer.salt_fingerprint())
            .unwrap_or_else(|| UNKNOWN_SALT_FINGERPRINT.to_string());

        let items = std::mem::take(&mut bundle.items);
        let (items, summary) = sanitize_items(items, sanitizer.as_ref(), &fingerprint).await;
        bundle.items = items;
        obs::emit_sanitization_completed(
            &bundle.bundle_id,
            &summary.status.to_string(),
            summary.redaction_count,
        );
        (bundle, Some(summary))
    }

    /// Seal an already assembled (and possibly sanitized) bundle.
    pub async fn seal(
        &self,
        mut bundle: EmittedBundle,
        sanitization: Option<SanitizationSummary>,
    ) -> Result<SealedEvidence> {
        let import = self.sealer.seal(&bundle, sanitization).await?;
        bundle.schema_version = import.version;
        bundle.immutability_proof = Some(import.immutability_proof.clone());
        Ok(SealedEvidence { bundle, import })
    }

    /// Full run for one event.
    pub async fn process(&self, event: &NormalizedEvent) -> Result<SealedEvidence> {
        let bundle = self.draft(event);
        let span = obs::bundle_span(&bundle.bundle_id);
        async move {
            let (bundle, summary) = self.sanitize(bundle).await;
            self.seal(bundle, summary).await
        }
        .instrument(span)
        .await
    }
}
