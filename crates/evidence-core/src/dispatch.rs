//! Webhook dispatch: pick a provider, authenticate, normalize.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::domain::{EvidenceError, NormalizedEvent, Result};
use crate::obs;

/// Raw inbound webhook. Header names are stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookRequest {
    headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl WebhookRequest {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }
}

/// How a provider authenticated a request it accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// Signature or shared token checked.
    Verified,
    /// Accepted without any credential.
    Unauthenticated,
}

/// One source-control platform.
pub trait WebhookProvider: Send + Sync {
    fn name(&self) -> &str;

    fn matches(&self, request: &WebhookRequest) -> bool;

    /// Check the request's signature or token. `Err` carries the reason.
    fn validate(&self, request: &WebhookRequest) -> std::result::Result<Validation, String>;

    fn parse(&self, request: &WebhookRequest) -> Result<NormalizedEvent>;
}

/// Security-relevant outcomes of dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityEvent {
    /// A provider accepted a request with no credential at all.
    UnauthenticatedCatchAll { provider: String },
    /// A provider matched but the credential did not check out.
    SignatureRejected { provider: String, reason: String },
}

impl SecurityEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnauthenticatedCatchAll { .. } => "unauthenticated_catch_all",
            Self::SignatureRejected { .. } => "signature_rejected",
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            Self::UnauthenticatedCatchAll { provider } => provider,
            Self::SignatureRejected { provider, .. } => provider,
        }
    }
}

/// Sink for [`SecurityEvent`]s.
pub trait SecurityReporter: Send + Sync {
    fn report(&self, event: SecurityEvent);
}

/// Logs security events at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl SecurityReporter for TracingReporter {
    fn report(&self, event: SecurityEvent) {
        let detail = match &event {
            SecurityEvent::UnauthenticatedCatchAll { .. } => {
                "request accepted without authentication".to_string()
            }
            SecurityEvent::SignatureRejected { reason, .. } => reason.clone(),
        };
        obs::emit_security_event(event.kind(), event.provider(), &detail);
    }
}

/// Collects events in memory; for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<SecurityEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl SecurityReporter for MemoryReporter {
    fn report(&self, event: SecurityEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Ordered provider list; first match wins.
#[derive(Clone)]
pub struct WebhookHandler {
    providers: Vec<Arc<dyn WebhookProvider>>,
    reporter: Arc<dyn SecurityReporter>,
}

impl Default for WebhookHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookHandler {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Append a provider; registration order is match order.
    pub fn with_provider(mut self, provider: Arc<dyn WebhookProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn SecurityReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Route a request to its provider and normalize it.
    pub fn handle(&self, request: &WebhookRequest) -> Result<NormalizedEvent> {
        let provider = self
            .providers
            .iter()
            .find(|p| p.matches(request))
            .ok_or(EvidenceError::NoMatchingProvider)?;

        match provider.validate(request) {
            Ok(Validation::Verified) => {}
            Ok(Validation::Unauthenticated) => {
                self.reporter.report(SecurityEvent::UnauthenticatedCatchAll {
                    provider: provider.name().to_string(),
                });
            }
            Err(reason) => {
                self.reporter.report(SecurityEvent::SignatureRejected {
                    provider: provider.name().to_string(),
                    reason: reason.clone(),
                });
                return Err(EvidenceError::SignatureValidation {
                    provider: provider.name().to_string(),
                    reason,
                });
            }
        }

        tracing::debug!(provider = provider.name(), "webhook matched provider");
        provider.parse(request)
    }
}
