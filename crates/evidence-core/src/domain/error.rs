//! Error taxonomy for the evidence pipeline.

/// Errors produced while turning a webhook into a sealed evidence bundle.
#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    #[error("no webhook provider matched the request")]
    NoMatchingProvider,

    #[error("signature validation failed for provider {provider}: {reason}")]
    SignatureValidation { provider: String, reason: String },

    #[error("invalid {provider} payload: {reason}")]
    InvalidPayload { provider: String, reason: String },

    #[error("sealing authority unavailable: {0}")]
    SealingUnavailable(String),

    #[error("sealing rejected: {0}")]
    SealingRejected(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvidenceError {
    /// Whether retrying the same call can succeed once a dependency recovers.
    ///
    /// An unreachable sealing authority and I/O failures qualify; everything
    /// else needs a configuration or input change first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SealingUnavailable(_) | Self::Io(_))
    }
}

/// Result type for evidence pipeline operations.
pub type Result<T> = std::result::Result<T, EvidenceError>;
