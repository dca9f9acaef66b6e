//! Construction errors for redaction engines.

#[derive(Debug, thiserror::Error)]
pub enum RedactionError {
    #[error("invalid redaction rule {name}: {source}")]
    InvalidRule {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, RedactionError>;
