//! Webhook providers for GuardSpine evidence.
//!
//! Each provider recognises one platform's deliveries, checks their
//! credential and normalizes the payload into a [`NormalizedEvent`].
//!
//! [`NormalizedEvent`]: evidence_core::NormalizedEvent

use std::sync::Arc;

use evidence_core::{SecurityReporter, WebhookHandler};

pub mod generic;
pub mod github;
pub mod gitlab;
mod payload;
pub mod signature;

pub use generic::GenericProvider;
pub use github::GitHubProvider;
pub use gitlab::GitLabProvider;

/// Credentials for [`default_handler`]. Unset fields leave that provider
/// rejecting (GitHub, GitLab) or unauthenticated (generic).
#[derive(Debug, Clone, Default)]
pub struct ProviderSecrets {
    pub github_secret: Option<String>,
    pub gitlab_token: Option<String>,
    pub generic_token: Option<String>,
}

/// GitHub, then GitLab, then the generic catch-all.
pub fn default_handler(
    secrets: &ProviderSecrets,
    reporter: Arc<dyn SecurityReporter>,
) -> WebhookHandler {
    let github = match &secrets.github_secret {
        Some(s) => GitHubProvider::new(s.as_bytes()),
        None => GitHubProvider::without_secret(),
    };
    let gitlab = match &secrets.gitlab_token {
        Some(t) => GitLabProvider::new(t.as_str()),
        None => GitLabProvider::without_token(),
    };
    let generic = match &secrets.generic_token {
        Some(t) => GenericProvider::with_token(t.as_str()),
        None => GenericProvider::unauthenticated(),
    };
    WebhookHandler::new()
        .with_provider(Arc::new(github))
        .with_provider(Arc::new(gitlab))
        .with_provider(Arc::new(generic))
        .with_reporter(reporter)
}
