//! Provider-agnostic webhook event record.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of source-control occurrence a webhook describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PullRequest,
    Push,
    CheckRun,
    MergeRequest,
    #[serde(other)]
    Unknown,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PullRequest => "pull_request",
            Self::Push => "push",
            Self::CheckRun => "check_run",
            Self::MergeRequest => "merge_request",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One webhook occurrence after provider-specific parsing.
///
/// Produced once by a provider and never mutated afterwards. The pipeline
/// only reads `provider` verbatim; it never branches on provider identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub provider: String,
    pub event_type: EventType,
    pub repo: String,
    #[serde(default)]
    pub pr_number: Option<u64>,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub diff_url: Option<String>,
    pub author: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub changed_files: BTreeSet<String>,
    #[serde(default)]
    pub action: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Opaque provider payload. `Null` means no payload was retained.
    #[serde(default)]
    pub raw_payload: serde_json::Value,
}

impl NormalizedEvent {
    /// Minimal event with everything optional left empty.
    pub fn new(
        provider: impl Into<String>,
        event_type: EventType,
        repo: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            event_type,
            repo: repo.into(),
            pr_number: None,
            sha: None,
            diff_url: None,
            author: author.into(),
            labels: Vec::new(),
            changed_files: BTreeSet::new(),
            action: None,
            timestamp: Utc::now(),
            raw_payload: serde_json::Value::Null,
        }
    }

    pub fn with_pr_number(mut self, number: u64) -> Self {
        self.pr_number = Some(number);
        self
    }

    pub fn with_sha(mut self, sha: impl Into<String>) -> Self {
        self.sha = Some(sha.into());
        self
    }

    pub fn with_diff_url(mut self, url: impl Into<String>) -> Self {
        self.diff_url = Some(url.into());
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_changed_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changed_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_raw_payload(mut self, payload: serde_json::Value) -> Self {
        self.raw_payload = payload;
        self
    }

    /// The raw payload, unless none was retained.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        if self.raw_payload.is_null() {
            None
        } else {
            Some(&self.raw_payload)
        }
    }
}
