//! In-process regex sanitizer with deterministic HMAC tokens.
//!
//! Every match is replaced by `[HIDDEN:<id>]`, where `<id>` is the first 12
//! hex characters of HMAC-SHA256(salt, matched text). The same secret under
//! the same salt always yields the same token, so redacted bundles can still
//! be correlated without revealing the value.
//!
//! JSON input is redacted per decoded string (keys and values), so escapes
//! such as `\n` never bleed into a match.

use std::collections::BTreeMap;

use async_trait::async_trait;
use evidence_core::{
    canonical_json, sha256_literal, EngineDescriptor, SanitizeError, SanitizeRequest,
    SanitizeResult, Sanitizer,
};
use hmac::{Hmac, Mac};
use regex::Regex;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{RedactionError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const ENGINE_NAME: &str = "guardspine-regex";
pub const METHOD: &str = "deterministic_hmac";
pub const TOKEN_FORMAT: &str = "[HIDDEN:<hmac12>]";

const TOKEN_HEX_LEN: usize = 12;

/// A named pattern; the name is the key in `redactions_by_type`.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub name: String,
    regex: Regex,
}

impl PatternRule {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self> {
        let name = name.into();
        let regex = Regex::new(pattern).map_err(|source| RedactionError::InvalidRule {
            name: name.clone(),
            source,
        })?;
        Ok(Self { name, regex })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

/// Patterns enabled by [`RegexSanitizer::with_default_rules`].
pub const DEFAULT_RULES: &[(&str, &str)] = &[
    (
        "private_key",
        r"(?s)-----BEGIN [A-Z ]*PRIVATE KEY-----.*?-----END [A-Z ]*PRIVATE KEY-----",
    ),
    ("github_token", r"\bgh[pousr]_[A-Za-z0-9]{36,}\b"),
    ("aws_access_key", r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b"),
    ("bearer_token", r"(?i)\bbearer\s+[A-Za-z0-9\-._~+/]+=*"),
    ("email", r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}"),
];

pub struct RegexSanitizer {
    salt: Vec<u8>,
    rules: Vec<PatternRule>,
}

impl RegexSanitizer {
    /// Sanitizer with no rules; add them with [`with_rule`](Self::with_rule).
    pub fn new(salt: impl Into<Vec<u8>>) -> Self {
        Self {
            salt: salt.into(),
            rules: Vec::new(),
        }
    }

    pub fn with_default_rules(salt: impl Into<Vec<u8>>) -> Result<Self> {
        DEFAULT_RULES
            .iter()
            .try_fold(Self::new(salt), |engine, (name, pattern)| {
                Ok(engine.with_rule(PatternRule::new(*name, pattern)?))
            })
    }

    pub fn with_rule(mut self, rule: PatternRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    /// `sha256:` + first 16 hex of SHA-256(salt).
    pub fn fingerprint(&self) -> String {
        let digest = hex::encode(Sha256::digest(&self.salt));
        format!("sha256:{}", &digest[..16])
    }

    /// Deterministic replacement token for one matched value.
    pub fn token_for(&self, value: &str) -> String {
        let digest = match HmacSha256::new_from_slice(&self.salt) {
            Ok(mut mac) => {
                mac.update(value.as_bytes());
                hex::encode(mac.finalize().into_bytes())
            }
            Err(_) => hex::encode(Sha256::digest(value.as_bytes())),
        };
        format!("[HIDDEN:{}]", &digest[..TOKEN_HEX_LEN])
    }

    /// Apply every rule in order; returns the text and per-rule counts.
    pub fn redact(&self, text: &str) -> (String, BTreeMap<String, u64>) {
        let mut output = text.to_string();
        let mut counts = BTreeMap::new();
        for rule in &self.rules {
            let mut hits = 0u64;
            let replaced = rule
                .regex
                .replace_all(&output, |caps: &regex::Captures<'_>| {
                    hits += 1;
                    self.token_for(&caps[0])
                })
                .into_owned();
            if hits > 0 {
                counts.insert(rule.name.clone(), hits);
                output = replaced;
            }
        }
        (output, counts)
    }

    /// Redact every string key and value of a JSON document.
    pub fn redact_value(&self, value: &Value) -> (Value, BTreeMap<String, u64>) {
        let mut counts = BTreeMap::new();
        let redacted = self.redact_node(value, &mut counts);
        (redacted, counts)
    }

    fn redact_node(&self, value: &Value, counts: &mut BTreeMap<String, u64>) -> Value {
        match value {
            Value::String(s) => Value::String(self.redact_into(s, counts)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.redact_node(item, counts))
                    .collect(),
            ),
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, item) in map {
                    let key = self.redact_into(key, counts);
                    let item = self.redact_node(item, counts);
                    out.insert(key, item);
                }
                Value::Object(out)
            }
            other => other.clone(),
        }
    }

    fn redact_into(&self, text: &str, counts: &mut BTreeMap<String, u64>) -> String {
        let (output, hits) = self.redact(text);
        for (name, n) in hits {
            *counts.entry(name).or_insert(0) += n;
        }
        output
    }
}

#[async_trait]
impl Sanitizer for RegexSanitizer {
    fn descriptor(&self) -> EngineDescriptor {
        EngineDescriptor {
            name: ENGINE_NAME.to_string(),
            version: evidence_core::VERSION.to_string(),
            method: METHOD.to_string(),
            token_format: TOKEN_FORMAT.to_string(),
        }
    }

    fn salt_fingerprint(&self) -> Option<String> {
        Some(self.fingerprint())
    }

    async fn sanitize(
        &self,
        text: &str,
        _request: &SanitizeRequest,
    ) -> std::result::Result<SanitizeResult, SanitizeError> {
        let (sanitized, counts) = match serde_json::from_str::<Value>(text) {
            Ok(value) => {
                let (value, counts) = self.redact_value(&value);
                (canonical_json(&value), counts)
            }
            Err(_) => self.redact(text),
        };
        let sanitized = if counts.is_empty() {
            text.to_string()
        } else {
            sanitized
        };
        let redaction_count = counts.values().sum();
        Ok(SanitizeResult {
            changed: redaction_count > 0,
            redaction_count,
            redactions_by_type: counts,
            engine_name: Some(ENGINE_NAME.to_string()),
            engine_version: Some(evidence_core::VERSION.to_string()),
            method: Some(METHOD.to_string()),
            input_hash: Some(sha256_literal(text.as_bytes())),
            output_hash: Some(sha256_literal(sanitized.as_bytes())),
            sanitized_text: sanitized,
        })
    }
}
