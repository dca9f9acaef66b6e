//! Pipeline configuration: risk mapping and sanitization salt.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::{EvidenceError, Result};

/// Tier returned when neither labels nor paths match.
pub const DEFAULT_RISK_TIER: &str = "unknown";

/// Ordered mapping of risk tier to path prefixes.
///
/// Tiers are tried in the order they were supplied, so this keeps document
/// order when read from JSON instead of going through a hash or sorted map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskPaths(Vec<(String, Vec<String>)>);

impl RiskPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tier; later tiers only win when earlier ones do not match.
    pub fn with_tier<I, S>(mut self, tier: impl Into<String>, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .push((tier.into(), prefixes.into_iter().map(Into::into).collect()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(t, p)| (t.as_str(), p.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for RiskPaths {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (tier, prefixes) in &self.0 {
            map.serialize_entry(tier, prefixes)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RiskPaths {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = RiskPaths;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of risk tier to path prefixes")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<RiskPaths, A::Error> {
                let mut entries = Vec::new();
                while let Some((tier, prefixes)) = access.next_entry::<String, Vec<String>>()? {
                    entries.push((tier, prefixes));
                }
                Ok(RiskPaths(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

fn default_risk_tier() -> String {
    DEFAULT_RISK_TIER.to_string()
}

/// Label and path rules used by the risk classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskConfig {
    #[serde(default)]
    pub risk_labels: HashMap<String, String>,
    #[serde(default)]
    pub risk_paths: RiskPaths,
    #[serde(default = "default_risk_tier")]
    pub default_risk_tier: String,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_labels: HashMap::new(),
            risk_paths: RiskPaths::new(),
            default_risk_tier: default_risk_tier(),
        }
    }
}

impl RiskConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>, tier: impl Into<String>) -> Self {
        self.risk_labels.insert(label.into(), tier.into());
        self
    }

    pub fn with_paths(mut self, paths: RiskPaths) -> Self {
        self.risk_paths = paths;
        self
    }

    pub fn with_default_tier(mut self, tier: impl Into<String>) -> Self {
        self.default_risk_tier = tier.into();
        self
    }
}

/// Top-level configuration for an [`EvidencePipeline`](crate::EvidencePipeline).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    #[serde(default)]
    pub risk: RiskConfig,
    /// Fingerprint of the salt the sanitizer keys its tokens with.
    #[serde(default)]
    pub salt_fingerprint: Option<String>,
}

impl PipelineConfig {
    /// Read a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&data).map_err(|e| {
            EvidenceError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// Defaults overridden by `GUARDSPINE_DEFAULT_RISK_TIER` and
    /// `GUARDSPINE_SALT_FINGERPRINT` when set.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment overrides on top of an existing config.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(tier) = std::env::var("GUARDSPINE_DEFAULT_RISK_TIER") {
            if !tier.is_empty() {
                self.risk.default_risk_tier = tier;
            }
        }
        if let Ok(fp) = std::env::var("GUARDSPINE_SALT_FINGERPRINT") {
            if !fp.is_empty() {
                self.salt_fingerprint = Some(fp);
            }
        }
        self
    }

    pub fn with_risk(mut self, risk: RiskConfig) -> Self {
        self.risk = risk;
        self
    }

    pub fn with_salt_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.salt_fingerprint = Some(fingerprint.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_risk_paths_keep_document_order() {
        let config: RiskConfig = serde_json::from_str(
            r#"{ "riskPaths": { "medium": ["src/"], "critical": ["src/auth/"], "low": ["docs/"] } }"#,
        )
        .unwrap();
        let tiers: Vec<&str> = config.risk_paths.iter().map(|(t, _)| t).collect();
        assert_eq!(tiers, vec!["medium", "critical", "low"]);
    }

    #[test]
    fn test_risk_paths_serialize_as_map() {
        let paths = RiskPaths::new()
            .with_tier("critical", ["src/auth/"])
            .with_tier("low", ["docs/"]);
        let json = serde_json::to_string(&paths).unwrap();
        assert_eq!(json, r#"{"critical":["src/auth/"],"low":["docs/"]}"#);
    }

    #[test]
    fn test_default_tier_is_unknown() {
        let config: RiskConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.default_risk_tier, "unknown");
        assert_eq!(RiskConfig::default().default_risk_tier, "unknown");
    }

    #[test]
    fn test_pipeline_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "risk": {{ "riskLabels": {{ "bug": "high" }} }}, "saltFingerprint": "sha256:abcd" }}"#
        )
        .unwrap();
        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.risk.risk_labels.get("bug").map(String::as_str), Some("high"));
        assert_eq!(config.salt_fingerprint.as_deref(), Some("sha256:abcd"));
    }

    #[test]
    fn test_invalid_config_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = PipelineConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, EvidenceError::InvalidConfig(_)));
    }
}
