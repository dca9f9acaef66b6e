//! Risk tier classification: labels first, then paths, then the default.

use crate::config::RiskConfig;
use crate::domain::NormalizedEvent;

/// Map an event to a risk tier.
///
/// 1. The first of the event's labels (in event order) that appears in
///    `risk_labels` decides. Label order matters, tier severity does not.
/// 2. Otherwise the first tier in `risk_paths` (in config order) with a
///    prefix matching any changed file decides.
/// 3. Otherwise `default_risk_tier`.
pub fn classify(event: &NormalizedEvent, config: &RiskConfig) -> String {
    for label in &event.labels {
        if let Some(tier) = config.risk_labels.get(label) {
            return tier.clone();
        }
    }

    for (tier, prefixes) in config.risk_paths.iter() {
        let hit = event
            .changed_files
            .iter()
            .any(|file| prefixes.iter().any(|prefix| file.starts_with(prefix.as_str())));
        if hit {
            return tier.to_string();
        }
    }

    config.default_risk_tier.clone()
}
