//! Composes individual signals into a single prior risk score.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use slopguard_core::language::Language;
use slopguard_core::protocol::{RiskLevel, SandboxContext};

use crate::signals::{
    install_signal, metadata_signal, name_signal, registry_signal, RegistryMeta, SignalResult,
};

/// Fixed blend weights per signal category.
const REGISTRY_WEIGHT: f64 = 1.0;
const NAME_WEIGHT: f64 = 0.8;
const INSTALL_WEIGHT: f64 = 0.6;
const METADATA_WEIGHT: f64 = 0.4;

/// Normalization divisor keeping the weighted sum in [0, 1].
const BLEND_DIVISOR: f64 = 3.0;

const NO_RED_FLAGS: &str = "No strong red flags detected";

/// The static prior for one package: score, level, summary and the
/// per-category signals that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorAssessment {
    pub name: String,
    pub language: String,
    /// Blended risk score in [0, 1].
    pub score: f64,
    pub risk_level: RiskLevel,
    /// Joined reasons of every non-zero signal, or a no-findings fallback.
    pub summary: String,
    /// Per-category signals, keyed by category name (stable order).
    pub signals: BTreeMap<String, SignalResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_url: Option<String>,
}

impl PriorAssessment {
    /// The subset of this assessment the sandbox fusion engine consumes.
    pub fn to_context(&self) -> SandboxContext {
        SandboxContext {
            prior_level: self.risk_level,
            prior_score: self.score,
            original_language: self.language.clone(),
        }
    }
}

/// Weighted sum of signals, normalized and clamped to [0, 1].
fn combine_signals(signals: &BTreeMap<String, SignalResult>) -> f64 {
    let weight_for = |key: &str| match key {
        "registry" => REGISTRY_WEIGHT,
        "name" => NAME_WEIGHT,
        "install" => INSTALL_WEIGHT,
        "metadata" => METADATA_WEIGHT,
        _ => 0.0,
    };
    let total: f64 = signals
        .iter()
        .map(|(key, sig)| weight_for(key) * sig.score)
        .sum();
    (total / BLEND_DIVISOR).clamp(0.0, 1.0)
}

/// Joined reasons of every signal that contributed risk.
fn build_summary(signals: &BTreeMap<String, SignalResult>) -> String {
    let reasons: Vec<&str> = signals
        .values()
        .filter(|sig| sig.score > 0.0)
        .map(|sig| sig.reason.as_str())
        .collect();
    if reasons.is_empty() {
        NO_RED_FLAGS.to_string()
    } else {
        reasons.join("; ")
    }
}

fn signal_map(entries: [(&str, SignalResult); 4]) -> BTreeMap<String, SignalResult> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Calculate the static prior for a single package.
///
/// Two shortcuts bypass the weighted blend entirely:
/// - a known stdlib module is forced to zero risk;
/// - metadata that explicitly says the package does not exist forces
///   score 1.0 / high, since non-existence is close to dispositive for
///   typosquatting and hallucinated names.
pub fn score_package(
    name: &str,
    language: Language,
    meta: Option<&RegistryMeta>,
) -> PriorAssessment {
    let metadata_url = meta.and_then(|m| m.metadata_url.clone());

    if language.is_stdlib_module(name) {
        let reason = format!("{} stdlib module", language.name());
        tracing::debug!(package = name, %language, "stdlib allowlist hit");
        return PriorAssessment {
            name: name.to_string(),
            language: language.name().to_string(),
            score: 0.0,
            risk_level: RiskLevel::Low,
            summary: reason.clone(),
            signals: signal_map([
                ("registry", SignalResult::new(0.0, "Stdlib")),
                ("name", SignalResult::new(0.0, reason)),
                ("install", SignalResult::new(0.0, "Stdlib")),
                ("metadata", SignalResult::new(0.0, "Stdlib")),
            ]),
            metadata_url,
        };
    }

    if meta.is_some_and(|m| m.exists == Some(false)) {
        let registry = registry_signal(meta);
        let summary = registry.reason.clone();
        return PriorAssessment {
            name: name.to_string(),
            language: language.name().to_string(),
            score: 1.0,
            risk_level: RiskLevel::High,
            summary,
            signals: signal_map([
                ("registry", registry),
                ("name", name_signal(name)),
                ("install", install_signal(meta)),
                ("metadata", metadata_signal(meta)),
            ]),
            metadata_url,
        };
    }

    let signals = signal_map([
        ("registry", registry_signal(meta)),
        ("name", name_signal(name)),
        ("install", install_signal(meta)),
        ("metadata", metadata_signal(meta)),
    ]);

    let score = combine_signals(&signals);
    let risk_level = RiskLevel::from_score(score);
    let summary = build_summary(&signals);

    tracing::debug!(package = name, %language, score, level = risk_level.as_str(), "prior scored");

    PriorAssessment {
        name: name.to_string(),
        language: language.name().to_string(),
        score,
        risk_level,
        summary,
        signals,
        metadata_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_stays_in_unit_interval() {
        // Worst case everywhere: non-metadata signals all maxed.
        let meta = RegistryMeta {
            exists: Some(true),
            has_install_scripts: true,
            ..Default::default()
        };
        let prior = score_package(
            "crypto-mining-hack-installer-updater-9000-xx",
            Language::Python,
            Some(&meta),
        );
        assert!(prior.score >= 0.0 && prior.score <= 1.0);
        assert_eq!(prior.risk_level, RiskLevel::from_score(prior.score));
    }

    #[test]
    fn stdlib_short_circuit() {
        let prior = score_package("math", Language::Python, None);
        assert_eq!(prior.score, 0.0);
        assert_eq!(prior.risk_level, RiskLevel::Low);
        assert_eq!(prior.summary, "Python stdlib module");
    }

    #[test]
    fn nonexistent_package_forces_high() {
        let meta = RegistryMeta {
            exists: Some(false),
            ..Default::default()
        };
        let prior = score_package("totally-made-up", Language::Python, Some(&meta));
        assert_eq!(prior.score, 1.0);
        assert_eq!(prior.risk_level, RiskLevel::High);
        assert!(prior.summary.contains("not found"));
    }

    #[test]
    fn missing_metadata_degrades_gracefully() {
        let prior = score_package("requests", Language::Python, None);
        // registry 0.3*1.0 + metadata 0.3*0.4 = 0.42 / 3.0 = 0.14
        assert!((prior.score - 0.14).abs() < 1e-9);
        assert_eq!(prior.risk_level, RiskLevel::Low);
        assert!(prior.summary.contains("No registry metadata"));
    }

    #[test]
    fn scoring_is_deterministic() {
        let meta = RegistryMeta {
            exists: Some(true),
            wheels_only: true,
            ..Default::default()
        };
        let a = score_package("numpy2", Language::Python, Some(&meta));
        let b = score_package("numpy2", Language::Python, Some(&meta));
        assert_eq!(a.score, b.score);
        assert_eq!(a.summary, b.summary);
    }

    #[test]
    fn clean_package_reports_no_red_flags() {
        let meta = RegistryMeta {
            exists: Some(true),
            repo: Some("https://github.com/psf/requests".into()),
            homepage: Some("https://requests.readthedocs.io".into()),
            license: Some("Apache-2.0".into()),
            ..Default::default()
        };
        let prior = score_package("requests", Language::Python, Some(&meta));
        assert_eq!(prior.score, 0.0);
        assert_eq!(prior.summary, "No strong red flags detected");
    }

    #[test]
    fn to_context_threads_prior() {
        let meta = RegistryMeta {
            exists: Some(false),
            ..Default::default()
        };
        let ctx = score_package("ghost-pkg", Language::JavaScript, Some(&meta)).to_context();
        assert!(ctx.prior_is_high());
        assert_eq!(ctx.original_language, "JavaScript");
    }
}
