//! Primitive risk signal helpers used by the prior scorer.
//!
//! Each signal scores one independent category in [0, 1] and carries a
//! short human-readable reason; the composer in [`crate::scoring`] blends
//! them with fixed weights.

use serde::{Deserialize, Serialize};

/// Name substrings that correlate with squatting campaigns.
const NAME_TOKENS: &[&str] = &["installer", "updater", "crypto", "mining", "hack", "typo"];

/// Name length beyond which the lexical signal adds risk.
const LONG_NAME_LEN: usize = 30;

/// An individual signal score and a short reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub score: f64,
    pub reason: String,
}

impl SignalResult {
    pub fn new(score: f64, reason: impl Into<String>) -> Self {
        Self {
            score,
            reason: reason.into(),
        }
    }
}

/// Registry metadata bundle supplied by the (external) registry fetcher.
///
/// The whole bundle is optional; every signal tolerates its absence and
/// degrades to a "missing metadata" score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryMeta {
    /// Whether the package exists in its registry. `Some(false)` is close
    /// to dispositive for hallucinated/typosquatted names.
    #[serde(default)]
    pub exists: Option<bool>,
    /// npm-style install/postinstall script hooks present.
    #[serde(default)]
    pub has_install_scripts: bool,
    /// Binary-only artifacts (wheels with no sdist).
    #[serde(default)]
    pub wheels_only: bool,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub metadata_url: Option<String>,
}

/// Lexical risk from the package name itself: suspicious tokens, digits,
/// hyphens, excessive length. Additive, capped at 1.0.
pub fn name_signal(name: &str) -> SignalResult {
    let lowered = name.trim().to_lowercase();
    if lowered.is_empty() {
        return SignalResult::new(0.4, "Missing name");
    }

    let mut risk: f64 = 0.0;
    let mut reasons: Vec<&str> = Vec::new();

    if NAME_TOKENS.iter().any(|token| lowered.contains(token)) {
        risk += 0.4;
        reasons.push("Suspicious token");
    }
    if lowered.chars().any(|c| c.is_ascii_digit()) {
        risk += 0.2;
        reasons.push("Contains digits");
    }
    if lowered.contains('-') {
        risk += 0.1;
        reasons.push("Contains hyphen");
    }
    if lowered.len() > LONG_NAME_LEN {
        risk += 0.1;
        reasons.push("Long name");
    }

    let reason = if reasons.is_empty() {
        "Benign name".to_string()
    } else {
        reasons.join(", ")
    };
    SignalResult::new(risk.min(1.0), reason)
}

/// Registry presence. Non-existence is the strongest single static signal.
pub fn registry_signal(meta: Option<&RegistryMeta>) -> SignalResult {
    match meta {
        None => SignalResult::new(0.3, "No registry metadata"),
        Some(m) if m.exists == Some(false) => {
            SignalResult::new(1.0, "Package not found in registry")
        }
        Some(_) => SignalResult::new(0.0, "Found in registry"),
    }
}

/// Install-time risk: lifecycle script hooks or binary-only artifacts.
pub fn install_signal(meta: Option<&RegistryMeta>) -> SignalResult {
    match meta {
        None => SignalResult::new(0.0, "No install flags"),
        Some(m) if m.has_install_scripts => SignalResult::new(0.6, "Installs with scripts"),
        Some(m) if m.wheels_only => SignalResult::new(0.3, "Wheels only (no sdist)"),
        Some(_) => SignalResult::new(0.0, "No install concerns"),
    }
}

/// Metadata completeness: each missing descriptive field among
/// {repo, homepage, license} contributes 1/3.
pub fn metadata_signal(meta: Option<&RegistryMeta>) -> SignalResult {
    let Some(m) = meta else {
        return SignalResult::new(0.3, "Missing metadata");
    };

    let mut missing: Vec<&str> = Vec::new();
    if m.repo.as_deref().map_or(true, str::is_empty) {
        missing.push("repo");
    }
    if m.homepage.as_deref().map_or(true, str::is_empty) {
        missing.push("homepage");
    }
    if m.license.as_deref().map_or(true, str::is_empty) {
        missing.push("license");
    }

    if missing.is_empty() {
        SignalResult::new(0.0, "Metadata present")
    } else {
        SignalResult::new(
            missing.len() as f64 / 3.0,
            format!("Missing {}", missing.join(", ")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_signal_accumulates_and_caps() {
        let clean = name_signal("requests");
        assert_eq!(clean.score, 0.0);
        assert_eq!(clean.reason, "Benign name");

        let bad = name_signal("crypto-miner-updater-installer-v2-extra-long-name");
        assert!((bad.score - 0.8).abs() < 1e-9); // token + digit + hyphen + length
        assert!(bad.reason.contains("Suspicious token"));
        assert!(bad.reason.contains("Long name"));

        assert_eq!(name_signal("").score, 0.4);
    }

    #[test]
    fn registry_signal_nonexistence_is_max() {
        let meta = RegistryMeta {
            exists: Some(false),
            ..Default::default()
        };
        assert_eq!(registry_signal(Some(&meta)).score, 1.0);
        assert_eq!(registry_signal(None).score, 0.3);

        let present = RegistryMeta {
            exists: Some(true),
            ..Default::default()
        };
        assert_eq!(registry_signal(Some(&present)).score, 0.0);
    }

    #[test]
    fn install_signal_prefers_scripts_over_wheels() {
        let both = RegistryMeta {
            has_install_scripts: true,
            wheels_only: true,
            ..Default::default()
        };
        assert_eq!(install_signal(Some(&both)).score, 0.6);

        let wheels = RegistryMeta {
            wheels_only: true,
            ..Default::default()
        };
        assert_eq!(install_signal(Some(&wheels)).score, 0.3);
        assert_eq!(install_signal(None).score, 0.0);
    }

    #[test]
    fn metadata_signal_counts_missing_fields() {
        let full = RegistryMeta {
            repo: Some("https://github.com/x/y".into()),
            homepage: Some("https://x.dev".into()),
            license: Some("MIT".into()),
            ..Default::default()
        };
        assert_eq!(metadata_signal(Some(&full)).score, 0.0);

        let partial = RegistryMeta {
            repo: Some("https://github.com/x/y".into()),
            ..Default::default()
        };
        let sig = metadata_signal(Some(&partial));
        assert!((sig.score - 2.0 / 3.0).abs() < 1e-9);
        assert!(sig.reason.contains("homepage"));
        assert!(sig.reason.contains("license"));
        assert!(!sig.reason.contains("repo"));
    }

    #[test]
    fn registry_meta_wire_format() {
        let raw = r#"{"exists":true,"hasInstallScripts":true,"license":"MIT"}"#;
        let meta: RegistryMeta = serde_json::from_str(raw).unwrap();
        assert_eq!(meta.exists, Some(true));
        assert!(meta.has_install_scripts);
        assert!(!meta.wheels_only);
    }
}
