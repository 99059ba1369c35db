//! Wire types shared with the browser-extension transport.
//!
//! These are the stable "currency" between the native-messaging layer
//! (external collaborator), the static scorer and the sandbox. Field names
//! are camelCase on the wire to match what the extension already speaks.

use serde::{Deserialize, Serialize};

use crate::language::Language;

/// Max network endpoint samples surfaced in a [`ScanResult`].
pub const MAX_NETWORK_SAMPLES: usize = 3;
/// Max file operation samples surfaced in a [`ScanResult`].
pub const MAX_FILE_SAMPLES: usize = 3;
/// Max process spawn samples surfaced in a [`ScanResult`].
pub const MAX_PROCESS_SAMPLES: usize = 10;

/// Confidence floor: even a conclusive benign verdict never claims less.
pub const MIN_CONFIDENCE: f64 = 0.2;

// ─── Request side ────────────────────────────────────────────────────────────

/// A deep-scan request as received from the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    /// Package name to scan. Empty names are rejected synchronously.
    pub package_name: String,
    /// Free-form language alias ("py", "node", ...); normalized via
    /// [`Language::from_alias`] before dispatch.
    pub language: String,
    /// Static-heuristic prior, when the caller already scored the package.
    #[serde(default)]
    pub context: Option<RequestContext>,
}

/// Prior assessment attached to a scan request by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// Heuristic risk level ("low"/"medium"/"high").
    #[serde(default)]
    pub risk_level: Option<String>,
    /// Heuristic score in [0, 1].
    #[serde(default)]
    pub score: Option<f64>,
    /// Language string as the caller originally saw it.
    #[serde(default)]
    pub original_language: Option<String>,
}

/// Response envelope: always a populated `result` or a non-empty `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScanResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResponse {
    pub fn ok(result: ScanResult) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(message.into()),
        }
    }
}

// ─── Prior / context ─────────────────────────────────────────────────────────

/// Static-heuristic risk levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// Score threshold at or above which a prior is "high".
pub const HIGH_THRESHOLD: f64 = 0.7;
/// Score threshold at or above which a prior is "medium".
pub const MEDIUM_THRESHOLD: f64 = 0.4;

impl RiskLevel {
    /// Deterministic score-to-level mapping.
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// The subset of the prior assessment threaded into a sandbox run.
///
/// The fusion guardrails are biased by these values: a low prior earns
/// benefit of the doubt on flaky installs, a high prior does not.
#[derive(Debug, Clone)]
pub struct SandboxContext {
    pub prior_level: RiskLevel,
    pub prior_score: f64,
    /// Language string as originally supplied (kept for reporting).
    pub original_language: String,
}

impl Default for SandboxContext {
    fn default() -> Self {
        Self {
            prior_level: RiskLevel::Low,
            prior_score: 0.0,
            original_language: String::new(),
        }
    }
}

impl SandboxContext {
    /// Build from the request context the transport layer handed us.
    /// Missing fields default to a low/0.0 prior.
    pub fn from_request(ctx: Option<&RequestContext>, language: Language) -> Self {
        let prior_score = ctx.and_then(|c| c.score).unwrap_or(0.0).clamp(0.0, 1.0);
        let prior_level = ctx
            .and_then(|c| c.risk_level.as_deref())
            .map(RiskLevel::from_str_loose)
            .unwrap_or_else(|| RiskLevel::from_score(prior_score));
        let original_language = ctx
            .and_then(|c| c.original_language.clone())
            .unwrap_or_else(|| language.name().to_string());
        Self {
            prior_level,
            prior_score,
            original_language,
        }
    }

    /// Whether the prior counts as high for fusion purposes.
    pub fn prior_is_high(&self) -> bool {
        self.prior_level == RiskLevel::High || self.prior_score >= HIGH_THRESHOLD
    }

    /// Whether the prior counts as at-least-medium for fusion purposes.
    pub fn prior_is_elevated(&self) -> bool {
        self.prior_level >= RiskLevel::Medium || self.prior_score >= MEDIUM_THRESHOLD
    }
}

// ─── Result side ─────────────────────────────────────────────────────────────

/// Terminal, serialized artifact of one deep scan.
///
/// When `error` is set the scan is inconclusive by construction: callers
/// must check it before trusting `is_malicious`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub package_name: String,
    pub language: String,
    pub is_malicious: bool,
    /// Confidence in the verdict, clamped to [0.2, 1.0].
    pub confidence: f64,
    /// Human-readable findings, in detection order.
    pub indicators: Vec<String>,
    /// Sample of observed network endpoints (≤ 3, first-seen order).
    pub network_connections: Vec<String>,
    /// Sample of observed file operations (≤ 3).
    pub file_operations: Vec<String>,
    /// Sample of observed process spawns (≤ 10).
    pub process_spawns: Vec<String>,
    /// Which scan strategy produced the telemetry ("docker", "libvirt").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResult {
    /// An inconclusive result carrying only an error message.
    pub fn inconclusive(package_name: &str, language: &str, error: impl Into<String>) -> Self {
        Self {
            package_name: package_name.to_string(),
            language: language.to_string(),
            is_malicious: false,
            confidence: MIN_CONFIDENCE,
            indicators: Vec::new(),
            network_connections: Vec::new(),
            file_operations: Vec::new(),
            process_spawns: Vec::new(),
            scanned_with: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_from_score_thresholds() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.39), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.4), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.69), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.7), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(1.0), RiskLevel::High);
    }

    #[test]
    fn context_from_request_defaults_low() {
        let ctx = SandboxContext::from_request(None, Language::Python);
        assert_eq!(ctx.prior_level, RiskLevel::Low);
        assert_eq!(ctx.prior_score, 0.0);
        assert_eq!(ctx.original_language, "Python");
    }

    #[test]
    fn context_from_request_reads_level_and_score() {
        let req = RequestContext {
            risk_level: Some("High".to_string()),
            score: Some(0.9),
            original_language: Some("py".to_string()),
        };
        let ctx = SandboxContext::from_request(Some(&req), Language::Python);
        assert!(ctx.prior_is_high());
        assert_eq!(ctx.original_language, "py");
    }

    #[test]
    fn context_level_derived_from_score_when_absent() {
        let req = RequestContext {
            risk_level: None,
            score: Some(0.5),
            original_language: None,
        };
        let ctx = SandboxContext::from_request(Some(&req), Language::JavaScript);
        assert_eq!(ctx.prior_level, RiskLevel::Medium);
        assert!(ctx.prior_is_elevated());
        assert!(!ctx.prior_is_high());
    }

    #[test]
    fn scan_request_wire_format_is_camel_case() {
        let raw = r#"{"packageName":"requests","language":"py","context":{"riskLevel":"low","score":0.1}}"#;
        let req: ScanRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.package_name, "requests");
        assert_eq!(req.context.unwrap().score, Some(0.1));
    }

    #[test]
    fn response_serializes_without_absent_fields() {
        let resp = ScanResponse::err("Package name is required");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"success\":false"));
        assert!(!json.contains("result"));
    }
}
