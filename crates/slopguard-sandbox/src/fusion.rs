//! Risk fusion: combine the static prior with classified sandbox telemetry
//! into a final verdict and confidence.
//!
//! The steps are ordered deliberately. Additive weighting first, then the
//! "definite bad" floor and the "inconclusive" cap, then, after clamping,
//! the low-prior guardrails. The guardrails exist so that well-known
//! low-risk packages are not flagged on incidental sandbox noise (flaky
//! installs, blocked DNS), while corroborated non-registry contact plus
//! host-touching behavior is dispositive regardless of prior.

use slopguard_core::protocol::{SandboxContext, MIN_CONFIDENCE};

use crate::telemetry::ClassifiedTelemetry;

/// All fusion thresholds and weights, as an explicit value passed into
/// [`fuse`] so tests can inject alternate sets. Defaults are the tuned
/// production constants; they are empirical, not load-bearing beyond the
/// invariants the tests assert.
#[derive(Debug, Clone)]
pub struct FusionWeights {
    /// Additive base every run starts from.
    pub base: f64,
    /// Prior bias when the static level is high (or score ≥ 0.7).
    pub prior_high: f64,
    /// Prior bias when the static score is ≥ 0.4.
    pub prior_elevated: f64,
    pub timeout: f64,
    pub install_failed: f64,
    pub container_nonzero_exit: f64,
    /// Per-endpoint weight over all unique endpoints, and its cap.
    pub per_endpoint: f64,
    pub endpoint_cap: f64,
    /// Per-benign-endpoint discount, and its cap.
    pub per_benign_discount: f64,
    pub benign_discount_cap: f64,
    /// Per-non-registry-endpoint weight (the strongest positive
    /// contributor) and its cap.
    pub per_other_endpoint: f64,
    pub other_endpoint_cap: f64,
    pub many_procs: f64,
    pub some_procs: f64,
    pub per_suspicious_read: f64,
    pub suspicious_read_cap: f64,
    pub many_reads: f64,
    pub per_suspicious_write: f64,
    pub suspicious_write_cap: f64,
    pub many_writes: f64,
    /// Floor forced by the definite-bad override.
    pub definite_bad_floor: f64,
    /// Cap applied when a failed install is the only story.
    pub inconclusive_cap: f64,
    /// Cap for a bare timeout with a low prior.
    pub bare_timeout_cap: f64,
    /// Cap for a low prior run with no adverse signal at all.
    pub quiet_run_cap: f64,
    /// Score at or above which the verdict flips to malicious.
    pub malicious_threshold: f64,
    /// Confidence bonus when the score clears this bar.
    pub confidence_bonus_above: f64,
    pub confidence_bonus: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            base: 0.05,
            prior_high: 0.25,
            prior_elevated: 0.10,
            timeout: 0.25,
            install_failed: 0.20,
            container_nonzero_exit: 0.05,
            per_endpoint: 0.04,
            endpoint_cap: 0.25,
            per_benign_discount: 0.02,
            benign_discount_cap: 0.20,
            per_other_endpoint: 0.08,
            other_endpoint_cap: 0.35,
            many_procs: 0.12,
            some_procs: 0.06,
            per_suspicious_read: 0.05,
            suspicious_read_cap: 0.20,
            many_reads: 0.05,
            per_suspicious_write: 0.08,
            suspicious_write_cap: 0.20,
            many_writes: 0.05,
            definite_bad_floor: 0.8,
            inconclusive_cap: 0.4,
            bare_timeout_cap: 0.3,
            quiet_run_cap: 0.35,
            malicious_threshold: 0.55,
            confidence_bonus_above: 0.6,
            confidence_bonus: 0.1,
        }
    }
}

/// Execution-level flags the classifier does not see.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunFlags {
    pub timed_out: bool,
    pub install_failed: bool,
    /// The outer container process exited nonzero (distinct from the
    /// install's own return code inside it).
    pub container_exit_nonzero: bool,
}

/// Final fused verdict for one scan.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub is_malicious: bool,
    /// Fused risk score in [0, 1].
    pub score: f64,
    /// Confidence in the verdict, in [0.2, 1.0].
    pub confidence: f64,
    /// Human-readable findings, in detection order.
    pub indicators: Vec<String>,
}

/// Fuse prior, run flags and classified telemetry into a verdict.
pub fn fuse(
    ctx: &SandboxContext,
    flags: RunFlags,
    telemetry: &ClassifiedTelemetry,
    weights: &FusionWeights,
) -> Verdict {
    let w = weights;
    let mut score = w.base;
    let mut indicators: Vec<String> = Vec::new();

    // 1. Prior bias.
    if ctx.prior_is_high() {
        score += w.prior_high;
        indicators.push(format!(
            "Static heuristics rated this package high risk ({:.2})",
            ctx.prior_score
        ));
    } else if ctx.prior_is_elevated() {
        score += w.prior_elevated;
    }

    // 2. Execution outcome.
    if flags.timed_out {
        score += w.timeout;
        indicators.push("Sandbox scan timed out".to_string());
    }
    if flags.install_failed {
        score += w.install_failed;
        indicators.push("Package installation failed".to_string());
    }
    if flags.container_exit_nonzero {
        score += w.container_nonzero_exit;
    }

    // 3. Network weighting: raw endpoint volume counts a little, registry
    // contact earns a discount, non-registry contact counts heavily.
    let total_net = telemetry.endpoints.len();
    if total_net > 0 {
        score += (w.per_endpoint * total_net as f64).min(w.endpoint_cap);
        score -= (w.per_benign_discount * telemetry.benign_net_count as f64)
            .min(w.benign_discount_cap);
    }
    if telemetry.other_net_count > 0 {
        score += (w.per_other_endpoint * telemetry.other_net_count as f64)
            .min(w.other_endpoint_cap);
        indicators.push(format!(
            "Contacted {} non-registry endpoint(s)",
            telemetry.other_net_count
        ));
    }

    // 4. Process weighting.
    if telemetry.proc_count > 5 {
        score += w.many_procs;
        indicators.push(format!("Spawned {} processes", telemetry.proc_count));
    } else if telemetry.proc_count > 1 {
        score += w.some_procs;
        indicators.push(format!("Spawned {} processes", telemetry.proc_count));
    }

    // 5. File weighting.
    if telemetry.suspicious_file_count > 0 {
        score += (w.per_suspicious_read * telemetry.suspicious_file_count as f64)
            .min(w.suspicious_read_cap);
        indicators.push(format!(
            "Read {} credential/secret path(s)",
            telemetry.suspicious_file_count
        ));
    } else if telemetry.file_op_count > 5 {
        score += w.many_reads;
    }
    if telemetry.suspicious_write_count > 0 {
        score += (w.per_suspicious_write * telemetry.suspicious_write_count as f64)
            .min(w.suspicious_write_cap);
        indicators.push(format!(
            "Wrote {} persistence/autostart path(s)",
            telemetry.suspicious_write_count
        ));
    } else if telemetry.file_write_count > 3 {
        score += w.many_writes;
    }

    // 6a. Definite bad: non-registry contact corroborated by process or
    // file activity overrides everything above.
    let definite_bad = telemetry.other_net_count > 0
        && (telemetry.proc_count > 0
            || telemetry.suspicious_file_count > 0
            || telemetry.suspicious_write_count > 0);
    if definite_bad && score < w.definite_bad_floor {
        score = w.definite_bad_floor;
        indicators.push(
            "Non-registry network contact combined with host activity".to_string(),
        );
    }

    // 6b. Inconclusive: a failed install with no non-registry contact and a
    // low prior is most likely a transient registry problem, not malware.
    let inconclusive =
        flags.install_failed && telemetry.other_net_count == 0 && !ctx.prior_is_elevated();
    if !definite_bad && inconclusive {
        score = score.min(w.inconclusive_cap);
    }

    // 7. Clamp.
    score = score.clamp(0.0, 1.0);

    // 8. Low-prior guardrails, after clamping and before the verdict.
    let mut forced_benign = false;
    if !ctx.prior_is_elevated() {
        let nothing_else = telemetry.endpoints.is_empty()
            && telemetry.proc_count == 0
            && telemetry.suspicious_file_count == 0
            && telemetry.suspicious_write_count == 0;
        if flags.timed_out && !flags.install_failed && nothing_else {
            // A bare timeout proves nothing by itself.
            forced_benign = true;
            score = score.min(w.bare_timeout_cap);
        } else if !flags.timed_out
            && !flags.install_failed
            && !telemetry.has_strong_signal()
        {
            forced_benign = true;
            score = score.min(w.quiet_run_cap);
        }
    }

    // 9. Verdict.
    let prior_corroborated = ctx.prior_is_high()
        && (flags.install_failed || !telemetry.endpoints.is_empty() || flags.timed_out);
    let is_malicious = !forced_benign && (score >= w.malicious_threshold || prior_corroborated);

    // 10. Confidence.
    let confidence = if score > w.confidence_bonus_above {
        score + w.confidence_bonus
    } else {
        score
    }
    .clamp(MIN_CONFIDENCE, 1.0);

    Verdict {
        is_malicious,
        score,
        confidence,
        indicators,
    }
}
