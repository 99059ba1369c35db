//! Deep-scan orchestration: pick a strategy, run it, classify, fuse,
//! assemble the wire-level [`ScanResult`].

use slopguard_core::config::SandboxLimits;
use slopguard_core::language::Language;
use slopguard_core::protocol::{
    SandboxContext, ScanResult, MAX_FILE_SAMPLES, MAX_NETWORK_SAMPLES, MIN_CONFIDENCE,
};

use crate::docker::DockerStrategy;
use crate::fusion::{fuse, FusionWeights, RunFlags};
use crate::libvirt::LibvirtStrategy;
use crate::strategy::{LaunchError, SandboxRun, ScanStrategy};
use crate::telemetry::classify;

const NO_RUNTIME_ERROR: &str =
    "No sandbox runtime available (docker daemon down and no VM fallback)";

fn launch_failed_error(reason: &str) -> String {
    format!("Sandbox launch failed: {reason}")
}

/// Strategies in preference order: containers are fast, VMs are the
/// fallback.
fn strategies() -> Vec<Box<dyn ScanStrategy>> {
    vec![Box::new(DockerStrategy), Box::new(LibvirtStrategy)]
}

/// Execute a full behavioral deep scan for one package.
///
/// Never panics and never returns `Err`: every failure mode is encoded in
/// the [`ScanResult`] itself (inconclusive with `error` set) so the
/// transport layer has exactly one shape to forward.
pub fn deep_scan(
    package: &str,
    language: Language,
    ctx: &SandboxContext,
    limits: &SandboxLimits,
) -> ScanResult {
    deep_scan_with(&strategies(), package, language, ctx, limits)
}

fn deep_scan_with(
    strategies: &[Box<dyn ScanStrategy>],
    package: &str,
    language: Language,
    ctx: &SandboxContext,
    limits: &SandboxLimits,
) -> ScanResult {
    // Compiled-language ecosystems get a labeled placeholder until their
    // runner images ship: honest "not scanned", not a fake verdict.
    if !language.sandbox_supported() {
        return ScanResult {
            package_name: package.to_string(),
            language: language.name().to_string(),
            is_malicious: false,
            confidence: MIN_CONFIDENCE,
            indicators: vec![format!(
                "Behavioral scanning for {} packages is not yet implemented; static heuristics only",
                language
            )],
            network_connections: Vec::new(),
            file_operations: Vec::new(),
            process_spawns: Vec::new(),
            scanned_with: None,
            error: None,
        };
    }

    let mut run: Option<(SandboxRun, &'static str)> = None;
    let mut last_failure: Option<String> = None;
    for strategy in strategies {
        if !strategy.is_available() {
            tracing::debug!(strategy = strategy.name(), "strategy unavailable, skipping");
            continue;
        }
        match strategy.run(package, language, limits) {
            Ok(outcome) => {
                run = Some((outcome, strategy.name()));
                break;
            }
            Err(LaunchError::Unavailable(reason)) => {
                tracing::debug!(strategy = strategy.name(), %reason, "strategy declined");
            }
            Err(e) => {
                tracing::warn!(strategy = strategy.name(), error = %e, "strategy failed");
                last_failure = Some(e.to_string());
            }
        }
    }

    let Some((run, scanned_with)) = run else {
        // A runtime that was present but failed to launch is a different
        // operational problem than no runtime at all; report which one.
        let error = match last_failure {
            Some(reason) => launch_failed_error(&reason),
            None => NO_RUNTIME_ERROR.to_string(),
        };
        return ScanResult::inconclusive(package, language.name(), error);
    };

    let telemetry = classify(&run.telemetry);
    let flags = RunFlags {
        timed_out: run.telemetry.timeout,
        install_failed: run.telemetry.install_failed(),
        container_exit_nonzero: run.container_exit_nonzero(),
    };
    let verdict = fuse(ctx, flags, &telemetry, &FusionWeights::default());

    tracing::info!(
        package,
        %language,
        scanned_with,
        score = verdict.score,
        is_malicious = verdict.is_malicious,
        "deep scan complete"
    );

    ScanResult {
        package_name: package.to_string(),
        language: language.name().to_string(),
        is_malicious: verdict.is_malicious,
        confidence: verdict.confidence,
        indicators: verdict.indicators,
        network_connections: telemetry
            .endpoints
            .iter()
            .take(MAX_NETWORK_SAMPLES)
            .cloned()
            .collect(),
        file_operations: telemetry
            .file_samples
            .iter()
            .take(MAX_FILE_SAMPLES)
            .cloned()
            .collect(),
        process_spawns: telemetry.process_samples.clone(),
        scanned_with: Some(scanned_with.to_string()),
        error: None,
    }
}
