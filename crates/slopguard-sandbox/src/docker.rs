//! Container scan strategy.
//!
//! Runs the per-language runner image under Docker with capabilities
//! dropped, privilege escalation disabled, and pid/memory/cpu limits from
//! [`SandboxLimits`]. The runner traces the install inside the container
//! and prints a single JSON report on stdout.

use std::process::{Command, Stdio};

use slopguard_core::config::SandboxLimits;
use slopguard_core::language::Language;

use crate::common::wait_with_timeout;
use crate::strategy::{LaunchError, SandboxRun, ScanStrategy};
use crate::telemetry::RawTelemetry;

pub struct DockerStrategy;

impl DockerStrategy {
    /// Assemble the `docker run` argument vector for one scan.
    fn run_args(image: &str, package: &str, limits: &SandboxLimits) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "run".into(),
            "--rm".into(),
            format!("--network={}", limits.net_mode),
            format!("--pids-limit={}", limits.pids_limit),
            format!("--memory={}", limits.memory),
            format!("--cpus={}", limits.cpus),
            "--cap-drop=ALL".into(),
            "--security-opt".into(),
            "no-new-privileges".into(),
        ];
        args.push(image.into());
        args.push("runner".into());
        args.push(package.into());
        args
    }

    /// Pull the JSON report out of runner stdout. The runner prints the
    /// report as its last line; install tooling may have written lines
    /// above it.
    fn parse_report(package: &str, stdout: &str) -> RawTelemetry {
        let report_line = stdout
            .lines()
            .rev()
            .find(|line| line.trim_start().starts_with('{'));
        match report_line.and_then(|line| serde_json::from_str::<RawTelemetry>(line).ok()) {
            Some(telemetry) => telemetry,
            None => {
                tracing::warn!(package, "runner produced unparsable output");
                RawTelemetry::invalid_output(package)
            }
        }
    }
}

impl ScanStrategy for DockerStrategy {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn is_available(&self) -> bool {
        let Ok(docker) = which::which("docker") else {
            return false;
        };
        // `docker version` fails fast when the daemon is down, which the
        // mere presence of the binary does not reveal.
        Command::new(docker)
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn run(
        &self,
        package: &str,
        language: Language,
        limits: &SandboxLimits,
    ) -> Result<SandboxRun, LaunchError> {
        let image = language.sandbox_image().ok_or_else(|| {
            LaunchError::Runtime(format!("no runner image for {language}"))
        })?;

        let args = Self::run_args(image, package, limits);
        tracing::info!(package, %language, image, net_mode = %limits.net_mode, "starting container scan");

        let mut child = Command::new("docker")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let outcome = wait_with_timeout(&mut child, limits.scan_timeout_secs)
            .map_err(|e| LaunchError::Runtime(e.to_string()))?;

        if outcome.killed {
            return Ok(SandboxRun {
                telemetry: RawTelemetry::timed_out(package),
                exit_code: outcome.exit_code,
            });
        }

        if outcome.exit_code != 0 {
            tracing::debug!(
                package,
                exit_code = outcome.exit_code,
                stderr = %outcome.stderr.trim(),
                "container exited nonzero"
            );
        }

        Ok(SandboxRun {
            telemetry: Self::parse_report(package, &outcome.stdout),
            exit_code: outcome.exit_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slopguard_core::config::SandboxLimits;

    #[test]
    fn run_args_carry_hardening_flags() {
        let limits = SandboxLimits {
            net_mode: "bridge".to_string(),
            pids_limit: 256,
            memory: "512m".to_string(),
            cpus: "1.0".to_string(),
            scan_timeout_secs: 120,
        };
        let args = DockerStrategy::run_args("slopguard/runner-python:latest", "requests", &limits);
        assert!(args.contains(&"--cap-drop=ALL".to_string()));
        assert!(args.contains(&"no-new-privileges".to_string()));
        assert!(args.contains(&"--network=bridge".to_string()));
        assert!(args.contains(&"--pids-limit=256".to_string()));
        assert_eq!(args.last().unwrap(), "requests");
        assert_eq!(args[args.len() - 2], "runner");
        assert_eq!(args[args.len() - 3], "slopguard/runner-python:latest");
    }

    #[test]
    fn report_parsing_takes_last_json_line() {
        let stdout = "Collecting requests\nInstalling...\n{\"install_rc\":0,\"import_rc\":0}";
        let telemetry = DockerStrategy::parse_report("requests", stdout);
        assert_eq!(telemetry.install_rc, Some(0));
        assert!(!telemetry.install_failed());
    }

    #[test]
    fn garbage_output_becomes_invalid_json_sentinel() {
        let telemetry = DockerStrategy::parse_report("requests", "segfault\ncore dumped");
        assert!(telemetry.install_failed());
        assert_eq!(
            telemetry.install_error.as_deref(),
            Some(crate::telemetry::INVALID_JSON_SENTINEL)
        );
    }

    #[test]
    fn empty_output_is_invalid_too() {
        let telemetry = DockerStrategy::parse_report("requests", "");
        assert!(telemetry.install_failed());
    }
}
