//! VM scan strategy, used when no container engine is available.
//!
//! Drives a prebuilt qemu guest image through the `slopguard-vm` helper
//! script. Isolation is stronger than a container but startup is slower,
//! so this is strictly the fallback path.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use slopguard_core::config::SandboxLimits;
use slopguard_core::language::Language;

use crate::common::wait_with_timeout;
use crate::strategy::{LaunchError, SandboxRun, ScanStrategy};
use crate::telemetry::RawTelemetry;

const VM_HELPER: &str = "slopguard-vm";

pub struct LibvirtStrategy;

impl LibvirtStrategy {
    /// Candidate directories for guest images, in lookup order.
    fn image_dirs() -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(home) = dirs::home_dir() {
            dirs.push(home.join("slopguard-vm-images"));
            dirs.push(home.join(".slopguard").join("vm-images"));
        }
        dirs.push(PathBuf::from("/var/lib/slopguard/vm-images"));
        dirs
    }

    fn find_image(language: Language) -> Option<PathBuf> {
        let file_name = match language {
            Language::Python => "runner-python.qcow2",
            Language::JavaScript => "runner-node.qcow2",
            Language::Go | Language::Rust => return None,
        };
        Self::image_dirs()
            .into_iter()
            .map(|dir| dir.join(file_name))
            .find(|path| path.is_file())
    }
}

impl ScanStrategy for LibvirtStrategy {
    fn name(&self) -> &'static str {
        "libvirt"
    }

    fn is_available(&self) -> bool {
        which::which("qemu-system-x86_64").is_ok()
            && which::which("virsh").is_ok()
            && which::which(VM_HELPER).is_ok()
    }

    fn run(
        &self,
        package: &str,
        language: Language,
        limits: &SandboxLimits,
    ) -> Result<SandboxRun, LaunchError> {
        let image = Self::find_image(language).ok_or_else(|| {
            LaunchError::Unavailable(format!("no VM guest image for {language}"))
        })?;

        tracing::info!(package, %language, image = %image.display(), "starting VM scan");

        // The helper boots the guest, runs the traced install inside it,
        // prints the same JSON report the container runner does, and tears
        // the domain down. Same contract, different isolation boundary.
        let mut child = Command::new(VM_HELPER)
            .arg("--image")
            .arg(&image)
            .arg("--memory")
            .arg(&limits.memory)
            .arg("--cpus")
            .arg(&limits.cpus)
            .arg(if limits.network_disabled() {
                "--no-network"
            } else {
                "--network"
            })
            .arg("--")
            .arg(package)
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

        let report_line = outcome
            .stdout
            .lines()
            .rev()
            .find(|line| line.trim_start().starts_with('{'));
        let telemetry = match report_line
            .and_then(|line| serde_json::from_str::<RawTelemetry>(line).ok())
        {
            Some(telemetry) => telemetry,
            None => {
                tracing::warn!(package, "VM helper produced unparsable output");
                RawTelemetry::invalid_output(package)
            }
        };

        Ok(SandboxRun {
            telemetry,
            exit_code: outcome.exit_code,
        })
    }
}
