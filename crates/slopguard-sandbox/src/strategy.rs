//! Scan strategy abstraction.
//!
//! A strategy owns one way of executing the in-sandbox runner for a
//! package: a container engine, a microVM, whatever comes next. The
//! orchestrator probes strategies in preference order and uses the first
//! available one.

use std::io;

use slopguard_core::config::SandboxLimits;
use slopguard_core::language::Language;

use crate::telemetry::RawTelemetry;

/// Why a strategy could not produce a run.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The backing runtime is not installed or not responding. The
    /// orchestrator treats this as "try the next strategy".
    #[error("sandbox runtime unavailable: {0}")]
    Unavailable(String),
    /// The runtime exists but the scan process could not be spawned.
    #[error("failed to spawn sandbox process: {0}")]
    Spawn(#[from] io::Error),
    /// The run started but failed in a way that is not the package's
    /// fault and yields no telemetry.
    #[error("sandbox run failed: {0}")]
    Runtime(String),
}

/// Outcome of one completed sandbox run.
#[derive(Debug)]
pub struct SandboxRun {
    pub telemetry: RawTelemetry,
    /// Exit code of the outer sandbox process (not the install inside it).
    pub exit_code: i32,
}

impl SandboxRun {
    pub fn container_exit_nonzero(&self) -> bool {
        self.exit_code != 0 && !self.telemetry.timeout
    }
}

/// One way of executing a sandboxed package scan.
pub trait ScanStrategy {
    /// Short identifier used in logs and in `scannedWith`.
    fn name(&self) -> &'static str;

    /// Cheap probe: is the backing runtime present and responsive?
    fn is_available(&self) -> bool;

    /// Execute the runner for `package` and return its raw telemetry.
    ///
    /// A timeout or unparsable runner output is NOT an error: the
    /// strategy returns degraded [`RawTelemetry`] (timeout flag set, or
    /// the invalid-output sentinel) and lets fusion weigh it.
    fn run(
        &self,
        package: &str,
        language: Language,
        limits: &SandboxLimits,
    ) -> Result<SandboxRun, LaunchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonzero_exit_detection_ignores_timeouts() {
        let run = SandboxRun {
            telemetry: RawTelemetry::timed_out("pkg"),
            exit_code: -1,
        };
        assert!(!run.container_exit_nonzero());

        let run = SandboxRun {
            telemetry: RawTelemetry::default(),
            exit_code: 125,
        };
        assert!(run.container_exit_nonzero());
    }
}
