//! Shared process plumbing for scan strategies.
//!
//! Both the container and VM paths spawn an external process that may run
//! adversarial code; the only cancellation we have is a hard kill at the
//! wall-clock deadline.

use anyhow::Result;
use std::io::Read;
use std::process::Child;
use std::thread;
use std::time::{Duration, Instant};

/// Poll interval while waiting for the sandbox process.
const WAIT_POLL_INTERVAL_MS: u64 = 100;

/// Outcome of waiting on a sandbox subprocess.
#[derive(Debug)]
pub struct WaitOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// True when we killed the process at the deadline.
    pub killed: bool,
}

/// Wait for a child process with a hard wall-clock timeout.
///
/// Reads stdout/stderr in background threads *while* the process runs.
/// Without this, a child writing more than the pipe buffer (~64KB) would
/// block on write and we'd deadlock waiting for it to exit; pip install
/// output alone routinely exceeds that.
pub fn wait_with_timeout(child: &mut Child, timeout_secs: u64) -> Result<WaitOutcome> {
    let start = Instant::now();
    let timeout = Duration::from_secs(timeout_secs);
    let poll = Duration::from_millis(WAIT_POLL_INTERVAL_MS);

    let stdout_handle = child.stdout.take().map(|mut out| {
        thread::spawn(move || {
            let mut s = String::new();
            let _ = out.read_to_string(&mut s);
            s
        })
    });
    let stderr_handle = child.stderr.take().map(|mut err| {
        thread::spawn(move || {
            let mut s = String::new();
            let _ = err.read_to_string(&mut s);
            s
        })
    });

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let stdout = stdout_handle
                    .map(|h| h.join().unwrap_or_default())
                    .unwrap_or_default();
                let stderr = stderr_handle
                    .map(|h| h.join().unwrap_or_default())
                    .unwrap_or_default();
                return Ok(WaitOutcome {
                    stdout,
                    stderr,
                    exit_code: status.code().unwrap_or(-1),
                    killed: false,
                });
            }
            Ok(None) => {}
            Err(e) => {
                let _ = stdout_handle.map(|h| h.join());
                let _ = stderr_handle.map(|h| h.join());
                return Err(anyhow::anyhow!("Failed to wait for sandbox process: {}", e));
            }
        }

        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_handle.map(|h| h.join());
            let _ = stderr_handle.map(|h| h.join());
            tracing::warn!(timeout_secs, "sandbox process killed at deadline");
            return Ok(WaitOutcome {
                stdout: String::new(),
                stderr: format!("Process killed: exceeded timeout of {} seconds", timeout_secs),
                exit_code: -1,
                killed: true,
            });
        }

        thread::sleep(poll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    #[test]
    fn fast_process_completes() {
        let mut child = Command::new("sh")
            .args(["-c", "echo hello"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let out = wait_with_timeout(&mut child, 10).unwrap();
        assert!(!out.killed);
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn slow_process_is_killed() {
        let mut child = Command::new("sh")
            .args(["-c", "sleep 30"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let out = wait_with_timeout(&mut child, 1).unwrap();
        assert!(out.killed);
        assert_eq!(out.exit_code, -1);
    }
}
