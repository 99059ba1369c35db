//! Raw runner reports and their classification into structured signals.
//!
//! [`RawTelemetry`] is what the in-container runner prints as JSON;
//! [`classify`] turns its unstructured trace lines into deduplicated,
//! bounded counts. Classification is a pure function of its input:
//! identical telemetry always classifies identically, which is what makes
//! the fusion engine unit-testable.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use slopguard_core::protocol::{MAX_FILE_SAMPLES, MAX_PROCESS_SAMPLES};

/// Internal cap on unique endpoints tracked per scan.
pub const MAX_TRACKED_ENDPOINTS: usize = 50;

/// Sentinel stored in `install_error` when runner output was not valid JSON.
pub const INVALID_JSON_SENTINEL: &str = "invalid_json";

/// Trace-line substrings that mean the environment (not the package)
/// rejected the attempt: unreachable network, failed DNS, missing file.
/// These must not count as observed activity, particularly when the
/// sandbox runs with egress blocked.
const NOISE_MARKERS: &[&str] = &["ENETUNREACH", "EAI_AGAIN", "ENOENT"];

/// Endpoint fragments belonging to package registries, their CDNs, cloud
/// object storage, or the container network gateway. Contact with these is
/// expected during a legitimate install.
const BENIGN_ENDPOINT_FRAGMENTS: &[&str] = &[
    "pypi.org",
    "pythonhosted.org",
    "registry.npmjs.org",
    "npmjs.com",
    "crates.io",
    "proxy.golang.org",
    "fastly",
    "cloudfront",
    "s3.amazonaws",
    // Fastly anycast (PyPI CDN) and Cloudflare (npm CDN) ranges.
    "151.101.",
    "104.16.",
    "104.17.",
    // Docker bridge gateway range.
    "172.17.",
];

/// Read paths that reference credential or secret material.
const SUSPICIOUS_READ_FRAGMENTS: &[&str] = &[
    ".ssh",
    "id_rsa",
    "id_ed25519",
    ".aws/credentials",
    ".config/gcloud",
    ".azure",
    ".kube/config",
    ".netrc",
    ".mozilla/firefox",
    ".config/google-chrome",
    "cookies.sqlite",
    "Login Data",
];

/// Write paths that establish persistence or autostart.
const SUSPICIOUS_WRITE_FRAGMENTS: &[&str] = &[
    ".bashrc",
    ".bash_profile",
    ".profile",
    ".zshrc",
    "/etc/systemd",
    "/etc/cron",
    "/var/spool/cron",
    "/etc/init.d",
    "/etc/rc.local",
    "/usr/local/bin",
    "ld.so.preload",
    ".config/autostart",
];

/// Writes under package-manager install trees are what an install *is*;
/// they are excluded from write counting entirely.
const INSTALL_TREE_FRAGMENTS: &[&str] = &["site-packages", "node_modules", "dist-packages"];

// ─── Raw report ──────────────────────────────────────────────────────────────

/// The runner's report, deserialized from its single JSON stdout line.
///
/// Every field defaults so a partially-populated report (runner died
/// mid-way) still parses. Captured once per run, never mutated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTelemetry {
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub install_rc: Option<i32>,
    #[serde(default)]
    pub import_rc: Option<i32>,
    #[serde(default)]
    pub install_error: Option<String>,
    #[serde(default)]
    pub import_error: Option<String>,
    #[serde(default)]
    pub installed_version: Option<String>,
    #[serde(default)]
    pub download_bytes: Option<u64>,
    #[serde(default)]
    pub install_out: String,
    #[serde(default)]
    pub install_err: String,
    #[serde(default)]
    pub import_out: String,
    #[serde(default)]
    pub import_err: String,
    /// Raw `connect(...)` trace lines.
    #[serde(default)]
    pub network: Vec<String>,
    /// Raw `execve(...)` trace lines.
    #[serde(default)]
    pub processes: Vec<String>,
    /// Paths touched by open/openat/stat/access calls.
    #[serde(default)]
    pub file_ops: Vec<String>,
    /// Paths opened for writing.
    #[serde(default)]
    pub file_writes: Vec<String>,
    #[serde(default)]
    pub timeout: bool,
}

impl RawTelemetry {
    /// Synthesized report for an outer-timeout kill: nothing was observed,
    /// only the fact that the run did not finish.
    pub fn timed_out(package: &str) -> Self {
        Self {
            package: package.to_string(),
            timeout: true,
            ..Default::default()
        }
    }

    /// Degraded report for unparsable runner output.
    pub fn invalid_output(package: &str) -> Self {
        Self {
            package: package.to_string(),
            install_error: Some(INVALID_JSON_SENTINEL.to_string()),
            ..Default::default()
        }
    }

    /// Whether the install step failed (nonzero rc or an error sentinel).
    pub fn install_failed(&self) -> bool {
        self.install_error.is_some() || matches!(self.install_rc, Some(rc) if rc != 0)
    }
}

// ─── Classified signals ──────────────────────────────────────────────────────

/// Structured, deduplicated, bounded view of one run's telemetry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedTelemetry {
    /// Unique endpoints in first-seen order, capped at
    /// [`MAX_TRACKED_ENDPOINTS`].
    pub endpoints: Vec<String>,
    /// Endpoints matching registry/CDN/gateway patterns.
    pub benign_net_count: usize,
    /// Endpoints matching nothing known; the stronger suspicion signal.
    pub other_net_count: usize,
    /// Distinct execve trace lines.
    pub proc_count: usize,
    pub file_op_count: usize,
    pub suspicious_file_count: usize,
    pub file_write_count: usize,
    pub suspicious_write_count: usize,
    /// Bounded path samples, suspicious ones first.
    pub file_samples: Vec<String>,
    /// Bounded process command samples.
    pub process_samples: Vec<String>,
}

impl ClassifiedTelemetry {
    /// Any signal strong enough to deny a low-prior package the benefit
    /// of the doubt: non-registry contact, process spawns, or credential/
    /// persistence file activity.
    pub fn has_strong_signal(&self) -> bool {
        self.other_net_count > 0
            || self.proc_count > 0
            || self.suspicious_file_count > 0
            || self.suspicious_write_count > 0
    }
}

fn quoted_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]+)""#).expect("static regex"))
}

/// Whether a trace line records an environmental rejection rather than
/// package behavior.
pub fn is_noise_line(line: &str) -> bool {
    NOISE_MARKERS.iter().any(|marker| line.contains(marker))
}

/// Drop environmental-noise lines. Idempotent: re-filtering filtered
/// output changes nothing.
pub fn filter_noise<'a>(lines: &'a [String]) -> Vec<&'a str> {
    lines
        .iter()
        .map(String::as_str)
        .filter(|line| !is_noise_line(line))
        .collect()
}

/// Extract the quoted address literal from a `connect(...)` trace line.
fn extract_endpoint(line: &str) -> Option<&str> {
    if !line.contains("connect(") {
        return None;
    }
    quoted_literal_re()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Whether an endpoint belongs to a known registry/CDN/gateway.
pub fn is_benign_endpoint(endpoint: &str) -> bool {
    BENIGN_ENDPOINT_FRAGMENTS
        .iter()
        .any(|fragment| endpoint.contains(fragment))
}

fn is_suspicious_read(path: &str) -> bool {
    SUSPICIOUS_READ_FRAGMENTS
        .iter()
        .any(|fragment| path.contains(fragment))
}

fn is_suspicious_write(path: &str) -> bool {
    SUSPICIOUS_WRITE_FRAGMENTS
        .iter()
        .any(|fragment| path.contains(fragment))
}

fn is_install_tree(path: &str) -> bool {
    INSTALL_TREE_FRAGMENTS
        .iter()
        .any(|fragment| path.contains(fragment))
}

/// Extract the quoted path from an open/openat/stat/access trace line,
/// or take the line as-is when it is already a bare path.
fn extract_path(line: &str) -> Option<&str> {
    if let Some(m) = quoted_literal_re().captures(line).and_then(|c| c.get(1)) {
        return Some(m.as_str());
    }
    let trimmed = line.trim();
    if trimmed.starts_with('/') || trimmed.starts_with('~') {
        Some(trimmed)
    } else {
        None
    }
}

/// Classify one raw report into structured signals.
///
/// Pure: no environment reads, no global state, deterministic output.
pub fn classify(raw: &RawTelemetry) -> ClassifiedTelemetry {
    let mut out = ClassifiedTelemetry::default();

    // Network: drop environmental noise, then dedupe quoted endpoints in
    // first-seen order.
    for line in filter_noise(&raw.network) {
        let Some(endpoint) = extract_endpoint(line) else {
            continue;
        };
        if out.endpoints.iter().any(|seen| seen == endpoint) {
            continue;
        }
        if out.endpoints.len() >= MAX_TRACKED_ENDPOINTS {
            break;
        }
        if is_benign_endpoint(endpoint) {
            out.benign_net_count += 1;
        } else {
            out.other_net_count += 1;
        }
        out.endpoints.push(endpoint.to_string());
    }

    // Processes: distinct execve lines.
    let mut seen_procs: Vec<&str> = Vec::new();
    for line in raw.processes.iter().map(String::as_str) {
        if !line.contains("execve(") {
            continue;
        }
        if seen_procs.contains(&line) {
            continue;
        }
        seen_procs.push(line);
        out.proc_count += 1;
        if out.process_samples.len() < MAX_PROCESS_SAMPLES {
            out.process_samples.push(line.to_string());
        }
    }

    // File reads: count everything, flag credential material, sample
    // suspicious paths first so truncation never hides them.
    let mut benign_samples: Vec<String> = Vec::new();
    for line in raw.file_ops.iter().map(String::as_str) {
        let Some(path) = extract_path(line) else {
            continue;
        };
        out.file_op_count += 1;
        if is_suspicious_read(path) {
            out.suspicious_file_count += 1;
            if out.file_samples.len() < MAX_FILE_SAMPLES {
                out.file_samples.push(path.to_string());
            }
        } else if benign_samples.len() < MAX_FILE_SAMPLES {
            benign_samples.push(path.to_string());
        }
    }
    for sample in benign_samples {
        if out.file_samples.len() >= MAX_FILE_SAMPLES {
            break;
        }
        out.file_samples.push(sample);
    }

    // File writes: install-tree paths are excluded from the count entirely
    // so a normal install is never penalized for doing its job.
    for line in raw.file_writes.iter().map(String::as_str) {
        let Some(path) = extract_path(line) else {
            continue;
        };
        if is_install_tree(path) {
            continue;
        }
        out.file_write_count += 1;
        if is_suspicious_write(path) {
            out.suspicious_write_count += 1;
        }
    }

    out
}
