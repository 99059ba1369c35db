//! Environment-derived configuration.
//!
//! Configuration is read once at process start (`from_env`) and passed
//! explicitly from there on; nothing re-reads the environment mid-scan.

// ─── Env var keys ────────────────────────────────────────────────────────────

pub const SLOPGUARD_NET_MODE: &str = "SLOPGUARD_NET_MODE";
pub const SLOPGUARD_PIDS_LIMIT: &str = "SLOPGUARD_PIDS_LIMIT";
pub const SLOPGUARD_MEMORY: &str = "SLOPGUARD_MEMORY";
pub const SLOPGUARD_CPUS: &str = "SLOPGUARD_CPUS";
pub const SLOPGUARD_SCAN_TIMEOUT_SECS: &str = "SLOPGUARD_SCAN_TIMEOUT_SECS";

// Unprefixed forms, kept for deployments configured against the original
// sandbox interface. The SLOPGUARD_* form wins when both are set.
pub const SANDBOX_NET_MODE: &str = "SANDBOX_NET_MODE";
pub const SANDBOX_PIDS_LIMIT: &str = "SANDBOX_PIDS_LIMIT";
pub const SANDBOX_MEMORY: &str = "SANDBOX_MEMORY";
pub const SANDBOX_CPUS: &str = "SANDBOX_CPUS";
pub const SLOPGUARD_LOG_LEVEL: &str = "SLOPGUARD_LOG_LEVEL";
pub const SLOPGUARD_LOG_JSON: &str = "SLOPGUARD_LOG_JSON";
pub const SLOPGUARD_QUIET: &str = "SLOPGUARD_QUIET";

// ─── Defaults (single source of truth) ───────────────────────────────────────

/// Default container network mode. Open egress by default: the install has
/// to succeed for behavior to be observable. Set to "none" for strict
/// deployments that only care about intent.
pub const DEFAULT_NET_MODE: &str = "bridge";

/// Default in-container process count limit (fork bomb protection).
pub const DEFAULT_PIDS_LIMIT: u32 = 256;

/// Default container memory limit, in docker `--memory` syntax.
pub const DEFAULT_MEMORY: &str = "512m";

/// Default container CPU allowance, in docker `--cpus` syntax.
pub const DEFAULT_CPUS: &str = "1.0";

/// Default wall-clock budget for one sandbox run, in seconds. This is the
/// outer limit on the container process; the in-container runner self-limits
/// install (~40s) and import (~15s) separately.
pub const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 120;

/// Resource and network limits applied to one sandbox run.
#[derive(Debug, Clone)]
pub struct SandboxLimits {
    /// Docker network mode: "bridge" (default) or "none".
    pub net_mode: String,
    /// `--pids-limit` value.
    pub pids_limit: u32,
    /// `--memory` value (e.g. "512m").
    pub memory: String,
    /// `--cpus` value (e.g. "1.0").
    pub cpus: String,
    /// Hard wall-clock timeout for the whole container run, in seconds.
    pub scan_timeout_secs: u64,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self::from_env()
    }
}

impl SandboxLimits {
    /// Load sandbox limits from environment variables, falling back to the
    /// module defaults for anything unset or unparsable. Each knob is read
    /// from its SLOPGUARD_* key first, then its unprefixed SANDBOX_* alias.
    pub fn from_env() -> Self {
        let net_mode = env_first(&[SLOPGUARD_NET_MODE, SANDBOX_NET_MODE])
            .unwrap_or_else(|| DEFAULT_NET_MODE.to_string());

        let pids_limit = env_first(&[SLOPGUARD_PIDS_LIMIT, SANDBOX_PIDS_LIMIT])
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_PIDS_LIMIT);

        let memory = env_first(&[SLOPGUARD_MEMORY, SANDBOX_MEMORY])
            .unwrap_or_else(|| DEFAULT_MEMORY.to_string());

        let cpus = env_first(&[SLOPGUARD_CPUS, SANDBOX_CPUS])
            .unwrap_or_else(|| DEFAULT_CPUS.to_string());

        let scan_timeout_secs = env_first(&[SLOPGUARD_SCAN_TIMEOUT_SECS])
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_SCAN_TIMEOUT_SECS);

        let limits = Self {
            net_mode,
            pids_limit,
            memory,
            cpus,
            scan_timeout_secs,
        };
        tracing::debug!(
            net_mode = %limits.net_mode,
            pids_limit = limits.pids_limit,
            memory = %limits.memory,
            cpus = %limits.cpus,
            timeout_secs = limits.scan_timeout_secs,
            "sandbox limits loaded"
        );
        limits
    }

    /// Override with CLI parameters where provided.
    pub fn with_cli_overrides(mut self, net_mode: Option<String>, timeout_secs: Option<u64>) -> Self {
        if let Some(mode) = net_mode {
            self.net_mode = mode;
        }
        if let Some(timeout) = timeout_secs {
            self.scan_timeout_secs = timeout;
        }
        self
    }

    /// Whether container egress is blocked entirely.
    pub fn network_disabled(&self) -> bool {
        self.net_mode == "none"
    }
}

/// Logging configuration, read from environment.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Tracing filter directive (e.g. "slopguard=info").
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones.
    pub log_json: bool,
    /// Suppress INFO output (native-messaging hosts must keep stdout clean,
    /// and noisy stderr confuses some browsers too).
    pub quiet: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        let log_level = std::env::var(SLOPGUARD_LOG_LEVEL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "slopguard=info".to_string());
        let log_json = env_flag(SLOPGUARD_LOG_JSON);
        let quiet = env_flag(SLOPGUARD_QUIET);
        Self {
            log_level,
            log_json,
            quiet,
        }
    }
}

/// First non-empty value among the given env var keys.
fn env_first(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|v| !v.trim().is_empty())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| {
            let v = v.trim().to_lowercase();
            v == "1" || v == "true" || v == "yes"
        })
        .unwrap_or(false)
}
