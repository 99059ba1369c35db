use clap::{Parser, Subcommand};

/// slopguard - static heuristics and sandboxed deep scans for suspicious
/// package installs
#[derive(Parser, Debug)]
#[command(name = "slopguard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Emit the result as a single JSON line on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Static heuristic assessment only (no sandbox)
    Check {
        /// Package name to assess
        #[arg(value_name = "PACKAGE")]
        package: String,

        /// Ecosystem: python/py, javascript/js/node/npm, go, rust
        #[arg(long, default_value = "python")]
        language: String,

        /// Path to a registry metadata JSON file (exists, hasInstallScripts,
        /// wheelsOnly, repo, homepage, license)
        #[arg(long, value_name = "FILE")]
        metadata_file: Option<String>,
    },

    /// Full behavioral deep scan in a sandbox
    Scan {
        /// Package name to scan
        #[arg(value_name = "PACKAGE")]
        package: String,

        /// Ecosystem: python/py, javascript/js/node/npm, go, rust
        #[arg(long, default_value = "python")]
        language: String,

        /// Prior risk level from an earlier static assessment (low/medium/high)
        #[arg(long)]
        risk: Option<String>,

        /// Prior risk score in [0, 1]
        #[arg(long)]
        score: Option<f64>,

        /// Container network mode: "bridge" or "none" (default: from env or bridge)
        #[arg(long)]
        net_mode: Option<String>,

        /// Outer scan timeout in seconds (default: from env or 120)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}
