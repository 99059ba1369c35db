mod cli;
mod dispatch;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Commands};
use slopguard_core::config::SandboxLimits;
use slopguard_core::language::Language;
use slopguard_core::observability;
use slopguard_core::protocol::{RequestContext, ScanRequest, ScanResponse};
use slopguard_signals::{score_package, RegistryMeta};

fn main() -> Result<()> {
    observability::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            package,
            language,
            metadata_file,
        } => {
            let lang = Language::from_alias(&language)
                .with_context(|| format!("Unsupported language: {language}"))?;
            let meta: Option<RegistryMeta> = match metadata_file {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read metadata file {path}"))?;
                    Some(serde_json::from_str(&raw).context("Invalid registry metadata JSON")?)
                }
                None => None,
            };
            let prior = score_package(&package, lang, meta.as_ref());
            if cli.json {
                println!("{}", serde_json::to_string(&prior)?);
            } else {
                println!(
                    "{}: {} risk ({:.2}) - {}",
                    prior.name,
                    prior.risk_level.as_str(),
                    prior.score,
                    prior.summary
                );
            }
        }

        Commands::Scan {
            package,
            language,
            risk,
            score,
            net_mode,
            timeout_secs,
        } => {
            let limits = SandboxLimits::from_env().with_cli_overrides(net_mode, timeout_secs);
            let request = ScanRequest {
                package_name: package,
                language,
                context: (risk.is_some() || score.is_some()).then(|| RequestContext {
                    risk_level: risk,
                    score,
                    original_language: None,
                }),
            };
            let response = dispatch::handle_scan_request(&request, &limits);
            if cli.json {
                println!("{}", serde_json::to_string(&response)?);
            } else {
                print_scan_summary(&response);
            }
            if !response.success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_scan_summary(response: &ScanResponse) {
    let Some(result) = &response.result else {
        eprintln!(
            "scan failed: {}",
            response.error.as_deref().unwrap_or("unknown error")
        );
        return;
    };
    let verdict = if result.is_malicious {
        "MALICIOUS"
    } else {
        "clean"
    };
    println!(
        "{} ({}): {} (confidence {:.2})",
        result.package_name, result.language, verdict, result.confidence
    );
    for indicator in &result.indicators {
        println!("  - {indicator}");
    }
    if let Some(scanned_with) = &result.scanned_with {
        println!("  scanned with: {scanned_with}");
    }
}
