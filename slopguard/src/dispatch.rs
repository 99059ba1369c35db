//! Request dispatch: validate a [`ScanRequest`] and route it into the
//! sandbox. This is the single entry point both the CLI and any transport
//! layer use, so validation semantics live here and nowhere else.

use slopguard_core::config::SandboxLimits;
use slopguard_core::language::Language;
use slopguard_core::protocol::{SandboxContext, ScanRequest, ScanResponse};
use slopguard_sandbox::deep_scan;

/// Handle one deep-scan request end to end.
///
/// Never returns `Err`: every failure is a `success: false` envelope so
/// the caller always has one shape to serialize.
pub fn handle_scan_request(req: &ScanRequest, limits: &SandboxLimits) -> ScanResponse {
    if req.package_name.trim().is_empty() {
        return ScanResponse::err("Package name is required");
    }

    let Some(language) = Language::from_alias(&req.language) else {
        return ScanResponse::err(format!("Unsupported language: {}", req.language));
    };

    let ctx = SandboxContext::from_request(req.context.as_ref(), language);
    tracing::debug!(
        package = %req.package_name,
        %language,
        prior = ctx.prior_level.as_str(),
        "dispatching deep scan"
    );

    let result = deep_scan(req.package_name.trim(), language, &ctx, limits);
    match result.error.clone() {
        Some(error) => ScanResponse::err(error),
        None => ScanResponse::ok(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> SandboxLimits {
        SandboxLimits {
            net_mode: "none".to_string(),
            pids_limit: 256,
            memory: "512m".to_string(),
            cpus: "1.0".to_string(),
            scan_timeout_secs: 5,
        }
    }

    #[test]
    fn empty_package_name_rejected() {
        let req = ScanRequest {
            package_name: "   ".to_string(),
            language: "python".to_string(),
            context: None,
        };
        let resp = handle_scan_request(&req, &limits());
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("Package name is required"));
    }

    #[test]
    fn unknown_language_rejected_with_original_alias() {
        let req = ScanRequest {
            package_name: "requests".to_string(),
            language: "cobol".to_string(),
            context: None,
        };
        let resp = handle_scan_request(&req, &limits());
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("Unsupported language: cobol"));
    }

    #[test]
    fn unsupported_sandbox_language_still_succeeds() {
        // Go has no runner image; dispatch must return a labeled
        // placeholder, not an error.
        let req = ScanRequest {
            package_name: "some-module".to_string(),
            language: "go".to_string(),
            context: None,
        };
        let resp = handle_scan_request(&req, &limits());
        assert!(resp.success);
        let result = resp.result.unwrap();
        assert!(!result.is_malicious);
        assert!(result.error.is_none());
    }
}
