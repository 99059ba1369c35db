//! Supported package ecosystems and their normalization rules.
//!
//! Scan requests arrive with free-form language strings ("py", "node",
//! "typescript", ...). Everything downstream dispatches on the closed
//! [`Language`] enum, which also carries the per-ecosystem container image
//! and module-name normalization used by the sandbox runner.

use serde::{Deserialize, Serialize};

/// Package ecosystems the scanner knows about.
///
/// Python and JavaScript have full sandbox support; Go and Rust are
/// recognized (so the static scorer works) but the sandbox returns a
/// labeled placeholder for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Python,
    JavaScript,
    Go,
    Rust,
}

impl Language {
    /// Normalize a free-form language alias into a [`Language`].
    ///
    /// Returns `None` for anything the scanner does not recognize; callers
    /// must reject the request with a structured error before launching
    /// any sandbox.
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias.trim().to_lowercase().as_str() {
            "python" | "py" => Some(Self::Python),
            "javascript" | "js" | "node" | "npm" | "ts" | "typescript" => Some(Self::JavaScript),
            "go" | "golang" => Some(Self::Go),
            "rust" | "rs" | "crates" | "cargo" => Some(Self::Rust),
            _ => None,
        }
    }

    /// Canonical display name, matching the wire format of scan results.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Python => "Python",
            Self::JavaScript => "JavaScript",
            Self::Go => "Go",
            Self::Rust => "Rust",
        }
    }

    /// Container image embedding the trace-collecting runner for this
    /// ecosystem, or `None` when no sandbox image exists yet.
    pub fn sandbox_image(&self) -> Option<&'static str> {
        match self {
            Self::Python => Some("slopguard/runner-python:latest"),
            Self::JavaScript => Some("slopguard/runner-node:latest"),
            Self::Go | Self::Rust => None,
        }
    }

    /// Whether the behavioral sandbox supports this ecosystem.
    pub fn sandbox_supported(&self) -> bool {
        self.sandbox_image().is_some()
    }

    /// Normalize a package name into the module name the runner imports.
    ///
    /// Python distributions use hyphens where the importable module uses
    /// underscores; other ecosystems install/require under the package name.
    pub fn module_name(&self, package: &str) -> String {
        match self {
            Self::Python => package.replace('-', "_"),
            _ => package.to_string(),
        }
    }

    /// Check whether a name is a standard-library module for this language.
    ///
    /// Stdlib names short-circuit the static scorer to zero risk: they are
    /// never registry packages, so registry absence means nothing for them.
    pub fn is_stdlib_module(&self, name: &str) -> bool {
        let lowered = name.trim().to_lowercase();
        let table: &[&str] = match self {
            Self::Python => PYTHON_STDLIB,
            Self::Go => GO_STDLIB,
            Self::Rust => RUST_STDLIB,
            Self::JavaScript => return false,
        };
        table.binary_search(&lowered.as_str()).is_ok()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Python standard-library module names (lowercase).
/// MUST be sorted ascending (verified by unit test).
static PYTHON_STDLIB: &[&str] = &[
    "abc",
    "argparse",
    "array",
    "asyncio",
    "base64",
    "collections",
    "concurrent",
    "contextlib",
    "copy",
    "csv",
    "datetime",
    "enum",
    "functools",
    "getopt",
    "getpass",
    "glob",
    "gzip",
    "hashlib",
    "heapq",
    "html",
    "http",
    "importlib",
    "io",
    "ipaddress",
    "itertools",
    "json",
    "logging",
    "math",
    "os",
    "pathlib",
    "pickle",
    "platform",
    "plistlib",
    "queue",
    "random",
    "re",
    "sched",
    "secrets",
    "shutil",
    "signal",
    "socket",
    "sqlite3",
    "ssl",
    "statistics",
    "string",
    "subprocess",
    "sys",
    "tempfile",
    "textwrap",
    "threading",
    "time",
    "typing",
    "uuid",
    "xml",
    "zipfile",
];

/// Go standard-library package names (lowercase, sorted).
static GO_STDLIB: &[&str] = &[
    "bytes", "crypto", "fmt", "http", "io", "math", "net/http", "os", "strings", "time",
];

/// Rust: only the `std` facade name is allowlisted.
static RUST_STDLIB: &[&str] = &["std"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_normalize() {
        assert_eq!(Language::from_alias("py"), Some(Language::Python));
        assert_eq!(Language::from_alias("Python"), Some(Language::Python));
        assert_eq!(Language::from_alias("ts"), Some(Language::JavaScript));
        assert_eq!(Language::from_alias("npm"), Some(Language::JavaScript));
        assert_eq!(Language::from_alias("golang"), Some(Language::Go));
        assert_eq!(Language::from_alias("cargo"), Some(Language::Rust));
        assert_eq!(Language::from_alias("cobol"), None);
        assert_eq!(Language::from_alias(""), None);
    }

    #[test]
    fn stdlib_tables_are_sorted() {
        for table in [PYTHON_STDLIB, GO_STDLIB, RUST_STDLIB] {
            let mut sorted = table.to_vec();
            sorted.sort_unstable();
            assert_eq!(table, sorted.as_slice());
        }
    }

    #[test]
    fn stdlib_lookup() {
        assert!(Language::Python.is_stdlib_module("math"));
        assert!(Language::Python.is_stdlib_module("  JSON "));
        assert!(!Language::Python.is_stdlib_module("requests"));
        assert!(Language::Go.is_stdlib_module("net/http"));
        assert!(Language::Rust.is_stdlib_module("std"));
        assert!(!Language::JavaScript.is_stdlib_module("http"));
    }

    #[test]
    fn python_module_name_replaces_hyphens() {
        assert_eq!(Language::Python.module_name("typing-extensions"), "typing_extensions");
        assert_eq!(Language::JavaScript.module_name("left-pad"), "left-pad");
    }

    #[test]
    fn sandbox_support() {
        assert!(Language::Python.sandbox_supported());
        assert!(Language::JavaScript.sandbox_supported());
        assert!(!Language::Go.sandbox_supported());
        assert!(!Language::Rust.sandbox_supported());
    }
}
