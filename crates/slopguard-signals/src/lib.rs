//! Static heuristics over package names and registry metadata.
//!
//! This is the *prior*: a cheap, no-execution risk assessment computed
//! before (or instead of) a sandbox run. The sandbox fusion engine consumes
//! it as context; it never mutates it.

pub mod scoring;
pub mod signals;

pub use scoring::{score_package, PriorAssessment};
pub use signals::{RegistryMeta, SignalResult};
