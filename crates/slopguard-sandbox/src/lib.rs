pub mod common;
pub mod docker;
pub mod fusion;
pub mod libvirt;
pub mod scan;
pub mod strategy;
pub mod telemetry;

pub use scan::deep_scan;
pub use strategy::{LaunchError, SandboxRun, ScanStrategy};
