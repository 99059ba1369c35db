pub mod config;
pub mod language;
pub mod observability;
pub mod protocol;
