//! Wizard CLI
//!
//! Operator tooling around the durable recovery scope: inspect the stored
//! snapshot, clear it, or drive the article-analysis workflow end to end.

pub mod config;
pub mod simulate;

pub use config::{CliConfig, ConfigError};
pub use simulate::{open_manager, SimulateOptions, SimulationReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
