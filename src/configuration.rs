//! Runtime configuration: command-line flags, environment and an optional
//! TOML file, merged in that order of precedence.

pub mod config;
pub mod types;

pub use config::{Args, Config};
pub use types::OutputFormat;
