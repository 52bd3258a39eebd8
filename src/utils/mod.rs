#![allow(missing_docs)]

/// TOML configuration (`docqa.toml`).
pub mod config;
/// Shared reqwest client construction and status handling.
pub mod http;

pub use config::{ConfigError, DocqaConfig};
