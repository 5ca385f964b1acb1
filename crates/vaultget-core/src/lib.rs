//! vaultget-core - Shared functionality for the vaultget tools
//!
//! Standard locations and the user configuration file.

pub mod config;
pub mod paths;

pub use config::Config;
pub use paths::Paths;
