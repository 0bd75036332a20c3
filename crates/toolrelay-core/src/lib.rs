//! Toolrelay core — shared types, configuration, and utilities.
//!
//! - [`types`]: conversation messages, provider wire format, tool definitions
//! - [`config`]: JSON config schema, loader, env overrides
//! - [`env_file`]: `.env` parsing and the process-env overlay
//! - [`utils`]: path and string helpers

pub mod config;
pub mod env_file;
pub mod types;
pub mod utils;

pub use config::Config;
pub use env_file::EnvOverlay;
