//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, TTLs, cache keys, plugin identity)
//! - CLI option types and parsing

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{Cli, Command, Config, LogFormat, LogLevel};
