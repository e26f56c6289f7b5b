//! nestrun version information.
//!
//! The value is taken from Cargo metadata (`CARGO_PKG_VERSION`) at compile time, so the CLI and reporters agree
//! on one string.

/// The nestrun version string (for example, `0.1.0`).
pub const NESTRUN_VERSION: &str = env!("CARGO_PKG_VERSION");
