#![forbid(unsafe_code)]
//! nestrun: a recursive, sequential test orchestrator
//!
//! Every test unit and every top-level run is the same kind of node, a [`Harness`]. A node owns a queue of
//! child units, grants control to one child at a time in declaration order, and merges each child's results
//! into its own when the child completes. Nesting is unbounded.
//!
//! ```rust
//! use nestrun::{Harness, RunStatus};
//!
//! let root = Harness::new();
//! root.test_with("math", |t| {
//!     t.equal(2 + 2, 4, "sum");
//!     t.end();
//! });
//! root.test_with("strings", |t| {
//!     t.ok("nest".starts_with('n'), "prefix");
//!     t.end();
//! });
//!
//! assert_eq!(root.run(), RunStatus::Completed);
//! assert_eq!(root.total(), 2);
//! assert_eq!(root.test_count(), 2);
//! ```
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`. Protocol anomalies of a tree are recorded as failures, never raised.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod global;
pub mod harness;
pub mod report;
pub mod scheduler;
pub mod version;

pub use config::{HarnessConfig, ReportConfig, ReportFormat};
pub use error::{HarnessError, HarnessResult};
pub use harness::{Body, Declaration, Event, Harness, RunStatus, UnitConfig};
pub use report::{ConsoleReporter, JsonReporter, SharedBuffer, SharedReporter, TestReporter, TestSummary};
pub use scheduler::Scheduler;

pub use nestrun_core::{AssertMeta, Assertion, Operator, Outcome, Results, assert};
