//! Provide the pure collaborators of the nestrun orchestrator: outcome records, assertion constructors, and the
//! results aggregator.
//!
//! The orchestrator in the `nestrun` crate only ever talks to these types through their public contracts:
//! - [`assert`] builds structured [`Outcome`] records from a description and metadata,
//! - [`Results`] accumulates records, merges other aggregators, and exposes running counts.
//!
//! ## Notes
//!
//! - This is a "core" crate: **no IO**, no global state, no scheduling. Everything here is deterministic.
//! - Rendering of records (console, JSON lines, ...) lives with the reporters in the `nestrun` crate.

pub mod assert;
pub mod outcome;
pub mod results;

pub use assert::AssertMeta;
pub use outcome::{Assertion, Operator, Outcome};
pub use results::Results;
