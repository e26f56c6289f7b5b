//! The default root harness
//!
//! Code that declares units without building its own tree gets one shared root, created on first access and
//! reporting to stdout through a [`ConsoleReporter`]. Nodes are single-threaded, so "shared" means one root
//! per thread. There is no teardown: the root lives as long as its thread.
//!
//! ```rust
//! use nestrun::{RunStatus, global};
//!
//! global::test_with("adds", |t| {
//!     t.equal(1 + 1, 2, "one plus one");
//!     t.end();
//! });
//! assert_eq!(global::run(), RunStatus::Completed);
//! ```

use std::cell::OnceCell;

use crate::harness::{Declaration, Harness, RunStatus};
use crate::report::ConsoleReporter;

thread_local! {
    static ROOT: OnceCell<Harness> = const { OnceCell::new() };
}

/// The default root of this thread.
pub fn root() -> Harness {
    ROOT.with(|cell| {
        cell.get_or_init(|| {
            tracing::debug!("creating default root harness");
            let root = Harness::new();
            root.report_to(ConsoleReporter::stdout());
            root
        })
        .clone()
    })
}

/// True once [`root`] has been called on this thread.
pub fn is_initialized() -> bool {
    ROOT.with(|cell| cell.get().is_some())
}

/// Declare a unit on the default root.
pub fn test(declaration: impl Into<Declaration>) -> Option<Harness> {
    root().test(declaration)
}

/// Declare a unit with a body on the default root.
pub fn test_with(declaration: impl Into<Declaration>, body: impl FnOnce(&Harness) + 'static) -> Option<Harness> {
    root().test_with(declaration, body)
}

/// Drain the default root's scheduler.
pub fn run() -> RunStatus {
    root().run()
}
