//! Asynchronous unit bodies and the async driver
//!
//! A unit body may be a future. It is spawned as a `tokio` local task when the unit receives control, and the
//! unit completes whenever the future calls `end` (or declares units that finish). Because nodes are
//! single-threaded (`Rc`), everything here must run inside a [`tokio::task::LocalSet`]:
//!
//! ```rust,no_run
//! use nestrun::{Harness, RunStatus, driver};
//!
//! # async fn example() {
//! let local = tokio::task::LocalSet::new();
//! let status = local
//!     .run_until(async {
//!         let root = Harness::new();
//!         root.test_async("waits", |t| async move {
//!             tokio::task::yield_now().await;
//!             t.pass("resumed");
//!             t.end();
//!         });
//!         driver::drive(&root).await
//!     })
//!     .await;
//! assert_eq!(status, RunStatus::Completed);
//! # }
//! ```

use std::future::Future;

use crate::error::HarnessResult;
use crate::harness::{Declaration, Harness, RunStatus};
use crate::scheduler::Scheduler;

/// Marks an asynchronous body as running until dropped, even if the body panics.
struct InFlight(Scheduler);

impl InFlight {
    fn begin(scheduler: Scheduler) -> Self {
        scheduler.begin_async();
        Self(scheduler)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.finish_async();
    }
}

impl Harness {
    /// Declare a unit whose body is asynchronous.
    ///
    /// # Panics
    ///
    /// Granting control to the unit panics outside a [`tokio::task::LocalSet`].
    pub fn test_async<F, Fut>(&self, declaration: impl Into<Declaration>, body: F) -> Option<Harness>
    where
        F: FnOnce(Harness) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.test_with(declaration, move |unit| {
            let in_flight = InFlight::begin(unit.scheduler());
            let future = body(unit.clone());
            tokio::task::spawn_local(async move {
                let _in_flight = in_flight;
                future.await;
            });
        })
    }
}

/// Drive `root`'s tree until it completes, bails out, or stalls.
///
/// Alternates between draining the scheduler and waiting for asynchronous bodies to queue more work. An
/// exhausted tick budget is logged and reported as the node's status at that point.
pub async fn drive(root: &Harness) -> RunStatus {
    match try_drive(root).await {
        Ok(status) => status,
        Err(err) => {
            tracing::warn!(unit = %root.name(), %err, "drive stopped early");
            root.status()
        }
    }
}

#[tracing::instrument(skip_all, fields(unit = %root.name()))]
pub async fn try_drive(root: &Harness) -> HarnessResult<RunStatus> {
    let scheduler = root.scheduler();
    loop {
        match root.try_run()? {
            RunStatus::Pending => {}
            status => {
                tracing::debug!(?status, ticks = scheduler.ticks(), "drive finished");
                return Ok(status);
            }
        }
        scheduler.woken().await;
    }
}
