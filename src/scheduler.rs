//! Cooperative deferred-task queue
//!
//! Every scheduling pass of a harness tree runs as a *tick*: a single-shot task pushed onto the tree's
//! [`Scheduler`] and executed later, in FIFO order, on the same thread. Nothing here is a timer; a deferred
//! task runs on the next drain of the queue, after whatever code is currently running has returned.
//!
//! This is what lets several units declared in one synchronous stretch all land in their parent's queue
//! before the parent's first scheduling pass runs.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tokio::sync::Notify;

use crate::error::HarnessError;

type Task = Box<dyn FnOnce()>;

struct SchedulerState {
    queue: RefCell<VecDeque<Task>>,
    ticks: Cell<usize>,
    /// Asynchronous unit bodies that have been spawned and not yet finished.
    in_flight: Cell<usize>,
    wake: Notify,
}

/// Shared handle to a tree's task queue. Cloning is cheap and yields the same queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerState>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending())
            .field("ticks", &self.ticks())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SchedulerState {
                queue: RefCell::new(VecDeque::new()),
                ticks: Cell::new(0),
                in_flight: Cell::new(0),
                wake: Notify::new(),
            }),
        }
    }

    /// Queue `task` to run on a later tick.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.inner.queue.borrow_mut().push_back(Box::new(task));
        self.inner.wake.notify_one();
    }

    /// Run the oldest queued task. Returns `false` when the queue was empty.
    pub fn tick(&self) -> bool {
        // The borrow must end before the task runs: tasks defer more tasks.
        let task = self.inner.queue.borrow_mut().pop_front();
        let Some(task) = task else {
            return false;
        };
        let tick = self.inner.ticks.get() + 1;
        self.inner.ticks.set(tick);
        tracing::trace!(tick, "scheduler tick");
        task();
        true
    }

    /// Run tasks until the queue is empty, including tasks queued while draining.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.tick() {
            ran += 1;
        }
        ran
    }

    /// Like [`Scheduler::run_until_idle`], but gives up after `budget` ticks.
    pub fn run_with_budget(&self, budget: usize) -> Result<usize, HarnessError> {
        let mut ran = 0;
        while ran < budget {
            if !self.tick() {
                return Ok(ran);
            }
            ran += 1;
        }
        if self.is_idle() {
            Ok(ran)
        } else {
            Err(HarnessError::TickBudgetExhausted {
                budget,
                pending: self.pending(),
            })
        }
    }

    pub fn is_idle(&self) -> bool {
        self.inner.queue.borrow().is_empty()
    }

    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Total ticks executed so far.
    pub fn ticks(&self) -> usize {
        self.inner.ticks.get()
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.get()
    }

    /// Nothing queued and no asynchronous body still running.
    pub fn is_quiescent(&self) -> bool {
        self.is_idle() && self.in_flight() == 0
    }

    pub(crate) fn begin_async(&self) {
        self.inner.in_flight.set(self.inner.in_flight.get() + 1);
    }

    pub(crate) fn finish_async(&self) {
        self.inner.in_flight.set(self.inner.in_flight.get().saturating_sub(1));
        self.inner.wake.notify_one();
    }

    /// Resolve once a task is deferred or an asynchronous body finishes.
    ///
    /// A notification sent while nobody waits is kept, so a wakeup between a quiescence check and this call
    /// is not lost.
    pub(crate) async fn woken(&self) {
        self.inner.wake.notified().await;
    }
}
