//! The recursive orchestrator
//!
//! A [`Harness`] is both a scheduler of child units and a unit its own parent schedules. Every test unit and
//! every top-level run is the same node type, composed into a tree:
//!
//! - control flows down: a parent grants control to exactly one child at a time, in declaration order;
//! - completion flows up: a child emits `end`, the parent merges its results and advances its queue.
//!
//! ## Scheduling
//!
//! Scheduling passes never run inline. [`Harness::process`] queues a pass on the tree's
//! [`Scheduler`](crate::scheduler::Scheduler); the pass runs when the scheduler is drained (see
//! [`Harness::run`] and [`crate::driver::drive`]). Declaring several units in a row therefore queues all of
//! them before the first one starts.
//!
//! ## Anomalies
//!
//! Protocol violations are recorded as failure outcomes in the node's results, never raised:
//!
//! | Violation                 | Recorded failure               |
//! |---------------------------|--------------------------------|
//! | `end` called twice        | `end called more than once`    |
//! | `plan` called twice       | `plan set multiple times`      |
//! | total != plan at `end`    | `test count != plan`           |
//! | unit declared with `skip` | the unit's name, flagged skip  |
//!
//! A bailout is not an anomaly but state: once set, the node accepts no new units, drains its queue without
//! running it, and never completes.

mod declaration;
mod event;


use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use nestrun_core::{AssertMeta, Outcome, Results, assert};

use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use crate::report::{self, SharedReporter, TestReporter};
use crate::scheduler::Scheduler;

pub use declaration::{Body, Declaration, UnitConfig};
pub use event::Event;
use event::Listener;

/// Where a tree stands after its scheduler was drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The node emitted `end`.
    Completed,
    /// The node bailed out; it will never complete.
    BailedOut,
    /// Asynchronous bodies are still running.
    Pending,
    /// Nothing is queued or running, yet the node has not completed (a unit never ended).
    Stalled,
}

struct Node {
    name: String,
    unit: UnitConfig,
    depth: usize,

    plan: Option<usize>,
    children: VecDeque<Harness>,
    current: Option<Harness>,
    /// The parent handed this node control (always false for roots).
    granted: bool,
    started: bool,
    ended: bool,
    bailed_out: bool,
    test_count: usize,
    plan_sum: usize,
    results: Results,

    parent: Weak<RefCell<Node>>,
    scheduler: Scheduler,
    config: Rc<HarnessConfig>,
    listeners: Vec<Listener>,
    reporters: Vec<SharedReporter>,
    body: Option<Body>,
}

impl Node {
    fn new(name: String, unit: UnitConfig, config: Rc<HarnessConfig>, scheduler: Scheduler) -> Self {
        Self {
            name,
            unit,
            depth: 0,
            plan: None,
            children: VecDeque::new(),
            current: None,
            granted: false,
            started: false,
            ended: false,
            bailed_out: false,
            test_count: 0,
            plan_sum: 0,
            results: Results::new(),
            parent: Weak::new(),
            scheduler,
            config,
            listeners: Vec::new(),
            reporters: Vec::new(),
            body: None,
        }
    }
}

/// Handle to a node of a harness tree. Clones share the node.
#[derive(Clone)]
pub struct Harness {
    inner: Rc<RefCell<Node>>,
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(node) => f
                .debug_struct("Harness")
                .field("name", &node.name)
                .field("depth", &node.depth)
                .field("plan", &node.plan)
                .field("queued", &node.children.len())
                .field("started", &node.started)
                .field("ended", &node.ended)
                .field("bailed_out", &node.bailed_out)
                .field("total", &node.results.total())
                .finish(),
            Err(_) => f.write_str("Harness { <in use> }"),
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    // ========================================================================
    // Construction
    // ========================================================================

    /// A root node with the default configuration and a fresh scheduler.
    pub fn new() -> Self {
        Self::with_config(HarnessConfig::default())
    }

    pub fn with_config(config: HarnessConfig) -> Self {
        Self::with_scheduler(config, Scheduler::new())
    }

    /// A root node driven by an existing scheduler.
    pub fn with_scheduler(config: HarnessConfig, scheduler: Scheduler) -> Self {
        Self::from_node(Node::new(String::new(), UnitConfig::default(), Rc::new(config), scheduler))
    }

    /// A detached unit, ready to be handed to [`Harness::add`].
    pub fn unit(declaration: impl Into<Declaration>) -> Self {
        let declaration = declaration.into();
        let mut node = Node::new(
            declaration.resolved_name(),
            declaration.config,
            Rc::new(HarnessConfig::default()),
            Scheduler::new(),
        );
        node.body = declaration.body;
        Self::from_node(node)
    }

    fn from_node(node: Node) -> Self {
        Self {
            inner: Rc::new(RefCell::new(node)),
        }
    }

    fn from_weak(weak: &Weak<RefCell<Node>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn downgrade(&self) -> Weak<RefCell<Node>> {
        Rc::downgrade(&self.inner)
    }

    /// True when both handles point at the same node.
    pub fn same_node(&self, other: &Harness) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ========================================================================
    // State accessors
    // ========================================================================

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.inner.borrow_mut().name = name.into();
    }

    /// Distance from the root (the root is 0).
    pub fn depth(&self) -> usize {
        self.inner.borrow().depth
    }

    /// The declared plan. After completion this is the observed total.
    pub fn planned(&self) -> Option<usize> {
        self.inner.borrow().plan
    }

    pub fn is_started(&self) -> bool {
        self.inner.borrow().started
    }

    pub fn is_ended(&self) -> bool {
        self.inner.borrow().ended
    }

    pub fn is_bailed_out(&self) -> bool {
        self.inner.borrow().bailed_out
    }

    pub fn is_skipped(&self) -> bool {
        self.inner.borrow().unit.skip
    }

    /// Children finished so far.
    pub fn test_count(&self) -> usize {
        self.inner.borrow().test_count
    }

    /// Sum of the plans of finished children.
    pub fn plan_sum(&self) -> usize {
        self.inner.borrow().plan_sum
    }

    /// Children still waiting in the queue.
    pub fn queued(&self) -> usize {
        self.inner.borrow().children.len()
    }

    /// The child currently in control, if any.
    pub fn current(&self) -> Option<Harness> {
        self.inner.borrow().current.clone()
    }

    pub fn parent(&self) -> Option<Harness> {
        Self::from_weak(&self.inner.borrow().parent)
    }

    /// Recorded assertion count (bailout markers excluded).
    pub fn total(&self) -> usize {
        self.inner.borrow().results.total()
    }

    /// A snapshot of the node's results.
    pub fn results(&self) -> Results {
        self.inner.borrow().results.clone()
    }

    /// Inspect the results without cloning them.
    pub fn with_results<R>(&self, f: impl FnOnce(&Results) -> R) -> R {
        f(&self.inner.borrow().results)
    }

    pub fn scheduler(&self) -> Scheduler {
        self.inner.borrow().scheduler.clone()
    }

    pub fn config(&self) -> HarnessConfig {
        self.inner.borrow().config.as_ref().clone()
    }

    /// Where this node stands right now.
    pub fn status(&self) -> RunStatus {
        let node = self.inner.borrow();
        if node.ended {
            RunStatus::Completed
        } else if node.bailed_out {
            RunStatus::BailedOut
        } else if node.scheduler.is_quiescent() {
            RunStatus::Stalled
        } else {
            RunStatus::Pending
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Observe every event this node emits.
    pub fn subscribe(&self, listener: impl FnMut(&Harness, &Event) + 'static) {
        let listener: Listener = Rc::new(RefCell::new(listener));
        self.inner.borrow_mut().listeners.push(listener);
    }

    /// Send this node's events, and those of every unit declared beneath it from now on, to `reporter`.
    pub fn report_to<R: TestReporter + 'static>(&self, reporter: R) {
        self.attach_reporter(Rc::new(RefCell::new(reporter)));
    }

    pub fn attach_reporter(&self, reporter: SharedReporter) {
        self.inner.borrow_mut().reporters.push(reporter.clone());
        self.subscribe(move |unit, event| match reporter.try_borrow_mut() {
            Ok(mut reporter) => report::dispatch(&mut *reporter, unit, event),
            Err(_) => tracing::warn!(event = event.kind(), "reporter busy; event dropped"),
        });
    }

    fn emit(&self, event: Event) {
        let listeners = self.inner.borrow().listeners.clone();
        for listener in listeners {
            match listener.try_borrow_mut() {
                Ok(mut listener) => (&mut *listener)(self, &event),
                Err(_) => tracing::warn!(
                    unit = %self.name(),
                    event = event.kind(),
                    "re-entrant listener skipped"
                ),
            }
        }
    }

    // ========================================================================
    // Outcomes
    // ========================================================================

    fn add_outcome(&self, outcome: Outcome) {
        self.inner.borrow_mut().results.add(outcome.clone());
        self.emit(Event::Outcome(outcome));
    }

    /// Record an outcome on this node.
    pub fn record(&self, outcome: Outcome) {
        self.add_outcome(outcome);

        let satisfied = {
            let node = self.inner.borrow();
            node.config.auto_end_on_plan && !node.ended && node.plan == Some(node.results.total())
        };
        if satisfied {
            self.end();
        }
    }

    pub fn ok(&self, condition: bool, name: impl Into<String>) -> bool {
        self.record(assert::ok(condition, name));
        condition
    }

    pub fn pass(&self, name: impl Into<String>) {
        self.record(assert::pass(name));
    }

    pub fn fail(&self, name: impl Into<String>) {
        self.record(assert::fail(name));
    }

    pub fn equal<T: PartialEq + fmt::Debug>(&self, found: T, wanted: T, name: impl Into<String>) -> bool {
        let outcome = assert::equal(found, wanted, name);
        let passed = !outcome.is_failure();
        self.record(outcome);
        passed
    }

    pub fn not_equal<T: PartialEq + fmt::Debug>(&self, found: T, wanted: T, name: impl Into<String>) -> bool {
        let outcome = assert::not_equal(found, wanted, name);
        let passed = !outcome.is_failure();
        self.record(outcome);
        passed
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Declare how many assertions this node will record.
    ///
    /// A plan can only be set once; a second call records `plan set multiple times` and keeps the first value.
    /// A plan of zero, or a plan declared after outcomes were already recorded, completes the node at once.
    pub fn plan(&self, count: usize) {
        let (already_planned, total) = {
            let node = self.inner.borrow();
            (node.plan.is_some(), node.results.total())
        };
        if already_planned {
            tracing::debug!(unit = %self.name(), count, "plan set twice");
            self.add_outcome(assert::fail("plan set multiple times"));
            return;
        }

        self.inner.borrow_mut().plan = Some(count);
        if count == 0 || total > 0 {
            self.end();
        }
    }

    /// Complete this node.
    ///
    /// Suppressed entirely once the node bailed out. A second completion records
    /// `end called more than once` and emits `end` again, without touching anything else.
    pub fn end(&self) {
        let (already_ended, plan) = {
            let node = self.inner.borrow();
            if node.bailed_out {
                tracing::debug!(unit = %node.name, "end suppressed after bailout");
                return;
            }
            (node.ended, node.plan)
        };

        if already_ended {
            tracing::debug!(unit = %self.name(), "end called twice");
            self.add_outcome(assert::fail("end called more than once"));
            // the plan was checked and normalized by the first end
            self.emit(Event::End);
            return;
        }

        if let Some(plan) = plan {
            let total = self.total();
            if total != plan {
                tracing::debug!(unit = %self.name(), total, plan, "plan mismatch");
                self.add_outcome(assert::equal(total, plan, "test count != plan"));
            }
            self.inner.borrow_mut().plan = Some(total);
        }

        self.inner.borrow_mut().ended = true;
        tracing::debug!(unit = %self.name(), "end");
        self.emit(Event::End);
    }

    /// Abort this node: record a bailout marker, stop accepting units, never complete.
    pub fn bailout(&self, message: Option<&str>) {
        let message = message.unwrap_or_default().to_string();
        {
            let mut node = self.inner.borrow_mut();
            node.results.add(assert::bailout(message.clone()));
            node.bailed_out = true;
        }
        tracing::debug!(unit = %self.name(), %message, "bailout");
        self.emit(Event::Bailout(message));
    }

    // ========================================================================
    // Declaration and registration
    // ========================================================================

    /// Declare a unit on this node. Refused (returns `None`) once the node bailed out.
    pub fn test(&self, declaration: impl Into<Declaration>) -> Option<Harness> {
        if self.is_bailed_out() {
            tracing::debug!(unit = %self.name(), "declaration refused after bailout");
            return None;
        }
        let child = Harness::unit(declaration);
        self.add(child.clone());
        Some(child)
    }

    /// Declare a unit whose `body` runs when it receives control.
    pub fn test_with(
        &self,
        declaration: impl Into<Declaration>,
        body: impl FnOnce(&Harness) + 'static,
    ) -> Option<Harness> {
        self.test(declaration.into().body(body))
    }

    /// Queue `child` on this node.
    ///
    /// The child joins this tree: it takes over the tree's scheduler and configuration, and the reporters
    /// attached here. The first registration on a node queues its first scheduling pass; on a unit that has not
    /// received control yet, the pass is queued when control arrives. After a bailout the child is dropped.
    pub fn add(&self, child: Harness) {
        if self.same_node(&child) {
            tracing::warn!(unit = %self.name(), "a node cannot be its own child");
            return;
        }

        let (first, scheduler, config, depth, reporters) = {
            let mut node = self.inner.borrow_mut();
            if node.bailed_out {
                tracing::debug!(unit = %node.name, "registration dropped after bailout");
                return;
            }
            node.children.push_back(child.clone());
            // a registered unit without control starts its queue when control arrives
            let can_start = node.granted || node.parent.strong_count() == 0;
            (
                !node.started && can_start,
                node.scheduler.clone(),
                node.config.clone(),
                node.depth + 1,
                node.reporters.clone(),
            )
        };

        child.adopt(self.downgrade(), scheduler, config, depth);
        for reporter in reporters {
            child.attach_reporter(reporter);
        }

        if first {
            self.process();
        }
    }

    /// Move a node, and everything queued beneath it, into another tree.
    fn adopt(&self, parent: Weak<RefCell<Node>>, scheduler: Scheduler, config: Rc<HarnessConfig>, depth: usize) {
        let queued: Vec<Harness> = {
            let mut node = self.inner.borrow_mut();
            node.parent = parent;
            node.scheduler = scheduler.clone();
            node.config = config.clone();
            node.depth = depth;
            // a pass queued on the old scheduler will never run; the queue restarts when control arrives
            if node.started && !node.ended && node.current.is_none() {
                node.started = false;
            }
            node.children.iter().cloned().collect()
        };
        for grandchild in queued {
            grandchild.adopt(self.downgrade(), scheduler.clone(), config.clone(), depth + 1);
        }
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Queue one scheduling pass for this node on the next tick.
    ///
    /// Safe to call redundantly: a pass with a child still in control does nothing.
    pub fn process(&self) {
        let scheduler = {
            let mut node = self.inner.borrow_mut();
            node.started = true;
            node.scheduler.clone()
        };
        let this = self.downgrade();
        scheduler.defer(move || {
            if let Some(harness) = Harness::from_weak(&this) {
                harness.advance();
            }
        });
    }

    /// Defer `task` to a later tick of this tree, with this node as argument.
    pub fn defer(&self, task: impl FnOnce(&Harness) + 'static) {
        let this = self.clone();
        self.scheduler().defer(move || task(&this));
    }

    /// One scheduling pass.
    fn advance(&self) {
        let finished = {
            let node = self.inner.borrow();
            match &node.current {
                Some(child) if !child.is_ended() => return,
                Some(child) => Some(child.clone()),
                None => None,
            }
        };
        if let Some(child) = finished {
            self.child_end(&child);
        }

        let next = loop {
            let candidate = self.inner.borrow_mut().children.pop_front();
            match candidate {
                Some(child) if child.is_skipped() => {
                    tracing::debug!(unit = %self.name(), child = %child.name(), "skipping");
                    self.add_outcome(assert::fail_with(child.name(), AssertMeta::skipped()));
                }
                other => break other,
            }
        };
        self.inner.borrow_mut().current = next.clone();

        match next {
            Some(child) if self.is_bailed_out() => {
                tracing::debug!(unit = %self.name(), child = %child.name(), "draining after bailout");
                self.inner.borrow_mut().current = None;
                self.process();
            }
            Some(child) => {
                self.watch(&child);
                tracing::debug!(unit = %self.name(), child = %child.name(), "granting control");
                child.grant_control();
            }
            None => self.end(),
        }
    }

    /// Merge a finished child into this node.
    fn child_end(&self, child: &Harness) {
        {
            let child_node = child.inner.borrow();
            let mut node = self.inner.borrow_mut();
            node.test_count += 1;
            node.plan_sum += child_node.plan.unwrap_or(0);
            node.results.add_set(&child_node.results);
        }
        tracing::debug!(unit = %self.name(), child = %child.name(), "child finished");
        self.emit(Event::ChildEnd(child.clone()));
    }

    /// Reclaim control when `child` ends, and forward its bailout when configured to.
    fn watch(&self, child: &Harness) {
        let parent = self.downgrade();
        let propagate = self.inner.borrow().config.propagate_bailout;
        let mut reclaimed = false;
        child.subscribe(move |_, event| match event {
            // only the first completion hands control back
            Event::End if !reclaimed => {
                reclaimed = true;
                if let Some(parent) = Harness::from_weak(&parent) {
                    parent.process();
                }
            }
            Event::Bailout(message) if propagate => {
                if let Some(parent) = Harness::from_weak(&parent) {
                    parent.bailout(Some(message.as_str()));
                }
            }
            _ => {}
        });
    }

    /// Signal `ready` and run the body, if any.
    fn grant_control(&self) {
        self.inner.borrow_mut().granted = true;
        self.emit(Event::Ready);
        let body = self.inner.borrow_mut().body.take();
        if let Some(body) = body {
            body(self);
        }

        // units queued before this node joined the tree
        let waiting = {
            let node = self.inner.borrow();
            !node.started && !node.ended && !node.children.is_empty()
        };
        if waiting {
            self.process();
        }
    }

    // ========================================================================
    // Driving
    // ========================================================================

    /// Drain the tree's scheduler and report where this node stands.
    ///
    /// An exhausted tick budget is logged and reported through the returned status; use
    /// [`Harness::try_run`] to get it as an error.
    pub fn run(&self) -> RunStatus {
        match self.try_run() {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(unit = %self.name(), %err, "run stopped early");
                self.status()
            }
        }
    }

    pub fn try_run(&self) -> HarnessResult<RunStatus> {
        let (scheduler, budget) = {
            let node = self.inner.borrow();
            (node.scheduler.clone(), node.config.max_ticks)
        };
        let ticks = match budget {
            Some(budget) => scheduler.run_with_budget(budget)?,
            None => scheduler.run_until_idle(),
        };
        tracing::debug!(unit = %self.name(), ticks, "scheduler drained");
        Ok(self.status())
    }
}
