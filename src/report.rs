//! Report sinks
//!
//! ## TestReporter Trait
//!
//! The orchestrator never formats anything itself. Every lifecycle event of a tree is forwarded to the
//! [`TestReporter`]s attached with [`Harness::report_to`]; reporters attached to a node are inherited by the
//! units declared beneath it, so a reporter on the root sees the whole tree.
//!
//! Two sinks ship with the crate:
//! - [`ConsoleReporter`]: pytest-style progress and summary for humans,
//! - [`JsonReporter`]: one JSON object per event, for tools.
//!
//! Implement the trait for any other format (TAP, JUnit, ...).

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};

use nestrun_core::{Outcome, Results};
use serde::Serialize;

use crate::config::{ReportConfig, ReportFormat};
use crate::harness::{Event, Harness};

// ============================================================================
// Test Reporter Trait
// ============================================================================

/// Trait for rendering harness events.
pub trait TestReporter {
    /// Called when a unit is granted control
    fn on_ready(&mut self, _unit: &Harness) {}

    /// Called when an outcome is recorded directly on a unit
    fn on_outcome(&mut self, _unit: &Harness, _outcome: &Outcome) {}

    /// Called when a finished child has been merged into its parent
    fn on_child_end(&mut self, _parent: &Harness, _child: &Harness) {}

    /// Called when a unit bails out
    fn on_bailout(&mut self, unit: &Harness, message: &str);

    /// Called when a unit completes
    fn on_end(&mut self, unit: &Harness);
}

/// A reporter shared between the nodes of a tree.
pub type SharedReporter = Rc<RefCell<dyn TestReporter>>;

pub(crate) fn dispatch(reporter: &mut dyn TestReporter, unit: &Harness, event: &Event) {
    match event {
        Event::Ready => reporter.on_ready(unit),
        Event::Outcome(outcome) => reporter.on_outcome(unit, outcome),
        Event::ChildEnd(child) => reporter.on_child_end(unit, child),
        Event::Bailout(message) => reporter.on_bailout(unit, message),
        Event::End => reporter.on_end(unit),
    }
}

/// Build the reporter selected by `config`, writing to `out`.
pub fn reporter_for(config: &ReportConfig, out: Box<dyn Write>) -> SharedReporter {
    match config.format {
        ReportFormat::Console => Rc::new(RefCell::new(
            ConsoleReporter::with_writer(out)
                .verbose(config.verbose)
                .color(config.color),
        )),
        ReportFormat::Json => Rc::new(RefCell::new(JsonReporter::new(out))),
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Summary of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub bailouts: usize,
    pub duration: Duration,
}

impl TestSummary {
    pub fn from_results(results: &Results, duration: Duration) -> Self {
        Self {
            total: results.total(),
            passed: results.passed(),
            failed: results.failed(),
            skipped: results.skipped(),
            bailouts: results.bailouts(),
            duration,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.bailouts > 0
    }

    /// `2 passed, 1 failed, 1 skipped`; skipped units are counted in `failed` as well.
    pub fn counts(&self) -> String {
        let mut parts = Vec::new();
        if self.passed > 0 {
            parts.push(format!("{} passed", self.passed));
        }
        if self.failed > 0 {
            parts.push(format!("{} failed", self.failed));
        }
        if self.skipped > 0 {
            parts.push(format!("{} skipped", self.skipped));
        }
        if self.bailouts > 0 {
            parts.push(format!("{} bailed out", self.bailouts));
        }
        if parts.is_empty() {
            parts.push("no outcomes".to_string());
        }
        parts.join(", ")
    }
}

// ============================================================================
// Console Reporter
// ============================================================================

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BOLD_RED: &str = "\x1b[1;31m";
const BOLD_GREEN: &str = "\x1b[1;32m";

/// Default console reporter (pytest-style)
pub struct ConsoleReporter {
    verbose: bool,
    color: bool,
    out: Box<dyn Write>,
    started: Instant,
    /// Progress dots written since the last newline.
    dots: bool,
    failures: Vec<(String, Outcome)>,
    /// Message and depth of the last bailout seen. A propagated bailout reaches each ancestor in turn with
    /// the same message; only the first unit of that chain prints it.
    last_bailout: Option<(String, usize)>,
    summary_printed: bool,
    write_failed: bool,
}

impl fmt::Debug for ConsoleReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleReporter")
            .field("verbose", &self.verbose)
            .field("color", &self.color)
            .field("failures", &self.failures.len())
            .finish()
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::stdout()
    }
}

impl ConsoleReporter {
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write>) -> Self {
        Self {
            verbose: false,
            color: true,
            out,
            started: Instant::now(),
            dots: false,
            failures: Vec::new(),
            last_bailout: None,
            summary_printed: false,
            write_failed: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn paint(&self, text: &str, color: &str) -> String {
        if self.color {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn write(&mut self, text: &str) {
        if let Err(err) = self.out.write_all(text.as_bytes()) {
            self.write_error(err);
        }
    }

    fn flush(&mut self) {
        if let Err(err) = self.out.flush() {
            self.write_error(err);
        }
    }

    fn write_error(&mut self, err: io::Error) {
        // report once; a broken pipe would otherwise log every event
        if !self.write_failed {
            tracing::warn!(%err, "console report write failed");
            self.write_failed = true;
        }
    }

    fn line(&mut self, text: &str) {
        if self.dots {
            self.dots = false;
            self.write("\n");
        }
        self.write(text);
        self.write("\n");
    }

    fn indent(depth: usize) -> String {
        "  ".repeat(depth.saturating_sub(1))
    }

    fn status(&self, outcome: &Outcome) -> String {
        match outcome {
            Outcome::Assertion(a) if a.skip => self.paint("SKIPPED", YELLOW),
            Outcome::Assertion(a) if a.ok => self.paint("PASSED", GREEN),
            Outcome::Assertion(_) => self.paint("FAILED", RED),
            Outcome::Bailout { .. } => self.paint("BAILOUT", RED),
        }
    }

    fn print_failures(&mut self) {
        if self.failures.is_empty() {
            return;
        }
        let header = self.paint("=================== FAILURES ===================", BOLD_RED);
        self.line("");
        self.line(&header);
        let failures = std::mem::take(&mut self.failures);
        for (unit, outcome) in &failures {
            let unit = if unit.is_empty() { "<root>" } else { unit.as_str() };
            self.line("");
            self.line(&format!("___________ {} ___________", unit));
            self.line(&format!("    {}", outcome.label()));
            if let Outcome::Assertion(a) = outcome {
                if a.diag {
                    if let (Some(found), Some(wanted)) = (&a.found, &a.wanted) {
                        self.line(&format!("    found:  {}", found));
                        self.line(&format!("    wanted: {}", wanted));
                    }
                }
            }
        }
        self.failures = failures;
    }

    fn print_summary(&mut self, unit: &Harness) {
        if self.summary_printed {
            return;
        }
        self.summary_printed = true;
        let summary = unit.with_results(|results| TestSummary::from_results(results, self.started.elapsed()));
        self.print_failures();
        let color = if summary.has_failures() { BOLD_RED } else { BOLD_GREEN };
        let text = format!(
            "=================== {} in {:.2}s ===================",
            summary.counts(),
            summary.duration.as_secs_f64()
        );
        let text = self.paint(&text, color);
        self.line("");
        self.line(&text);
        self.flush();
    }
}

impl TestReporter for ConsoleReporter {
    fn on_ready(&mut self, unit: &Harness) {
        if self.verbose {
            let text = format!("{}{}", Self::indent(unit.depth()), unit.name());
            self.line(&text);
        }
    }

    fn on_outcome(&mut self, unit: &Harness, outcome: &Outcome) {
        if outcome.is_failure() {
            self.failures.push((unit.name(), outcome.clone()));
        }
        if self.verbose {
            let text = format!(
                "{}  {} {}",
                Self::indent(unit.depth()),
                outcome.label(),
                self.status(outcome)
            );
            self.line(&text);
            return;
        }
        let dot = match outcome {
            Outcome::Assertion(a) if a.skip => self.paint("s", YELLOW),
            Outcome::Assertion(a) if a.ok => self.paint(".", GREEN),
            _ => self.paint("F", RED),
        };
        self.write(&dot);
        self.dots = true;
    }

    fn on_bailout(&mut self, unit: &Harness, message: &str) {
        let depth = unit.depth();
        let propagated = matches!(
            &self.last_bailout,
            Some((last, last_depth)) if last == message && depth + 1 == *last_depth
        );
        if !propagated {
            let text = self.paint(&format!("Bail out! {}", message), BOLD_RED);
            self.line(&text);
        }
        self.last_bailout = Some((message.to_string(), depth));
        if depth == 0 {
            self.print_summary(unit);
        }
    }

    fn on_end(&mut self, unit: &Harness) {
        if unit.depth() == 0 {
            self.print_summary(unit);
        }
    }
}

// ============================================================================
// JSON Reporter
// ============================================================================

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Record<'a> {
    Ready {
        unit: &'a str,
        depth: usize,
    },
    Outcome {
        unit: &'a str,
        depth: usize,
        outcome: &'a Outcome,
    },
    ChildEnd {
        unit: &'a str,
        depth: usize,
        child: &'a str,
        total: usize,
    },
    Bailout {
        unit: &'a str,
        depth: usize,
        message: &'a str,
    },
    End {
        unit: &'a str,
        depth: usize,
        total: usize,
        passed: usize,
        failed: usize,
        skipped: usize,
        plan: Option<usize>,
    },
}

/// Writes one compact JSON object per event.
pub struct JsonReporter {
    out: Box<dyn Write>,
    write_failed: bool,
}

impl JsonReporter {
    pub fn new(out: Box<dyn Write>) -> Self {
        Self {
            out,
            write_failed: false,
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    fn emit(&mut self, record: &Record<'_>) {
        let written = serde_json::to_writer(&mut self.out, record)
            .map_err(io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"));
        if let Err(err) = written {
            self.write_error(err);
        }
    }

    fn flush(&mut self) {
        if let Err(err) = self.out.flush() {
            self.write_error(err);
        }
    }

    fn write_error(&mut self, err: io::Error) {
        if !self.write_failed {
            tracing::warn!(%err, "json report write failed");
            self.write_failed = true;
        }
    }
}

impl TestReporter for JsonReporter {
    fn on_ready(&mut self, unit: &Harness) {
        let name = unit.name();
        self.emit(&Record::Ready {
            unit: &name,
            depth: unit.depth(),
        });
    }

    fn on_outcome(&mut self, unit: &Harness, outcome: &Outcome) {
        let name = unit.name();
        self.emit(&Record::Outcome {
            unit: &name,
            depth: unit.depth(),
            outcome,
        });
    }

    fn on_child_end(&mut self, parent: &Harness, child: &Harness) {
        let (name, child_name) = (parent.name(), child.name());
        self.emit(&Record::ChildEnd {
            unit: &name,
            depth: parent.depth(),
            child: &child_name,
            total: child.total(),
        });
    }

    fn on_bailout(&mut self, unit: &Harness, message: &str) {
        let name = unit.name();
        self.emit(&Record::Bailout {
            unit: &name,
            depth: unit.depth(),
            message,
        });
        self.flush();
    }

    fn on_end(&mut self, unit: &Harness) {
        let name = unit.name();
        let (total, passed, failed, skipped) =
            unit.with_results(|r| (r.total(), r.passed(), r.failed(), r.skipped()));
        self.emit(&Record::End {
            unit: &name,
            depth: unit.depth(),
            total,
            passed,
            failed,
            skipped,
            plan: unit.planned(),
        });
        self.flush();
    }
}

// ============================================================================
// Capture
// ============================================================================

/// An in-memory `Write` target whose clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
