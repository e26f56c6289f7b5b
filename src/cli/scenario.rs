//! JSON scenarios
//!
//! A scenario describes a tree of units and the steps each unit's body performs, so a run can be replayed
//! from a file:
//!
//! ```json
//! {
//!   "name": "suite",
//!   "units": [
//!     { "name": "math", "steps": [{ "equal": { "found": 2, "wanted": 2, "name": "sum" } }, "end"] },
//!     { "name": "later", "skip": true, "steps": [] },
//!     { "name": "nested", "steps": [{ "test": { "name": "inner", "steps": [{ "pass": "deep" }, "end"] } }] }
//!   ]
//! }
//! ```
//!
//! Steps run in order when the unit receives control. `"yield"` splits a body across scheduler ticks, which
//! is how a scenario models a unit that finishes asynchronously.

use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::Path;

use nestrun_core::Results;
use serde::Deserialize;

use crate::config::{HarnessConfig, ReportConfig};
use crate::error::HarnessResult;
use crate::harness::{Declaration, Harness, RunStatus, UnitConfig};
use crate::report;

/// A whole run: the root's name and plan, and the units declared on it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub plan: Option<usize>,
    pub units: Vec<UnitScript>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitScript {
    pub name: String,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One action of a unit body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Pass(String),
    Fail(String),
    Ok {
        condition: bool,
        name: String,
    },
    Equal {
        found: serde_json::Value,
        wanted: serde_json::Value,
        name: String,
    },
    Plan(usize),
    Bailout(Option<String>),
    End,
    /// Continue the remaining steps on a later tick.
    Yield,
    /// Declare a nested unit.
    Test(UnitScript),
}

/// What a replayed scenario ended with.
#[derive(Debug, Clone)]
pub struct Replay {
    pub status: RunStatus,
    pub results: Results,
}

impl Replay {
    /// Completed with no failures and no bailouts.
    pub fn passed(&self) -> bool {
        self.status == RunStatus::Completed && self.results.is_ok()
    }
}

impl Scenario {
    pub fn from_json(source: &str) -> HarnessResult<Self> {
        Ok(serde_json::from_str(source)?)
    }
}

/// Load, declare, and run the scenario at `path`, reporting to `out`.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn run_file(
    path: &Path,
    config: HarnessConfig,
    report: &ReportConfig,
    out: Box<dyn Write>,
) -> HarnessResult<Replay> {
    let source = fs::read_to_string(path)?;
    let scenario = Scenario::from_json(&source)?;
    tracing::debug!(units = scenario.units.len(), "scenario loaded");
    run_scenario(&scenario, config, report, out)
}

pub fn run_scenario(
    scenario: &Scenario,
    config: HarnessConfig,
    report: &ReportConfig,
    out: Box<dyn Write>,
) -> HarnessResult<Replay> {
    let root = Harness::with_config(config);
    if let Some(name) = &scenario.name {
        root.set_name(name.as_str());
    }
    // reporters are inherited at declaration time
    root.attach_reporter(report::reporter_for(report, out));
    declare(&root, scenario);

    let status = root.try_run()?;
    Ok(Replay {
        status,
        results: root.results(),
    })
}

/// Declare every unit of `scenario` on `root`.
pub fn declare(root: &Harness, scenario: &Scenario) {
    if let Some(plan) = scenario.plan {
        root.plan(plan);
    }
    for unit in &scenario.units {
        declare_unit(root, unit);
    }
}

pub fn declare_unit(parent: &Harness, script: &UnitScript) -> Option<Harness> {
    let config = UnitConfig {
        skip: script.skip,
        name: None,
    };
    let steps: VecDeque<Step> = script.steps.iter().cloned().collect();
    let declaration = Declaration::named(script.name.as_str()).config(config);
    parent.test_with(declaration, move |t| replay(t, steps))
}

/// Run `steps` on `t` until they are exhausted or a `yield` defers the rest.
pub fn replay(t: &Harness, mut steps: VecDeque<Step>) {
    while let Some(step) = steps.pop_front() {
        match step {
            Step::Pass(name) => t.pass(name),
            Step::Fail(name) => t.fail(name),
            Step::Ok { condition, name } => {
                t.ok(condition, name);
            }
            Step::Equal { found, wanted, name } => {
                t.equal(found, wanted, name);
            }
            Step::Plan(count) => t.plan(count),
            Step::Bailout(message) => t.bailout(message.as_deref()),
            Step::End => t.end(),
            Step::Yield => {
                t.defer(move |t| replay(t, steps));
                return;
            }
            Step::Test(script) => {
                declare_unit(t, &script);
            }
        }
    }
}
