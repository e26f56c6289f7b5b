//! Errors for the fallible edges of the orchestrator
//!
//! Protocol anomalies inside a harness tree (double completion, plan mismatches, skips) are never errors:
//! they are recorded as failure outcomes. Only the surrounding machinery can fail: driving a tree past its
//! tick budget, and loading scenario files.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("tick budget of {budget} exhausted with {pending} task(s) still queued")]
    #[diagnostic(
        code(nestrun::tick_budget),
        help("a unit body keeps deferring work; raise --max-ticks or make sure every unit ends")
    )]
    TickBudgetExhausted { budget: usize, pending: usize },

    #[error("failed to read scenario: {0}")]
    #[diagnostic(code(nestrun::io))]
    Io(#[from] std::io::Error),

    #[error("invalid scenario: {0}")]
    #[diagnostic(
        code(nestrun::scenario),
        help("a scenario is a JSON object with a `units` array; each unit has a `name` and `steps`")
    )]
    Scenario(#[from] serde_json::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
