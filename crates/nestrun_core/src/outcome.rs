//! Structured outcome records.

use serde::{Deserialize, Serialize};

/// The check an assertion record was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Ok,
    Pass,
    Fail,
    Equal,
    NotEqual,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Ok => "ok",
            Operator::Pass => "pass",
            Operator::Fail => "fail",
            Operator::Equal => "equal",
            Operator::NotEqual => "not_equal",
        }
    }
}

/// A single pass/fail record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub ok: bool,
    pub name: String,
    pub operator: Operator,
    /// Set for units that were skipped instead of run. A skipped record is still a failure.
    pub skip: bool,
    /// `false` suppresses diagnostic detail (found/wanted) when rendered.
    pub diag: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wanted: Option<String>,
}

/// An entry in a [`crate::Results`] aggregator.
///
/// Bailout markers are kept apart from assertions: they never count towards a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Assertion(Assertion),
    Bailout { message: String },
}

impl Outcome {
    pub fn as_assertion(&self) -> Option<&Assertion> {
        match self {
            Outcome::Assertion(a) => Some(a),
            Outcome::Bailout { .. } => None,
        }
    }

    pub fn is_bailout(&self) -> bool {
        matches!(self, Outcome::Bailout { .. })
    }

    /// True for failed assertions (skips included); bailout markers are neither passes nor failures.
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Assertion(a) if !a.ok)
    }

    /// Name of the assertion, or the bailout message.
    pub fn label(&self) -> &str {
        match self {
            Outcome::Assertion(a) => &a.name,
            Outcome::Bailout { message } => message,
        }
    }
}

impl From<Assertion> for Outcome {
    fn from(assertion: Assertion) -> Self {
        Outcome::Assertion(assertion)
    }
}
