//! Assertion-record constructors.
//!
//! These never panic and never touch an aggregator: they only build [`Outcome`] values. Recording is the
//! caller's job (usually `Harness::record` in the `nestrun` crate).

use std::fmt::Debug;

use crate::outcome::{Assertion, Operator, Outcome};

/// Metadata attached to an assertion record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssertMeta {
    pub skip: bool,
    pub diag: bool,
}

impl Default for AssertMeta {
    fn default() -> Self {
        Self { skip: false, diag: true }
    }
}

impl AssertMeta {
    /// Metadata for a unit that was skipped instead of run: flagged as skip, diagnostics suppressed.
    pub fn skipped() -> Self {
        Self { skip: true, diag: false }
    }
}

fn record(ok: bool, name: impl Into<String>, operator: Operator, meta: AssertMeta) -> Assertion {
    Assertion {
        ok,
        name: name.into(),
        operator,
        skip: meta.skip,
        diag: meta.diag,
        found: None,
        wanted: None,
    }
}

/// Pass when `condition` holds.
pub fn ok(condition: bool, name: impl Into<String>) -> Outcome {
    record(condition, name, Operator::Ok, AssertMeta::default()).into()
}

/// An unconditional pass.
pub fn pass(name: impl Into<String>) -> Outcome {
    record(true, name, Operator::Pass, AssertMeta::default()).into()
}

/// An unconditional failure.
pub fn fail(name: impl Into<String>) -> Outcome {
    fail_with(name, AssertMeta::default())
}

/// An unconditional failure carrying explicit metadata.
///
/// ## Examples
/// ```rust
/// use nestrun_core::{assert, AssertMeta};
/// let outcome = assert::fail_with("slow unit", AssertMeta::skipped());
/// let record = outcome.as_assertion().unwrap();
/// assert!(!record.ok && record.skip && !record.diag);
/// ```
pub fn fail_with(name: impl Into<String>, meta: AssertMeta) -> Outcome {
    record(false, name, Operator::Fail, meta).into()
}

/// Compare `found` against `wanted`, keeping both rendered with `Debug` for diagnostics.
///
/// ## Parameters
/// - `found`: the observed value.
/// - `wanted`: the expected value.
/// - `name`: description of the check.
///
/// ## Returns
/// - (`Outcome`): a passing record when the values are equal, a failing one otherwise. Both sides are kept
///   either way so reporters can show them.
pub fn equal<T: PartialEq + Debug>(found: T, wanted: T, name: impl Into<String>) -> Outcome {
    let mut assertion = record(found == wanted, name, Operator::Equal, AssertMeta::default());
    assertion.found = Some(format!("{:?}", found));
    assertion.wanted = Some(format!("{:?}", wanted));
    assertion.into()
}

/// The inverse of [`equal`].
pub fn not_equal<T: PartialEq + Debug>(found: T, wanted: T, name: impl Into<String>) -> Outcome {
    let mut assertion = record(found != wanted, name, Operator::NotEqual, AssertMeta::default());
    assertion.found = Some(format!("{:?}", found));
    assertion.wanted = Some(format!("{:?}", wanted));
    assertion.into()
}

/// A bailout marker.
pub fn bailout(message: impl Into<String>) -> Outcome {
    Outcome::Bailout {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_keeps_both_sides() {
        let outcome = equal(1usize, 2usize, "test count != plan");
        let a = outcome.as_assertion().unwrap();
        assert!(!a.ok);
        assert_eq!(a.operator, Operator::Equal);
        assert_eq!(a.found.as_deref(), Some("1"));
        assert_eq!(a.wanted.as_deref(), Some("2"));
    }

    #[test]
    fn test_equal_passes_on_match() {
        assert!(!equal("a", "a", "same").is_failure());
        assert!(not_equal("a", "a", "same").is_failure());
    }

    #[test]
    fn test_ok_follows_condition() {
        assert!(!ok(true, "t").is_failure());
        assert!(ok(false, "f").is_failure());
    }

    #[test]
    fn test_fail_defaults_to_diag() {
        let outcome = fail("end called more than once");
        let a = outcome.as_assertion().unwrap();
        assert!(!a.ok);
        assert!(!a.skip);
        assert!(a.diag);
    }

    #[test]
    fn test_bailout_is_not_a_failure() {
        let marker = bailout("disk full");
        assert!(marker.is_bailout());
        assert!(!marker.is_failure());
        assert_eq!(marker.label(), "disk full");
    }
}
