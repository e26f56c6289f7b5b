//! The results aggregator.

use serde::Serialize;

use crate::outcome::Outcome;

/// Accumulates outcome records for one node.
///
/// Counts are kept incrementally so `total()` stays O(1) however many child aggregators are merged in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Results {
    outcomes: Vec<Outcome>,
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
    bailouts: usize,
}

impl Results {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, outcome: Outcome) {
        self.count(&outcome);
        self.outcomes.push(outcome);
    }

    /// Merge every record of `other` into this aggregator, in order.
    pub fn add_set(&mut self, other: &Results) {
        self.outcomes.reserve(other.outcomes.len());
        for outcome in &other.outcomes {
            self.count(outcome);
            self.outcomes.push(outcome.clone());
        }
    }

    fn count(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Assertion(a) => {
                self.total += 1;
                if a.ok {
                    self.passed += 1;
                } else {
                    self.failed += 1;
                }
                if a.skip {
                    self.skipped += 1;
                }
            }
            Outcome::Bailout { .. } => self.bailouts += 1,
        }
    }

    /// Number of assertion records. Bailout markers are not counted.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    /// Failed assertions, skipped units included.
    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn bailouts(&self) -> usize {
        self.bailouts
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn bailout_messages(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|o| match o {
            Outcome::Bailout { message } => Some(message.as_str()),
            Outcome::Assertion(_) => None,
        })
    }

    /// No failures and no bailouts.
    pub fn is_ok(&self) -> bool {
        self.failed == 0 && self.bailouts == 0
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert;
    use crate::AssertMeta;

    #[test]
    fn test_add_counts_by_kind() {
        let mut results = Results::new();
        results.add(assert::pass("a"));
        results.add(assert::fail("b"));
        results.add(assert::fail_with("c", AssertMeta::skipped()));
        results.add(assert::bailout("stop"));

        assert_eq!(results.total(), 3);
        assert_eq!(results.passed(), 1);
        assert_eq!(results.failed(), 2);
        assert_eq!(results.skipped(), 1);
        assert_eq!(results.bailouts(), 1);
        assert_eq!(results.outcomes().len(), 4);
        assert!(!results.is_ok());
    }

    #[test]
    fn test_add_set_keeps_order_without_duplicates() {
        let mut child = Results::new();
        child.add(assert::pass("one"));
        child.add(assert::pass("two"));

        let mut parent = Results::new();
        parent.add(assert::pass("zero"));
        parent.add_set(&child);
        parent.add_set(&Results::new());

        let names: Vec<_> = parent.outcomes().iter().map(|o| o.label()).collect();
        assert_eq!(names, vec!["zero", "one", "two"]);
        assert_eq!(parent.total(), 3);
        // the merged-from aggregator is untouched
        assert_eq!(child.total(), 2);
    }

    #[test]
    fn test_repeated_merges_accumulate() {
        let mut leaf = Results::new();
        leaf.add(assert::fail("x"));

        let mut root = Results::new();
        for _ in 0..10 {
            root.add_set(&leaf);
        }
        assert_eq!(root.total(), 10);
        assert_eq!(root.failures().count(), 10);
    }

    #[test]
    fn test_bailout_messages() {
        let mut results = Results::new();
        results.add(assert::bailout("disk full"));
        results.add(assert::pass("p"));
        assert_eq!(results.bailout_messages().collect::<Vec<_>>(), vec!["disk full"]);
        assert_eq!(results.total(), 1);
    }
}
