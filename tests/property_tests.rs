//! Property-based tests for the orchestrator
//!
//! These tests use proptest to build random unit trees (random nesting, skips, outcomes, and units that finish
//! several ticks after they start) and check the sequencing and aggregation invariants on every one of them.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use nestrun::{Declaration, Harness, HarnessConfig, RunStatus};
use proptest::prelude::*;

// =============================================================================
// Random unit trees
// =============================================================================

#[derive(Debug, Clone)]
struct UnitSpec {
    passes: usize,
    fails: usize,
    skip: bool,
    /// Ticks a leaf waits before ending.
    yields: usize,
    children: Vec<UnitSpec>,
}

fn unit_strategy() -> impl Strategy<Value = UnitSpec> {
    let leaf = (0..3usize, 0..2usize, prop::bool::weighted(0.15), 0..3usize).prop_map(
        |(passes, fails, skip, yields)| UnitSpec {
            passes,
            fails,
            skip,
            yields,
            children: Vec::new(),
        },
    );
    leaf.prop_recursive(3, 24, 4, |inner| {
        (
            0..3usize,
            0..2usize,
            prop::bool::weighted(0.15),
            prop::collection::vec(inner, 1..4),
        )
            .prop_map(|(passes, fails, skip, children)| UnitSpec {
                passes,
                fails,
                skip,
                yields: 0,
                children,
            })
    })
}

fn suite_strategy() -> impl Strategy<Value = Vec<UnitSpec>> {
    prop::collection::vec(unit_strategy(), 1..5)
}

/// What the unit bodies observed while running.
#[derive(Clone, Default)]
struct Probe {
    started: Rc<RefCell<Vec<String>>>,
    active_leaves: Rc<Cell<usize>>,
    max_active_leaves: Rc<Cell<usize>>,
}

fn child_name(parent: &str, index: usize) -> String {
    if parent.is_empty() {
        index.to_string()
    } else {
        format!("{parent}.{index}")
    }
}

fn declare_all(parent: &Harness, specs: Vec<UnitSpec>, probe: &Probe) {
    let prefix = parent.name();
    for (index, spec) in specs.into_iter().enumerate() {
        let declaration = Declaration::named(child_name(&prefix, index)).skip(spec.skip);
        let probe = probe.clone();
        parent.test_with(declaration, move |t| run_body(t, spec, probe));
    }
}

fn run_body(t: &Harness, spec: UnitSpec, probe: Probe) {
    probe.started.borrow_mut().push(t.name());
    for i in 0..spec.passes {
        t.pass(format!("pass {i}"));
    }
    for i in 0..spec.fails {
        t.fail(format!("fail {i}"));
    }

    if spec.children.is_empty() {
        let active = probe.active_leaves.get() + 1;
        probe.active_leaves.set(active);
        probe.max_active_leaves.set(probe.max_active_leaves.get().max(active));
        finish_after(t, spec.yields, probe);
    } else {
        declare_all(t, spec.children, &probe);
    }
}

fn finish_after(t: &Harness, yields: usize, probe: Probe) {
    if yields == 0 {
        probe.active_leaves.set(probe.active_leaves.get() - 1);
        t.end();
    } else {
        t.defer(move |t| finish_after(t, yields - 1, probe));
    }
}

// =============================================================================
// Expectations
// =============================================================================

fn expected_order(specs: &[UnitSpec], prefix: &str, out: &mut Vec<String>) {
    for (index, spec) in specs.iter().enumerate() {
        if spec.skip {
            continue;
        }
        let name = child_name(prefix, index);
        out.push(name.clone());
        expected_order(&spec.children, &name, out);
    }
}

fn expected_total(specs: &[UnitSpec]) -> usize {
    specs
        .iter()
        .map(|s| if s.skip { 1 } else { s.passes + s.fails + expected_total(&s.children) })
        .sum()
}

fn expected_failed(specs: &[UnitSpec]) -> usize {
    specs
        .iter()
        .map(|s| if s.skip { 1 } else { s.fails + expected_failed(&s.children) })
        .sum()
}

fn expected_skipped(specs: &[UnitSpec]) -> usize {
    specs
        .iter()
        .map(|s| if s.skip { 1 } else { expected_skipped(&s.children) })
        .sum()
}

// =============================================================================
// Tree Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: units start in depth-first declaration order, skipped subtrees never start
    #[test]
    fn units_start_in_declaration_order(specs in suite_strategy()) {
        let root = Harness::new();
        let probe = Probe::default();
        declare_all(&root, specs.clone(), &probe);

        prop_assert_eq!(root.run(), RunStatus::Completed);

        let mut wanted = Vec::new();
        expected_order(&specs, "", &mut wanted);
        prop_assert_eq!(probe.started.borrow().clone(), wanted);
    }

    /// Property: at most one leaf unit is in control at any time
    #[test]
    fn leaves_never_overlap(specs in suite_strategy()) {
        let root = Harness::new();
        let probe = Probe::default();
        declare_all(&root, specs, &probe);
        root.run();

        prop_assert!(probe.max_active_leaves.get() <= 1);
        prop_assert_eq!(probe.active_leaves.get(), 0);
    }

    /// Property: every outcome of the tree reaches the root exactly once
    #[test]
    fn results_aggregate_to_root(specs in suite_strategy()) {
        let root = Harness::new();
        declare_all(&root, specs.clone(), &Probe::default());
        root.run();

        let results = root.results();
        prop_assert_eq!(results.total(), expected_total(&specs));
        prop_assert_eq!(results.failed(), expected_failed(&specs));
        prop_assert_eq!(results.skipped(), expected_skipped(&specs));
        prop_assert_eq!(results.total(), results.passed() + results.failed());
        prop_assert_eq!(root.test_count(), specs.iter().filter(|s| !s.skip).count());
    }

    /// Property: the same tree produces the same results under auto-end (no unit plans)
    #[test]
    fn auto_end_without_plans_changes_nothing(specs in suite_strategy()) {
        let plain = Harness::new();
        declare_all(&plain, specs.clone(), &Probe::default());
        plain.run();

        let auto = Harness::with_config(HarnessConfig::new().with_auto_end_on_plan(true));
        declare_all(&auto, specs, &Probe::default());
        auto.run();

        prop_assert_eq!(plain.results(), auto.results());
    }
}

// =============================================================================
// Plan Properties
// =============================================================================

proptest! {
    /// Property: `end` flags a plan mismatch exactly when the recorded count differs
    #[test]
    fn plan_mismatch_iff_count_differs(plan in 1..6usize, count in 0..8usize) {
        let unit = Harness::new();
        unit.plan(plan);
        for i in 0..count {
            unit.pass(format!("pass {i}"));
        }
        unit.end();

        let mismatches = unit
            .results()
            .failures()
            .filter(|o| o.label() == "test count != plan")
            .count();
        prop_assert_eq!(mismatches, usize::from(plan != count));
        prop_assert!(unit.is_ended());
    }
}
