//! End-to-end scenario replays over the files in `demos/`.

use std::path::PathBuf;

use clap::Parser;
use nestrun::cli::scenario::{self, Replay};
use nestrun::cli::{Cli, ExitCode, execute};
use nestrun::{HarnessConfig, HarnessError, ReportConfig, ReportFormat, RunStatus, SharedBuffer};

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn replay(name: &str, config: HarnessConfig, format: ReportFormat) -> (Replay, String) {
    let out = SharedBuffer::new();
    let report = ReportConfig::new().with_format(format).with_color(false);
    let replay = scenario::run_file(&demo(name), config, &report, Box::new(out.clone())).unwrap();
    (replay, out.contents())
}

fn run_cli(args: &[&str]) -> Result<ExitCode, nestrun::cli::CliError> {
    let mut argv = vec!["nestrun", "run"];
    argv.extend_from_slice(args);
    execute(Cli::try_parse_from(argv).unwrap())
}

#[test]
fn passing_demo_completes() {
    let (replay, output) = replay("passing.json", HarnessConfig::default(), ReportFormat::Console);
    assert!(replay.passed());
    assert_eq!(replay.status, RunStatus::Completed);
    assert_eq!(replay.results.total(), 4);
    assert!(output.contains("4 passed"));
}

#[test]
fn mixed_demo_reports_every_anomaly() {
    let (replay, output) = replay("mixed.json", HarnessConfig::default(), ReportFormat::Console);
    assert_eq!(replay.status, RunStatus::Completed);
    assert!(!replay.passed());

    let failures: Vec<String> = replay.results.failures().map(|o| o.label().to_string()).collect();
    assert_eq!(failures, ["not yet", "order matters", "end called more than once"]);
    assert_eq!(replay.results.skipped(), 1);
    assert!(output.contains("___________ lists ___________"));
    assert!(output.contains("wanted: Array"));
}

#[test]
fn disk_full_demo_bails_out() {
    let (replay, output) = replay("disk_full.json", HarnessConfig::default(), ReportFormat::Json);
    assert_eq!(replay.status, RunStatus::BailedOut);
    assert_eq!(replay.results.bailout_messages().collect::<Vec<_>>(), ["disk full"]);
    assert!(!output.contains(r#""unit":"read""#));
    assert!(!output.contains(r#""event":"end","unit":"storage""#));
}

#[test]
fn disk_full_demo_without_propagation_stalls() {
    let config = HarnessConfig::new().with_propagate_bailout(false);
    let (replay, _) = replay("disk_full.json", config, ReportFormat::Json);
    assert_eq!(replay.status, RunStatus::Stalled);
    assert_eq!(replay.results.bailouts(), 0);
}

#[test]
fn stalled_demo_is_reported() {
    let (replay, _) = replay("stalled.json", HarnessConfig::default(), ReportFormat::Console);
    assert_eq!(replay.status, RunStatus::Stalled);
}

#[test]
fn missing_file_is_an_io_error() {
    let report = ReportConfig::new();
    let err = scenario::run_file(
        &demo("missing.json"),
        HarnessConfig::default(),
        &report,
        Box::new(SharedBuffer::new()),
    )
    .unwrap_err();
    assert!(matches!(err, HarnessError::Io(_)));
}

// =============================================================================
// CLI exit codes
// =============================================================================

#[test]
fn cli_exit_codes() {
    let passing = demo("passing.json");
    let mixed = demo("mixed.json");
    let stalled = demo("stalled.json");

    assert_eq!(run_cli(&[passing.to_str().unwrap()]).unwrap(), ExitCode::SUCCESS);

    let err = run_cli(&[mixed.to_str().unwrap(), "--no-color"]).unwrap_err();
    assert_eq!(err.exit_code, ExitCode::FAILURE);
    assert!(err.message.is_empty());

    let err = run_cli(&[stalled.to_str().unwrap(), "--format", "json"]).unwrap_err();
    assert_eq!(err.exit_code, ExitCode::FAILURE);
    assert!(err.message.contains("run stalled"));
}

#[test]
fn cli_tick_budget_is_a_diagnostic() {
    let passing = demo("passing.json");
    let err = run_cli(&[passing.to_str().unwrap(), "--max-ticks", "2"]).unwrap_err();
    assert_eq!(err.exit_code, ExitCode::FAILURE);
    assert!(err.message.contains("nestrun::tick_budget"));
}
