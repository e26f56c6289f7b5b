//! CLI module for nestrun
//!
//! ## Commands
//!
//! - `run <scenario>` - Replay a JSON scenario through the orchestrator and report the outcome
//!
//! ## Modules
//!
//! - `scenario` - Scenario model and replay
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod scenario;

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use crate::config::{HarnessConfig, ReportConfig, ReportFormat};
use crate::error::HarnessError;
use crate::harness::RunStatus;
use crate::version::NESTRUN_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        // miette renders the diagnostic code and help alongside the message
        Self::failure(format!("{:?}", miette::Report::new(err)))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// A recursive, sequential test orchestrator
#[derive(Parser, Debug)]
#[command(name = "nestrun")]
#[command(version = NESTRUN_VERSION)]
#[command(about = "A recursive, sequential test orchestrator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a JSON scenario and report its outcomes
    Run {
        /// Scenario file
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,
        /// Report format
        #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
        format: ReportFormat,
        /// Verbose output (one line per unit and outcome)
        #[arg(short, long)]
        verbose: bool,
        /// Disable ANSI colors
        #[arg(long)]
        no_color: bool,
        /// Give up after this many scheduler ticks
        #[arg(long, value_name = "N")]
        max_ticks: Option<usize>,
        /// Keep bailouts local to the unit that signaled them
        #[arg(long)]
        no_propagate_bailout: bool,
        /// Complete units as soon as they reach their plan
        #[arg(long)]
        auto_end: bool,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Run {
            scenario,
            format,
            verbose,
            no_color,
            max_ticks,
            no_propagate_bailout,
            auto_end,
        } => {
            let mut config = HarnessConfig::new()
                .with_propagate_bailout(!no_propagate_bailout)
                .with_auto_end_on_plan(auto_end);
            if let Some(max_ticks) = max_ticks {
                config = config.with_max_ticks(max_ticks);
            }
            let report = ReportConfig::new()
                .with_format(format)
                .with_verbose(verbose)
                .with_color(!no_color);
            execute_run(scenario, config, report)
        }
    }
}

/// Handle the `run` subcommand.
fn execute_run(path: PathBuf, config: HarnessConfig, report: ReportConfig) -> CliResult<ExitCode> {
    let replay = scenario::run_file(&path, config, &report, Box::new(io::stdout()))?;

    match replay.status {
        RunStatus::Completed if replay.results.is_ok() => Ok(ExitCode::SUCCESS),
        // failures were already reported
        RunStatus::Completed | RunStatus::BailedOut => Err(CliError::new("", ExitCode::FAILURE)),
        RunStatus::Stalled | RunStatus::Pending => Err(CliError::failure(format!(
            "{}: run stalled before completing; a unit never called `end`",
            path.display()
        ))),
    }
}
