//! Orchestrator configuration
//!
//! One [`HarnessConfig`] is shared by every node of a tree: children inherit the configuration of the node
//! they are declared on.

/// Behaviour switches for a harness tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// When a running child bails out, the parent observes the signal and bails itself out too.
    pub propagate_bailout: bool,
    /// Complete a node as soon as its recorded total reaches its plan.
    pub auto_end_on_plan: bool,
    /// Upper bound on scheduler ticks for a single `run`. `None` means unbounded.
    pub max_ticks: Option<usize>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            propagate_bailout: true,
            auto_end_on_plan: false,
            max_ticks: None,
        }
    }
}

impl HarnessConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_propagate_bailout(mut self, propagate: bool) -> Self {
        self.propagate_bailout = propagate;
        self
    }

    pub fn with_auto_end_on_plan(mut self, auto_end: bool) -> Self {
        self.auto_end_on_plan = auto_end;
        self
    }

    /// Bound the number of scheduler ticks a run may take
    pub fn with_max_ticks(mut self, max_ticks: usize) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    /// Human readable, pytest-style
    #[default]
    Console,
    /// One JSON object per lifecycle event
    Json,
}

/// Reporting configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub format: ReportFormat,
    /// One line per unit and outcome instead of progress dots
    pub verbose: bool,
    /// ANSI colors in console output
    pub color: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Console,
            verbose: false,
            color: true,
        }
    }
}

impl ReportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}
