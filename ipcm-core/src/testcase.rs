//! Test-suite bookkeeping and the overall simulation report.
//!
//! Each simulated testbench becomes a [`TestCase`]; cases are grouped by
//! the namespace chain of their entity into a tree of [`TestGroup`]s
//! rooted in a [`TestSuite`]. Both suite and cases carry wall-clock
//! timers bracketing their execution.

use std::time::{Duration, Instant};

use colored::Colorize;
use indexmap::IndexMap;

use crate::entity::SimulationResult;
use crate::logging::Logger;

/// Terminal status of one test case.
///
/// This refines [`SimulationResult`] with the pipeline stage at which an
/// aborted run gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationStatus {
    Unknown,
    DryRun,
    SystemError,
    InternalError,
    AnalyzeError,
    ElaborationError,
    SimulationError,
    SimulationFailed,
    SimulationNoAsserts,
    SimulationSuccess,
    SimulationGuiRun,
}

impl SimulationStatus {
    /// Translate a simulator verdict into a case status.
    pub fn from_result(result: SimulationResult) -> Self {
        match result {
            SimulationResult::NotRun => SimulationStatus::Unknown,
            SimulationResult::DryRun => SimulationStatus::DryRun,
            SimulationResult::Error => SimulationStatus::SimulationError,
            SimulationResult::Failed => SimulationStatus::SimulationFailed,
            SimulationResult::NoAsserts => SimulationStatus::SimulationNoAsserts,
            SimulationResult::Passed => SimulationStatus::SimulationSuccess,
            SimulationResult::GuiRun => SimulationStatus::SimulationGuiRun,
        }
    }

    /// Fixed-width report cell text.
    pub fn label(self) -> &'static str {
        match self {
            SimulationStatus::Unknown => "? ? ?",
            SimulationStatus::DryRun => "DRY RUN",
            SimulationStatus::SystemError => "SYS. ERROR",
            SimulationStatus::InternalError => "INT. ERROR",
            SimulationStatus::AnalyzeError => "ANA. ERROR",
            SimulationStatus::ElaborationError => "ELAB. ERROR",
            SimulationStatus::SimulationError => "SIM. ERROR",
            SimulationStatus::SimulationFailed => "FAILED",
            SimulationStatus::SimulationNoAsserts => "NO ASSERTS",
            SimulationStatus::SimulationSuccess => "PASSED",
            SimulationStatus::SimulationGuiRun => "GUI RUN",
        }
    }

    fn colorize(self, cell: &str) -> String {
        match self {
            SimulationStatus::SimulationSuccess => cell.green().to_string(),
            SimulationStatus::SimulationFailed => cell.red().to_string(),
            SimulationStatus::SimulationNoAsserts
            | SimulationStatus::DryRun
            | SimulationStatus::SimulationGuiRun => cell.yellow().to_string(),
            SimulationStatus::Unknown => cell.to_string(),
            _ => cell.red().bold().to_string(),
        }
    }

    /// Does the status denote an aborted or errored run?
    pub fn is_error(self) -> bool {
        matches!(
            self,
            SimulationStatus::Unknown
                | SimulationStatus::SystemError
                | SimulationStatus::InternalError
                | SimulationStatus::AnalyzeError
                | SimulationStatus::ElaborationError
                | SimulationStatus::SimulationError
        )
    }
}

/// One simulated testbench with its status and runtime.
#[derive(Debug)]
pub struct TestCase {
    name: String,
    group_path: Vec<String>,
    status: SimulationStatus,
    started_at: Option<Instant>,
    elapsed: Option<Duration>,
}

impl TestCase {
    /// `group_path` is the library/namespace chain above the entity,
    /// `name` the entity's own name.
    pub fn new(group_path: Vec<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group_path,
            status: SimulationStatus::Unknown,
            started_at: None,
            elapsed: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn set_status(&mut self, status: SimulationStatus) {
        self.status = status;
    }

    /// Update the status from a simulator verdict.
    pub fn update_result(&mut self, result: SimulationResult) {
        self.status = SimulationStatus::from_result(result);
    }

    pub fn start_timer(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub fn stop_timer(&mut self) {
        if let Some(started) = self.started_at {
            self.elapsed = Some(started.elapsed());
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }
}

/// Aggregated case counts over a group subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub passed: usize,
    pub no_asserts: usize,
    pub dry_runs: usize,
    pub gui_runs: usize,
    pub failed: usize,
    pub errors: usize,
}

impl Counts {
    fn add_case(&mut self, status: SimulationStatus) {
        self.total += 1;
        match status {
            SimulationStatus::SimulationSuccess => self.passed += 1,
            SimulationStatus::SimulationNoAsserts => self.no_asserts += 1,
            SimulationStatus::DryRun => self.dry_runs += 1,
            SimulationStatus::SimulationGuiRun => self.gui_runs += 1,
            SimulationStatus::SimulationFailed => self.failed += 1,
            _ => self.errors += 1,
        }
    }

    fn merge(&mut self, other: Counts) {
        self.total += other.total;
        self.passed += other.passed;
        self.no_asserts += other.no_asserts;
        self.dry_runs += other.dry_runs;
        self.gui_runs += other.gui_runs;
        self.failed += other.failed;
        self.errors += other.errors;
    }
}

/// A node in the report tree, keyed by namespace name.
#[derive(Debug, Default)]
pub struct TestGroup {
    groups: IndexMap<String, TestGroup>,
    cases: IndexMap<String, TestCase>,
}

impl TestGroup {
    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for group in self.groups.values() {
            counts.merge(group.counts());
        }
        for case in self.cases.values() {
            counts.add_case(case.status());
        }
        counts
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a TestCase>) {
        for group in self.groups.values() {
            group.collect(out);
        }
        out.extend(self.cases.values());
    }

    fn render(&self, logger: &Logger, indent: usize) {
        for (name, group) in &self.groups {
            logger.quiet(format!("{}{name}", "  ".repeat(indent)), 0);
            group.render(logger, indent + 1);
        }
        for case in self.cases.values() {
            let name = format!("{}{}", "  ".repeat(indent), case.name());
            let time = case
                .elapsed()
                .map(format_duration)
                .unwrap_or_else(|| "--:--".to_string());
            let status = case.status();
            let cell = status.colorize(&format!("{:^12}", status.label()));
            logger.quiet(format!("{name:<24} | {time:>8} | {cell}"), 0);
        }
    }
}

/// The whole batch: a group tree plus an overall wall-clock timer.
#[derive(Debug)]
pub struct TestSuite {
    root: TestGroup,
    started_at: Instant,
    elapsed: Option<Duration>,
}

impl Default for TestSuite {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSuite {
    pub fn new() -> Self {
        Self {
            root: TestGroup::default(),
            started_at: Instant::now(),
            elapsed: None,
        }
    }

    pub fn start_timer(&mut self) {
        self.started_at = Instant::now();
        self.elapsed = None;
    }

    pub fn stop_timer(&mut self) {
        self.elapsed = Some(self.started_at.elapsed());
    }

    /// File a finished case under its namespace chain, creating groups on
    /// the way.
    pub fn add_test_case(&mut self, case: TestCase) {
        let mut group = &mut self.root;
        for part in &case.group_path {
            group = group.groups.entry(part.clone()).or_default();
        }
        group.cases.insert(case.name.clone(), case);
    }

    pub fn counts(&self) -> Counts {
        self.root.counts()
    }

    /// Every case in the tree, groups first, insertion order preserved.
    pub fn all_cases(&self) -> Vec<&TestCase> {
        let mut cases = Vec::new();
        self.root.collect(&mut cases);
        cases
    }

    /// All cases ended in a non-failing state.
    pub fn is_all_passed(&self) -> bool {
        let c = self.counts();
        c.total == c.passed + c.no_asserts + c.dry_runs + c.gui_runs
    }

    /// Print the overall report table through the logger at Quiet level,
    /// so it survives `--quiet` runs.
    pub fn render(&self, logger: &Logger) {
        let double = "=".repeat(80);
        let single = "-".repeat(80);
        logger.quiet(double.clone(), 0);
        logger.quiet(format!("{:^80}", "OVERALL SIMULATION REPORT"), 0);
        logger.quiet(double.clone(), 0);
        logger.quiet(
            format!("{:<24} | {:>8} | {:^12}", "Name", "Duration", "Status"),
            0,
        );
        logger.quiet(single.clone(), 0);
        self.root.render(logger, 0);
        logger.quiet(single, 0);
        let c = self.counts();
        let time = self
            .elapsed
            .map(format_duration)
            .unwrap_or_else(|| "--:--".to_string());
        logger.quiet(
            format!(
                "Time: {time}  Count: {}  Passed: {}  No Asserts: {}  Failed: {}  Errors: {}",
                c.total, c.passed, c.no_asserts, c.failed, c.errors
            ),
            0,
        );
        logger.quiet(double, 0);
        if !self.is_all_passed() {
            logger.warning("Some test cases did not pass.", 0);
        }
    }
}

/// `m:ss` rendering for report cells.
fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}
