//! Batch simulation over resolved entity names.
//!
//! The [`Simulator`] expands FQNs to testbenches, drives a [`ToolFlow`]
//! through the prepare/analyze/elaborate/simulate pipeline for each one,
//! and aggregates the verdicts into a [`TestSuite`]. Skippable tool
//! failures are recorded against their test case while the batch carries
//! on; everything else aborts it.

use std::error::Error as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::entity::{EntityGraph, NodeId, SimulationResult, TestbenchKinds};
use crate::error::SimulatorError;
use crate::filter::{
    GhdlAnalyzeFilter, GhdlRunFilter, OutputClassifier, ReportProtocol, ReportScanner, VcomFilter,
    VsimFilter,
};
use crate::fqn::Fqn;
use crate::logging::Logger;
use crate::process::{render_command, Runner};
use crate::project::{read_files_file, ProjectFileWriter, SourceFile};
use crate::testcase::{SimulationStatus, TestCase, TestSuite};

// ----------------------------------------------------------------------
// Pipeline step selection
// ----------------------------------------------------------------------

/// Individual pipeline steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationStep {
    CleanUpBefore,
    Prepare,
    Analyze,
    Elaborate,
    Simulate,
    ShowWaveform,
    ShowReport,
    CleanUpAfter,
    /// Shorthand: clean, prepare and recompile everything.
    Recompile,
    /// Shorthand: rerun the simulation stage.
    Resimulate,
}

impl SimulationStep {
    fn bit(self) -> u16 {
        match self {
            SimulationStep::CleanUpBefore => 1 << 0,
            SimulationStep::Prepare => 1 << 1,
            SimulationStep::Analyze => 1 << 2,
            SimulationStep::Elaborate => 1 << 3,
            SimulationStep::Simulate => 1 << 4,
            SimulationStep::ShowWaveform => 1 << 5,
            SimulationStep::ShowReport => 1 << 6,
            SimulationStep::CleanUpAfter => 1 << 7,
            SimulationStep::Recompile => 1 << 8,
            SimulationStep::Resimulate => 1 << 9,
        }
    }
}

/// A set of [`SimulationStep`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationSteps(u16);

impl SimulationSteps {
    pub const EMPTY: SimulationSteps = SimulationSteps(0);

    pub fn single(step: SimulationStep) -> Self {
        Self(step.bit())
    }

    /// The full batch pipeline including the final report.
    pub fn batch() -> Self {
        Self::EMPTY
            .with(SimulationStep::Prepare)
            .with(SimulationStep::Analyze)
            .with(SimulationStep::Elaborate)
            .with(SimulationStep::Simulate)
            .with(SimulationStep::ShowReport)
    }

    /// Batch pipeline plus waveform capture for a GUI session.
    pub fn gui() -> Self {
        Self::batch().with(SimulationStep::ShowWaveform)
    }

    pub fn with(self, step: SimulationStep) -> Self {
        Self(self.0 | step.bit())
    }

    pub fn without(self, step: SimulationStep) -> Self {
        Self(self.0 & !step.bit())
    }

    pub fn contains(self, step: SimulationStep) -> bool {
        self.0 & step.bit() != 0
    }

    /// Expand the `Recompile` / `Resimulate` shorthands into their
    /// constituent steps.
    pub fn normalize(self) -> Self {
        let mut steps = self;
        if self.contains(SimulationStep::Recompile) {
            steps = steps
                .with(SimulationStep::CleanUpBefore)
                .with(SimulationStep::Prepare)
                .with(SimulationStep::Analyze)
                .with(SimulationStep::Elaborate);
        }
        if self.contains(SimulationStep::Resimulate) {
            steps = steps.with(SimulationStep::Simulate);
        }
        steps
    }
}

// ----------------------------------------------------------------------
// Tool flows
// ----------------------------------------------------------------------

/// Shared state handed to a flow for each pipeline stage.
pub struct FlowContext<'a> {
    pub runner: Runner,
    pub logger: &'a Logger,
    pub binary_dir: &'a Path,
    pub working_dir: &'a Path,
    /// VHDL library the testbench toplevel is compiled into.
    pub testbench_library: &'a str,
    /// Indentation level for tool output.
    pub indent: usize,
}

impl FlowContext<'_> {
    fn log_command(&self, program: &Path, args: &[String]) {
        let text = render_command(program, args);
        if self.runner.is_dry_run() {
            self.logger.dry_run(text, self.indent);
        } else {
            self.logger.debug(text, self.indent);
        }
    }
}

/// One EDA tool's rendition of the simulation pipeline.
pub trait ToolFlow {
    fn tool_name(&self) -> &'static str;

    /// Remove stale compilation products from the working directory.
    fn cleanup(&self, ctx: &FlowContext<'_>) -> Result<(), SimulatorError> {
        let _ = ctx;
        Ok(())
    }

    fn analyze(&self, ctx: &FlowContext<'_>, files: &[SourceFile]) -> Result<(), SimulatorError>;

    fn elaborate(&self, ctx: &FlowContext<'_>, top: &str) -> Result<(), SimulatorError>;

    fn simulate(
        &self,
        ctx: &FlowContext<'_>,
        top: &str,
        gui: bool,
    ) -> Result<SimulationResult, SimulatorError>;
}

/// Run one tool invocation, classifying every output line.
///
/// Returns the process' success flag; classifier-raised fatal errors win
/// over the exit status.
fn run_filtered(
    ctx: &FlowContext<'_>,
    tool: &str,
    program: &Path,
    args: &[String],
    filter: &mut dyn OutputClassifier,
) -> Result<bool, SimulatorError> {
    ctx.log_command(program, args);
    let mut process = ctx.runner.start(tool, program, args, ctx.working_dir)?;
    let mut fatal = None;
    for line in process.lines() {
        let line = line?;
        match filter.classify(&line) {
            Ok(Some(mut entry)) => {
                entry.indent_by(ctx.indent);
                ctx.logger.write(&entry);
            }
            Ok(None) => {}
            Err(err) => {
                fatal = Some(err);
                break;
            }
        }
    }
    let success = process.wait()?;
    match fatal {
        Some(err) => Err(err),
        None => Ok(success),
    }
}

/// The GHDL flow: `ghdl -a`, `ghdl -e`, `ghdl -r`.
#[derive(Debug, Default)]
pub struct GhdlFlow;

impl GhdlFlow {
    fn program(&self, ctx: &FlowContext<'_>) -> PathBuf {
        ctx.binary_dir.join("ghdl")
    }
}

impl ToolFlow for GhdlFlow {
    fn tool_name(&self) -> &'static str {
        "ghdl"
    }

    /// GHDL keeps its library indexes in `*.cf` files next to the
    /// compilation products; removing them forces a full recompile.
    fn cleanup(&self, ctx: &FlowContext<'_>) -> Result<(), SimulatorError> {
        if ctx.runner.is_dry_run() {
            ctx.logger.dry_run("would remove *.cf library files", ctx.indent);
            return Ok(());
        }
        let dir = ctx.working_dir;
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(ref err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(SimulatorError::WorkingDirectory(dir.to_path_buf(), err)),
        };
        for entry in entries {
            let entry = entry
                .map_err(|err| SimulatorError::WorkingDirectory(dir.to_path_buf(), err))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "cf") {
                fs::remove_file(&path)
                    .map_err(|err| SimulatorError::WorkingDirectory(dir.to_path_buf(), err))?;
            }
        }
        Ok(())
    }

    fn analyze(&self, ctx: &FlowContext<'_>, files: &[SourceFile]) -> Result<(), SimulatorError> {
        let program = self.program(ctx);
        for file in files {
            let args = vec![
                "-a".to_string(),
                "--std=08".to_string(),
                format!("--work={}", file.library),
                file.path.display().to_string(),
            ];
            let mut filter = GhdlAnalyzeFilter;
            if !run_filtered(ctx, "ghdl", &program, &args, &mut filter)? {
                return Err(SimulatorError::CompilationError {
                    tool: "ghdl".to_string(),
                    message: format!("analysis of '{}' failed", file.path.display()),
                });
            }
        }
        Ok(())
    }

    fn elaborate(&self, ctx: &FlowContext<'_>, top: &str) -> Result<(), SimulatorError> {
        let program = self.program(ctx);
        let args = vec![
            "-e".to_string(),
            "--std=08".to_string(),
            format!("--work={}", ctx.testbench_library),
            top.to_string(),
        ];
        let mut filter = GhdlAnalyzeFilter;
        if !run_filtered(ctx, "ghdl", &program, &args, &mut filter)? {
            return Err(SimulatorError::CompilationError {
                tool: "ghdl".to_string(),
                message: format!("elaboration of '{top}' failed"),
            });
        }
        Ok(())
    }

    fn simulate(
        &self,
        ctx: &FlowContext<'_>,
        top: &str,
        gui: bool,
    ) -> Result<SimulationResult, SimulatorError> {
        let program = self.program(ctx);
        let mut args = vec![
            "-r".to_string(),
            "--std=08".to_string(),
            format!("--work={}", ctx.testbench_library),
            top.to_string(),
        ];
        if gui {
            args.push(format!("--wave={top}.ghw"));
        }
        ctx.log_command(&program, &args);
        let mut process = ctx.runner.start("ghdl", &program, &args, ctx.working_dir)?;
        if process.is_dry_run() {
            return Ok(SimulationResult::DryRun);
        }
        let mut filter = GhdlRunFilter::default();
        let mut scanner = ReportScanner::new(ReportProtocol::default());
        for line in process.lines() {
            let line = line?;
            if let Some(entry) = filter.classify(&line)? {
                let mut entry = scanner.feed(entry);
                entry.indent_by(ctx.indent);
                ctx.logger.write(&entry);
            }
        }
        process.wait()?;
        if gui {
            return Ok(SimulationResult::GuiRun);
        }
        scanner.finish()
    }
}

/// The QuestaSim / ModelSim flow: `vlib`, `vcom`, batch `vsim`.
#[derive(Debug, Default)]
pub struct QuestaFlow;

impl ToolFlow for QuestaFlow {
    fn tool_name(&self) -> &'static str {
        "vsim"
    }

    fn analyze(&self, ctx: &FlowContext<'_>, files: &[SourceFile]) -> Result<(), SimulatorError> {
        // one vlib call per distinct target library
        let mut seen: Vec<&str> = Vec::new();
        for file in files {
            if !seen.contains(&file.library.as_str()) {
                seen.push(&file.library);
                let args = vec![file.library.clone()];
                let mut filter = VcomFilter;
                run_filtered(ctx, "vlib", &ctx.binary_dir.join("vlib"), &args, &mut filter)?;
            }
        }
        let program = ctx.binary_dir.join("vcom");
        for file in files {
            let args = vec![
                "-2008".to_string(),
                "-work".to_string(),
                file.library.clone(),
                file.path.display().to_string(),
            ];
            let mut filter = VcomFilter;
            if !run_filtered(ctx, "vcom", &program, &args, &mut filter)? {
                return Err(SimulatorError::CompilationError {
                    tool: "vcom".to_string(),
                    message: format!("compilation of '{}' failed", file.path.display()),
                });
            }
        }
        Ok(())
    }

    /// vsim elaborates on load; nothing to do here.
    fn elaborate(&self, _ctx: &FlowContext<'_>, _top: &str) -> Result<(), SimulatorError> {
        Ok(())
    }

    fn simulate(
        &self,
        ctx: &FlowContext<'_>,
        top: &str,
        gui: bool,
    ) -> Result<SimulationResult, SimulatorError> {
        let program = ctx.binary_dir.join("vsim");
        let mut args = Vec::new();
        if !gui {
            args.push("-c".to_string());
        }
        args.push("-do".to_string());
        args.push("run -all; quit -f".to_string());
        args.push(format!("{}.{top}", ctx.testbench_library));
        ctx.log_command(&program, &args);
        let mut process = ctx.runner.start("vsim", &program, &args, ctx.working_dir)?;
        if process.is_dry_run() {
            return Ok(SimulationResult::DryRun);
        }
        let mut filter = VsimFilter::default();
        let mut scanner = ReportScanner::new(ReportProtocol::default());
        for line in process.lines() {
            let line = line?;
            if let Some(entry) = filter.classify(&line)? {
                let mut entry = scanner.feed(entry);
                entry.indent_by(ctx.indent);
                ctx.logger.write(&entry);
            }
        }
        process.wait()?;
        if gui {
            return Ok(SimulationResult::GuiRun);
        }
        scanner.finish()
    }
}

/// Supported simulation toolchains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toolchain {
    Ghdl,
    Questa,
}

impl Toolchain {
    /// Configuration section carrying the installation paths.
    pub fn section(self) -> &'static str {
        match self {
            Toolchain::Ghdl => "INSTALL.GHDL",
            Toolchain::Questa => "INSTALL.QuestaSim",
        }
    }

    pub fn flow(self) -> Box<dyn ToolFlow> {
        match self {
            Toolchain::Ghdl => Box::new(GhdlFlow),
            Toolchain::Questa => Box::new(QuestaFlow),
        }
    }
}

// ----------------------------------------------------------------------
// Batch orchestration
// ----------------------------------------------------------------------

/// Drives testbench simulations and collects their results.
pub struct Simulator<'a> {
    config: &'a Config,
    graph: &'a EntityGraph,
    logger: &'a Logger,
    runner: Runner,
    flow: Box<dyn ToolFlow>,
    binary_dir: PathBuf,
    working_dir: PathBuf,
    testbench_library: String,
    suite: TestSuite,
}

impl<'a> Simulator<'a> {
    /// Build a simulator for `toolchain`, reading its installation paths
    /// from the configuration.
    pub fn new(
        config: &'a Config,
        graph: &'a EntityGraph,
        logger: &'a Logger,
        runner: Runner,
        toolchain: Toolchain,
    ) -> Result<Self, SimulatorError> {
        let section = toolchain.section();
        let binary_dir = PathBuf::from(config.get(section, "BinaryDirectory")?);
        let working_dir = if config.has_option(section, "TemporaryDirectory") {
            PathBuf::from(config.get(section, "TemporaryDirectory")?)
        } else {
            PathBuf::from("temp").join(toolchain.flow().tool_name())
        };
        Ok(Self::with_flow(
            config,
            graph,
            logger,
            runner,
            toolchain.flow(),
            binary_dir,
            working_dir,
        ))
    }

    /// Build a simulator around an explicit flow and directories.
    pub fn with_flow(
        config: &'a Config,
        graph: &'a EntityGraph,
        logger: &'a Logger,
        runner: Runner,
        flow: Box<dyn ToolFlow>,
        binary_dir: PathBuf,
        working_dir: PathBuf,
    ) -> Self {
        let testbench_library = if config.has_option("CONFIG.Simulation", "TestbenchLibrary") {
            config
                .get("CONFIG.Simulation", "TestbenchLibrary")
                .unwrap_or_else(|_| "test".to_string())
        } else {
            "test".to_string()
        };
        Self {
            config,
            graph,
            logger,
            runner,
            flow,
            binary_dir,
            working_dir,
            testbench_library,
            suite: TestSuite::new(),
        }
    }

    pub fn suite(&self) -> &TestSuite {
        &self.suite
    }

    /// Simulate every testbench selected by `fqns`.
    ///
    /// Returns whether all cases ended benignly. Skippable per-entity
    /// failures are recorded and the batch continues; a non-skippable
    /// error aborts it. An interrupt stops the batch early but still
    /// finalizes timers and renders the partial report.
    pub fn run_all(
        &mut self,
        fqns: &[Fqn],
        kinds: TestbenchKinds,
        steps: SimulationSteps,
    ) -> Result<bool, SimulatorError> {
        let steps = steps.normalize();
        self.suite.start_timer();
        let mut interrupted = false;
        'batch: for fqn in fqns {
            let testbenches = fqn.testbenches(self.graph, kinds);
            if testbenches.is_empty() {
                self.logger
                    .warning(format!("no testbenches for '{}'", fqn.display(self.graph)), 0);
                continue;
            }
            for testbench in testbenches {
                match self.run_testbench(testbench, steps) {
                    Ok(()) => {}
                    Err(err) if err.is_interrupted() => {
                        self.logger.warning("batch interrupted, aborting", 0);
                        interrupted = true;
                        break 'batch;
                    }
                    Err(err) => {
                        self.suite.stop_timer();
                        return Err(err);
                    }
                }
            }
        }
        self.suite.stop_timer();
        if steps.contains(SimulationStep::ShowReport) || interrupted {
            self.suite.render(self.logger);
        }
        Ok(self.suite.is_all_passed())
    }

    /// Run one testbench and file its test case.
    ///
    /// `Err` is only returned for non-skippable failures; the case is
    /// still recorded first so a partial report stays truthful.
    fn run_testbench(
        &mut self,
        testbench: NodeId,
        steps: SimulationSteps,
    ) -> Result<(), SimulatorError> {
        let entity = self
            .graph
            .node(testbench)
            .parent()
            .ok_or(crate::error::ConfigError::HierarchyError)
            .map_err(SimulatorError::from)?;
        let chain = self.graph.path(entity).map_err(SimulatorError::from)?;
        let group_path: Vec<String> = chain[..chain.len() - 1]
            .iter()
            .map(|id| self.graph.node(*id).name().to_string())
            .collect();
        let mut case = TestCase::new(group_path, self.graph.node(entity).name());

        self.logger.quiet(
            format!("Simulating '{}'...", self.graph.display_name(testbench)),
            0,
        );
        case.start_timer();
        let outcome = self.run_pipeline(testbench, steps);
        case.stop_timer();

        match outcome {
            Ok(result) => {
                self.graph.set_testbench_result(testbench, result);
                case.update_result(result);
                self.suite.add_test_case(case);
                Ok(())
            }
            Err((status, err)) if err.is_skippable() => {
                case.set_status(status);
                self.suite.add_test_case(case);
                self.log_error_chain(&err);
                self.logger.quiet("  [SKIPPED DUE TO ERRORS]", 1);
                Ok(())
            }
            Err((status, err)) => {
                case.set_status(status);
                self.suite.add_test_case(case);
                self.log_error_chain(&err);
                Err(err)
            }
        }
    }

    /// The staged pipeline for one testbench. Failures carry the status
    /// of the stage they occurred in.
    fn run_pipeline(
        &self,
        testbench: NodeId,
        steps: SimulationSteps,
    ) -> Result<SimulationResult, (SimulationStatus, SimulatorError)> {
        let ctx = FlowContext {
            runner: self.runner,
            logger: self.logger,
            binary_dir: &self.binary_dir,
            working_dir: &self.working_dir,
            testbench_library: &self.testbench_library,
            indent: 2,
        };

        let details = self
            .graph
            .testbench_details(self.config, testbench)
            .map_err(|err| (SimulationStatus::InternalError, SimulatorError::from(err)))?;

        if steps.contains(SimulationStep::CleanUpBefore) {
            self.flow
                .cleanup(&ctx)
                .map_err(|err| (SimulationStatus::SystemError, err))?;
        }

        if steps.contains(SimulationStep::Prepare) && !self.runner.is_dry_run() {
            fs::create_dir_all(&self.working_dir).map_err(|err| {
                (
                    SimulationStatus::SystemError,
                    SimulatorError::WorkingDirectory(self.working_dir.clone(), err),
                )
            })?;
        }

        let files = read_files_file(&details.files_file, &self.testbench_library)
            .map_err(|err| (SimulationStatus::AnalyzeError, err))?;

        if steps.contains(SimulationStep::Prepare) && !self.runner.is_dry_run() {
            let prj = self
                .working_dir
                .join(format!("{}.prj", details.module_name));
            ProjectFileWriter::new(prj)
                .write(&files)
                .map_err(|err| (SimulationStatus::SystemError, err))?;
        }

        if steps.contains(SimulationStep::Analyze) {
            self.flow
                .analyze(&ctx, &files)
                .map_err(|err| (SimulationStatus::AnalyzeError, err))?;
        }

        if steps.contains(SimulationStep::Elaborate) {
            self.flow
                .elaborate(&ctx, &details.module_name)
                .map_err(|err| (SimulationStatus::ElaborationError, err))?;
        }

        let gui = steps.contains(SimulationStep::ShowWaveform);
        let mut result = SimulationResult::NotRun;
        if steps.contains(SimulationStep::Simulate) || gui {
            result = self
                .flow
                .simulate(&ctx, &details.module_name, gui)
                .map_err(|err| (SimulationStatus::SimulationError, err))?;
        }

        if steps.contains(SimulationStep::CleanUpAfter) {
            self.flow
                .cleanup(&ctx)
                .map_err(|err| (SimulationStatus::SystemError, err))?;
        }

        Ok(result)
    }

    /// Log an error and up to two of its causes.
    fn log_error_chain(&self, err: &SimulatorError) {
        self.logger.error(err.to_string(), 1);
        let mut cause = err.source();
        let mut depth = 0;
        while let Some(inner) = cause {
            if depth == 2 {
                break;
            }
            self.logger.error(format!("  caused by: {inner}"), 1);
            cause = inner.source();
            depth += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Visibility;
    use crate::fqn::EntityKind;
    use crate::logging::Severity;
    use crate::testcase::SimulationStatus;

    fn batch_fixture(files_dir: &Path) -> (Config, EntityGraph) {
        let prng_files = files_dir.join("prng.files");
        fs::write(&prng_files, "# no sources needed\n").unwrap();
        let acc_files = files_dir.join("acc.files");
        fs::write(&acc_files, "# no sources needed\n").unwrap();
        let ini = format!(
            "[PoC]\n\
             Visibility = Public\n\
             arith = Namespace\n\
             \n\
             [PoC.arith]\n\
             Visibility = Public\n\
             prng = Entity\n\
             counter = Entity\n\
             acc = Entity\n\
             \n\
             [IP.arith.prng]\n\
             Visibility = Public\n\
             prng_tb = VHDLTestbench\n\
             \n\
             [TB.arith.prng.prng_tb]\n\
             Visibility = Public\n\
             TestbenchModule = arith_prng_tb\n\
             FilesFile = {}\n\
             \n\
             [IP.arith.counter]\n\
             Visibility = Public\n\
             counter_tb = VHDLTestbench\n\
             \n\
             [TB.arith.counter.counter_tb]\n\
             Visibility = Public\n\
             TestbenchModule = arith_counter_tb\n\
             FilesFile = {}\n\
             \n\
             [IP.arith.acc]\n\
             Visibility = Public\n\
             acc_tb = VHDLTestbench\n\
             \n\
             [TB.arith.acc.acc_tb]\n\
             Visibility = Public\n\
             TestbenchModule = arith_acc_tb\n\
             FilesFile = {}\n",
            prng_files.display(),
            files_dir.join("missing.files").display(),
            acc_files.display(),
        );
        let mut config = Config::new();
        config.load_str(&ini).unwrap();
        let logger = Logger::plain(Severity::Fatal);
        let graph = EntityGraph::new(&config, &logger, "PoC", Visibility::Public).unwrap();
        (config, graph)
    }

    fn simulator<'a>(
        config: &'a Config,
        graph: &'a EntityGraph,
        logger: &'a Logger,
        runner: Runner,
        flow: Box<dyn ToolFlow>,
        working_dir: PathBuf,
    ) -> Simulator<'a> {
        Simulator::with_flow(
            config,
            graph,
            logger,
            runner,
            flow,
            PathBuf::from("/opt/tools/bin"),
            working_dir,
        )
    }

    /// A flow that fails at one configurable stage.
    struct StubFlow {
        fail_stage: Option<&'static str>,
        verdict: SimulationResult,
    }

    impl StubFlow {
        fn passing() -> Self {
            Self {
                fail_stage: None,
                verdict: SimulationResult::Passed,
            }
        }

        fn failing_at(stage: &'static str) -> Self {
            Self {
                fail_stage: Some(stage),
                verdict: SimulationResult::Passed,
            }
        }

        fn interrupting() -> Self {
            Self {
                fail_stage: Some("interrupt"),
                verdict: SimulationResult::Passed,
            }
        }

        fn fail(&self, stage: &str) -> Result<(), SimulatorError> {
            if self.fail_stage == Some(stage) {
                Err(SimulatorError::CompilationError {
                    tool: "stub".to_string(),
                    message: format!("{stage} failed"),
                })
            } else {
                Ok(())
            }
        }
    }

    impl ToolFlow for StubFlow {
        fn tool_name(&self) -> &'static str {
            "stub"
        }

        fn analyze(
            &self,
            _ctx: &FlowContext<'_>,
            _files: &[SourceFile],
        ) -> Result<(), SimulatorError> {
            self.fail("analyze")
        }

        fn elaborate(&self, _ctx: &FlowContext<'_>, _top: &str) -> Result<(), SimulatorError> {
            self.fail("elaborate")
        }

        fn simulate(
            &self,
            _ctx: &FlowContext<'_>,
            _top: &str,
            gui: bool,
        ) -> Result<SimulationResult, SimulatorError> {
            if self.fail_stage == Some("interrupt") {
                return Err(SimulatorError::OutputRead {
                    tool: "stub".to_string(),
                    source: io::Error::from(io::ErrorKind::Interrupted),
                });
            }
            self.fail("simulate")?;
            Ok(if gui {
                SimulationResult::GuiRun
            } else {
                self.verdict
            })
        }
    }

    #[test]
    fn dry_run_batch_skips_broken_entities_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let (config, graph) = batch_fixture(dir.path());
        let logger = Logger::plain(Severity::Fatal);
        let mut sim = simulator(
            &config,
            &graph,
            &logger,
            Runner::new(true),
            Box::new(GhdlFlow),
            dir.path().join("temp"),
        );

        let fqn = Fqn::resolve(&graph, "PoC.arith.*", None, EntityKind::Testbench).unwrap();
        let all_passed = sim
            .run_all(&[fqn], TestbenchKinds::ALL, SimulationSteps::batch())
            .unwrap();

        // prng and acc dry-run; counter's missing file list is skipped
        // without taking its neighbors down
        assert!(!all_passed);
        let counts = sim.suite().counts();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.dry_runs, 2);
        assert_eq!(counts.errors, 1);
        let statuses: Vec<SimulationStatus> =
            sim.suite().all_cases().iter().map(|c| c.status()).collect();
        assert_eq!(
            statuses,
            vec![
                SimulationStatus::DryRun,
                SimulationStatus::AnalyzeError,
                SimulationStatus::DryRun,
            ]
        );
    }

    #[test]
    fn passing_run_updates_graph_and_suite() {
        let dir = tempfile::tempdir().unwrap();
        let (config, graph) = batch_fixture(dir.path());
        let logger = Logger::plain(Severity::Fatal);
        let mut sim = simulator(
            &config,
            &graph,
            &logger,
            Runner::new(false),
            Box::new(StubFlow::passing()),
            dir.path().join("temp"),
        );

        let fqn = Fqn::resolve(&graph, "PoC.arith.prng", None, EntityKind::Testbench).unwrap();
        let all_passed = sim
            .run_all(&[fqn.clone()], TestbenchKinds::ALL, SimulationSteps::batch())
            .unwrap();

        assert!(all_passed);
        assert_eq!(sim.suite().counts().passed, 1);
        let tb = fqn.testbenches(&graph, TestbenchKinds::ALL)[0];
        assert_eq!(graph.testbench_result(tb), SimulationResult::Passed);
    }

    #[test]
    fn stage_failures_map_to_stage_statuses() {
        for (stage, expected) in [
            ("analyze", SimulationStatus::AnalyzeError),
            ("elaborate", SimulationStatus::ElaborationError),
            ("simulate", SimulationStatus::SimulationError),
        ] {
            let dir = tempfile::tempdir().unwrap();
            let (config, graph) = batch_fixture(dir.path());
            let logger = Logger::plain(Severity::Fatal);
            let mut sim = simulator(
                &config,
                &graph,
                &logger,
                Runner::new(false),
                Box::new(StubFlow::failing_at(stage)),
                dir.path().join("temp"),
            );

            let fqn = Fqn::resolve(&graph, "PoC.arith.prng", None, EntityKind::Testbench).unwrap();
            // compilation errors are skippable, so the batch completes
            let all_passed = sim
                .run_all(&[fqn], TestbenchKinds::ALL, SimulationSteps::batch())
                .unwrap();
            assert!(!all_passed);
            let cases = sim.suite().all_cases();
            assert_eq!(cases.len(), 1);
            assert_eq!(cases[0].status(), expected, "stage {stage}");
        }
    }

    #[test]
    fn prepare_writes_the_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let (config, graph) = batch_fixture(dir.path());
        let logger = Logger::plain(Severity::Fatal);
        let working = dir.path().join("temp");
        let mut sim = simulator(
            &config,
            &graph,
            &logger,
            Runner::new(false),
            Box::new(StubFlow::passing()),
            working.clone(),
        );

        let fqn = Fqn::resolve(&graph, "PoC.arith.prng", None, EntityKind::Testbench).unwrap();
        sim.run_all(&[fqn], TestbenchKinds::ALL, SimulationSteps::batch())
            .unwrap();
        assert!(working.join("arith_prng_tb.prj").exists());
    }

    #[test]
    fn gui_runs_report_a_gui_verdict() {
        let dir = tempfile::tempdir().unwrap();
        let (config, graph) = batch_fixture(dir.path());
        let logger = Logger::plain(Severity::Fatal);
        let mut sim = simulator(
            &config,
            &graph,
            &logger,
            Runner::new(false),
            Box::new(StubFlow::passing()),
            dir.path().join("temp"),
        );

        let fqn = Fqn::resolve(&graph, "PoC.arith.prng", None, EntityKind::Testbench).unwrap();
        let all_passed = sim
            .run_all(&[fqn.clone()], TestbenchKinds::ALL, SimulationSteps::gui())
            .unwrap();
        assert!(all_passed);
        let tb = fqn.testbenches(&graph, TestbenchKinds::ALL)[0];
        assert_eq!(graph.testbench_result(tb), SimulationResult::GuiRun);
    }

    #[test]
    fn interrupt_stops_the_batch_but_keeps_the_partial_suite() {
        let dir = tempfile::tempdir().unwrap();
        let (config, graph) = batch_fixture(dir.path());
        let logger = Logger::plain(Severity::Fatal);
        let mut sim = simulator(
            &config,
            &graph,
            &logger,
            Runner::new(false),
            Box::new(StubFlow::interrupting()),
            dir.path().join("temp"),
        );

        let fqn = Fqn::resolve(&graph, "PoC.arith.*", None, EntityKind::Testbench).unwrap();
        let all_passed = sim
            .run_all(&[fqn], TestbenchKinds::ALL, SimulationSteps::batch())
            .unwrap();

        // only the first case ran before the interrupt
        assert!(!all_passed);
        let cases = sim.suite().all_cases();
        assert_eq!(cases.len(), 1);
        assert!(cases[0].elapsed().is_some());
    }

    #[test]
    fn recompile_shorthand_expands_to_compile_steps() {
        let steps = SimulationSteps::single(SimulationStep::Recompile)
            .with(SimulationStep::Resimulate)
            .normalize();
        assert!(steps.contains(SimulationStep::CleanUpBefore));
        assert!(steps.contains(SimulationStep::Analyze));
        assert!(steps.contains(SimulationStep::Elaborate));
        assert!(steps.contains(SimulationStep::Simulate));
        assert!(!steps.contains(SimulationStep::ShowReport));
    }
}
