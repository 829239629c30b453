use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use ipcm_core::fqn::FqnTarget;
use ipcm_core::{
    Config, EntityGraph, EntityKind, Fqn, Logger, Runner, Severity, SimulationStep,
    SimulationSteps, Simulator, TestbenchKinds, Toolchain, Visibility,
};

#[derive(Parser, Debug)]
#[command(version, about = "IP-core library management and simulation", long_about = None)]
struct Cli {
    /// Configuration file; may be given multiple times, later files
    /// override earlier ones
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Vec<PathBuf>,

    /// Name of the default IP-core library
    #[arg(long, value_name = "NAME", default_value = "PoC", global = true)]
    library: String,

    /// Show only errors and the final report
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show verbose messages
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Show debug messages, including tool command lines
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List entities below a fully qualified name
    List {
        /// Entity name, e.g. `PoC.arith` or `PoC.arith.*`
        #[arg(value_name = "FQN")]
        name: Option<String>,

        /// Include private entities
        #[arg(long)]
        all: bool,
    },
    /// Simulate the testbenches of the named entities
    Simulate {
        /// Entity names; `*` and `?` wildcards select groups
        #[arg(value_name = "FQN", required = true)]
        names: Vec<String>,

        #[arg(long, value_enum, default_value_t = Tool::Ghdl)]
        tool: Tool,

        /// Log the tool commands without running them
        #[arg(long)]
        dry_run: bool,

        /// Record a waveform and report a GUI verdict
        #[arg(long)]
        gui: bool,

        /// Skip rendering the overall simulation report
        #[arg(long)]
        no_report: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Tool {
    Ghdl,
    Questa,
}

impl Tool {
    fn toolchain(self) -> Toolchain {
        match self {
            Tool::Ghdl => Toolchain::Ghdl,
            Tool::Questa => Toolchain::Questa,
        }
    }
}

impl Cli {
    fn severity(&self) -> Severity {
        if self.debug {
            Severity::Debug
        } else if self.verbose {
            Severity::Verbose
        } else if self.quiet {
            Severity::Quiet
        } else {
            Severity::Normal
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose || cli.debug;
    match execute(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            report_error(&err, verbose);
            ExitCode::from(2)
        }
    }
}

fn report_error(err: &anyhow::Error, verbose: bool) {
    eprintln!("{}", format!("ERROR: {err}").red().bold());
    for (depth, cause) in err.chain().skip(1).enumerate() {
        if depth == 2 && !verbose {
            eprintln!("  {}", "(more causes hidden; rerun with --verbose)".red());
            break;
        }
        eprintln!("  {}", format!("caused by: {cause}").red());
    }
}

fn execute(cli: Cli) -> Result<bool> {
    let logger = Logger::new(cli.severity());
    let config = load_config(&cli.config)?;
    let threshold = match &cli.command {
        Command::List { all: true, .. } => Visibility::Private,
        _ => Visibility::Public,
    };
    let graph = EntityGraph::new(&config, &logger, &cli.library, threshold)?;

    match &cli.command {
        Command::List { name, .. } => {
            let name = name.as_deref().unwrap_or(&cli.library);
            let fqn = Fqn::resolve(&graph, name, None, EntityKind::Source)?;
            list(&graph, &fqn);
            Ok(true)
        }
        Command::Simulate {
            names,
            tool,
            dry_run,
            gui,
            no_report,
        } => {
            let fqns = names
                .iter()
                .map(|name| Fqn::resolve(&graph, name, None, EntityKind::Testbench))
                .collect::<Result<Vec<_>, _>>()?;
            let runner = Runner::new(*dry_run);
            let mut simulator =
                Simulator::new(&config, &graph, &logger, runner, tool.toolchain())?;
            let mut steps = if *gui {
                SimulationSteps::gui()
            } else {
                SimulationSteps::batch()
            };
            if *no_report {
                steps = steps.without(SimulationStep::ShowReport);
            }
            Ok(simulator.run_all(&fqns, TestbenchKinds::ALL, steps)?)
        }
    }
}

fn load_config(paths: &[PathBuf]) -> Result<Config> {
    if paths.is_empty() {
        bail!("no configuration file given; pass one or more --config files");
    }
    let mut config = Config::new();
    for path in paths {
        config
            .load_file(path)
            .with_context(|| format!("cannot load configuration file {}", path.display()))?;
    }
    Ok(config)
}

fn list(graph: &EntityGraph, fqn: &Fqn) {
    match fqn.target() {
        FqnTarget::Node(id) => print!("{}", graph.render_tree(id, 0)),
        FqnTarget::Star { .. } | FqnTarget::Ask { .. } => {
            for entity in fqn.entities(graph) {
                println!("{}", graph.display_name(entity));
            }
        }
    }
}
