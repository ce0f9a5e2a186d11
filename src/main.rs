//! slope-gen Command Line Interface
//!
//! Usage:
//!   slope-gen [OPTIONS] <chain.json>
//!   slope-gen --help
//!
//! Examples:
//!   slope-gen airfoil.json                        # Inspector source to stdout
//!   slope-gen --emit=executor --mode=OMP airfoil.json
//!   slope-gen --emit=both --timing -o airfoil.cpp airfoil.json
//!   slope-gen --emit=bindings airfoil.json        # Global-to-local names as JSON
//!   slope-gen --emit=flags --compiler=intel airfoil.json

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use slope_gen::codegen::{Executor, ExecutorEmission};
use slope_gen::description::ChainDescription;
use slope_gen::session::Session;
use slope_gen::toolchain::{self, Compiler};
use std::fs;
use std::path::PathBuf;

/// slope-gen - inspector/executor generator for sparse tiling
#[derive(Parser, Debug)]
#[command(name = "slope-gen")]
#[command(version)]
#[command(about = "Generates SLOPE inspector/executor code for a loop chain", long_about = None)]
struct Cli {
    /// Loop-chain description (JSON)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// What to emit
    #[arg(long, default_value = "inspector")]
    emit: EmitKind,

    /// Execution mode (SEQUENTIAL, OMP, ONLY_MPI, OMP_MPI)
    #[arg(short, long)]
    mode: Option<String>,

    /// Time every loop and write per-rank statistics
    #[arg(long)]
    timing: bool,

    /// Inspector debug verbosity (MINIMAL, VERY_LOW, LOW, MEDIUM, HIGH)
    #[arg(long)]
    debug: Option<String>,

    /// Average tile size
    #[arg(long)]
    tile_size: Option<u32>,

    /// Process rank
    #[arg(long)]
    rank: Option<u32>,

    /// Compiler family for --emit=flags
    #[arg(long, default_value = "gnu")]
    compiler: Compiler,

    /// Wrap the executor in a function with this name
    #[arg(long, value_name = "NAME")]
    function: Option<String>,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
    /// Inspector translation unit
    Inspector,
    /// Executor traversal
    Executor,
    /// Inspector followed by executor
    Both,
    /// Per-loop global-to-local bindings (JSON)
    Bindings,
    /// Inspector entry-point arguments (JSON)
    Arguments,
    /// Compile options
    Flags,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    info!("slope-gen v{}", slope_gen::VERSION);
    debug!("Input file: {:?}", cli.input);

    let json = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read input file: {:?}", cli.input))?;
    let mut description = ChainDescription::from_json(&json)
        .with_context(|| format!("Failed to parse chain description: {:?}", cli.input))?;
    apply_overrides(&cli, &mut description);

    let session = description
        .session()
        .with_context(|| format!("Invalid loop chain `{}`", description.name))?;

    let output = match cli.emit {
        EmitKind::Inspector => session.generate_inspector()?.source,
        EmitKind::Executor => render_executor(&cli, &build_executor(&session, &description)?)?,
        EmitKind::Both => {
            let inspector = session.generate_inspector()?.source;
            let executor = render_executor(&cli, &build_executor(&session, &description)?)?;
            format!("{}\n{}", inspector, executor)
        }
        EmitKind::Bindings => serde_json::to_string_pretty(&build_executor(&session, &description)?.bindings)?,
        EmitKind::Arguments => serde_json::to_string_pretty(&session.generate_inspector()?.arguments)?,
        EmitKind::Flags => format!("{}\n", toolchain::compile_options(cli.compiler, &session.config()).join(" ")),
    };

    write_output(&cli.output, &output)
}

fn apply_overrides(cli: &Cli, description: &mut ChainDescription) {
    if let Some(mode) = &cli.mode {
        description.execution_mode = Some(mode.clone());
    }
    if let Some(level) = &cli.debug {
        description.debug_mode = Some(level.clone());
    }
    if cli.timing {
        description.timing = true;
    }
    if let Some(tile_size) = cli.tile_size {
        description.tile_size = Some(tile_size);
    }
    if let Some(rank) = cli.rank {
        description.rank = Some(rank);
    }
}

/// Without kernels in the description, each loop gets a placeholder naming
/// its bindings.
fn build_executor(session: &Session<'_>, description: &ChainDescription) -> Result<ExecutorEmission> {
    if !description.kernels.is_empty() {
        return Ok(session.generate_executor(&description.kernels)?);
    }
    let config = session.config();
    let emission = Executor::new(session.chain(), &config)?.generate_with(|b| {
        let maps: Vec<&str> = b.local_maps.values().map(String::as_str).collect();
        format!("// {}: iterations {}, maps [{}]", b.loop_name, b.iterations, maps.join(", "))
    })?;
    Ok(emission)
}

fn render_executor(cli: &Cli, emission: &ExecutorEmission) -> Result<String> {
    match &cli.function {
        Some(name) => Ok(emission.wrap_function(name)?),
        None => Ok(emission.source.clone()),
    }
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content).with_context(|| format!("Failed to write output file: {:?}", p))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
