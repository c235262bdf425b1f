//! Pyro CLI: the command-line build tool for Papyrus script projects.
//!
//! Provides `pyro build` for compiling a project and running its
//! post-processing steps, and `pyro dump` for inspecting the header of a
//! compiled module.

#![warn(missing_docs)]

mod build;
mod dump;
mod logging;
mod signal;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use pyro_common::GameType;
use pyro_config::ZipCompression;

/// Pyro: incremental, parallel Papyrus script builds.
#[derive(Parser, Debug)]
#[command(name = "pyro", version, about = "Papyrus Script Build Tool")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a project, then anonymize, package and zip its output.
    Build(BuildArgs),
    /// Print the header of a compiled `.pex` module.
    Dump(DumpArgs),
}

/// Arguments for the `pyro build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Path to `pyro.toml` or the directory containing it.
    #[arg(default_value = ".")]
    pub project: PathBuf,

    /// Run post-processing steps even when scripts fail to compile.
    #[arg(long)]
    pub ignore_errors: bool,

    /// Compile every script regardless of timestamps.
    #[arg(long)]
    pub no_incremental_build: bool,

    /// Compile one script at a time.
    #[arg(long)]
    pub no_parallel: bool,

    /// Maximum number of concurrent compiler processes (0 picks a default).
    #[arg(long)]
    pub worker_limit: Option<usize>,

    /// Path to the Papyrus compiler executable.
    #[arg(long)]
    pub compiler_path: Option<PathBuf>,

    /// Path to the compiler flags file.
    #[arg(long)]
    pub flags_path: Option<PathBuf>,

    /// Directory compiled modules are written to.
    #[arg(long)]
    pub output_path: Option<PathBuf>,

    /// Target game (fo4, sse, tes5).
    #[arg(short = 'g', long)]
    pub game_type: Option<GameType>,

    /// Game install directory.
    #[arg(long)]
    pub game_path: Option<PathBuf>,

    /// Directory for the per-run log file.
    #[arg(long)]
    pub log_path: Option<PathBuf>,

    /// Directory remote sources are fetched into.
    #[arg(long)]
    pub temp_path: Option<PathBuf>,

    /// Seconds before a single compiler invocation is killed.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Path to the BSArch executable.
    #[arg(long)]
    pub bsarch_path: Option<PathBuf>,

    /// Directory archives are written to.
    #[arg(long)]
    pub package_path: Option<PathBuf>,

    /// Zip compression method (store, deflate).
    #[arg(long)]
    pub zip_compression: Option<ZipCompression>,

    /// Directory the zip file is written to.
    #[arg(long)]
    pub zip_output_path: Option<PathBuf>,
}

/// Arguments for the `pyro dump` subcommand.
#[derive(Parser, Debug)]
pub struct DumpArgs {
    /// Compiled module to inspect.
    pub file: PathBuf,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Header output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable aligned fields.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
    };
    logging::init_tracing(global.quiet, global.verbose);

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Dump(ref args) => dump::run(args),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
