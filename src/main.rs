use std::{error::Error, path::PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use wisp_smoke::{Backtrace, Preconditioning, SolverKind, SourceKind};

mod inspect;
mod run;

/// Smoke simulation on a staggered grid.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a simulation and record every frame.
    Run(RunArgs),
    /// Summarize a recorded simulation.
    Inspect(InspectArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Directory the recording is written to.
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Cells along each axis.
    #[arg(short, long, default_value_t = 32)]
    pub grid: u32,

    /// Cell size.
    #[arg(long, default_value_t = 0.5)]
    pub cell_size: f64,

    /// Number of frames to simulate.
    #[arg(short, long, default_value_t = 240)]
    pub frames: u64,

    #[arg(long, default_value_t = 24)]
    pub fps: u32,

    /// Time step per frame. Defaults to one frame at `--fps`.
    #[arg(long)]
    pub dt: Option<f64>,

    #[arg(long, value_enum, default_value_t = SourceArg::CubeCenter)]
    pub source: SourceArg,

    #[arg(long, value_enum, default_value_t = BacktraceArg::Rk2)]
    pub backtrace: BacktraceArg,

    #[arg(long, value_enum, default_value_t = SolverArg::Pcg)]
    pub solver: SolverArg,

    /// Run without the oscillating obstacle.
    #[arg(long)]
    pub no_obstacle: bool,

    /// Also write the final density field as text, one value per line.
    #[arg(long)]
    pub density_dump: Option<PathBuf>,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Directory holding a recording.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SourceArg {
    Single,
    CubeCenter,
    TwoSource,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Single => SourceKind::Single,
            SourceArg::CubeCenter => SourceKind::CubeCenter,
            SourceArg::TwoSource => SourceKind::TwoSource,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BacktraceArg {
    Euler,
    Rk2,
}

impl From<BacktraceArg> for Backtrace {
    fn from(arg: BacktraceArg) -> Self {
        match arg {
            BacktraceArg::Euler => Backtrace::Euler,
            BacktraceArg::Rk2 => Backtrace::Rk2,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SolverArg {
    /// Conjugate gradient with a modified incomplete Cholesky preconditioner.
    Pcg,
    /// Unpreconditioned conjugate gradient.
    Cg,
    /// Compressed sparse rows with a Jacobi preconditioner.
    Sparse,
}

impl From<SolverArg> for SolverKind {
    fn from(arg: SolverArg) -> Self {
        match arg {
            SolverArg::Pcg => SolverKind::Pcg {
                preconditioner: Preconditioning::ModifiedIncompleteCholesky,
            },
            SolverArg::Cg => SolverKind::Pcg {
                preconditioner: Preconditioning::None,
            },
            SolverArg::Sparse => SolverKind::Sparse,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run::run(args),
        Command::Inspect(args) => inspect::inspect(args),
    }
}
