use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use hma_post::io::Format;

#[derive(Parser)]
#[command(
    name = "hmapost",
    about = "Anharmonic energy and pressure from VASP molecular dynamics",
    version,
    author,
    before_help = crate::display::banner_for_help(),
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compute anharmonic energy and pressure with block statistics
    #[command(visible_alias = "p")]
    Process(ProcessArgs),

    /// Convert VASP output to the compact raw file layout
    #[command(visible_alias = "x")]
    Extract(ExtractArgs),
}

/// I/O options shared by all commands.
#[derive(Args)]
pub struct IoOptions {
    /// Input file, repeatable for a restart series (or one raw directory)
    #[arg(
        short,
        long = "input",
        value_name = "PATH",
        action = clap::ArgAction::Append,
        required = true
    )]
    pub inputs: Vec<PathBuf>,

    /// Directory for generated output files
    #[arg(short, long = "output-dir", value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Analysis settings file (TOML) overriding built-in defaults
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Suppress progress output (for scripting)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Control-parameter overrides shared by all commands.
#[derive(Args)]
#[command(next_help_heading = "Trajectory Overrides")]
pub struct TrajectoryOptions {
    /// Set temperature in K (overrides TEBEG; required for raw input)
    #[arg(short, long, value_name = "K")]
    pub temperature: Option<f64>,

    /// MD timestep in fs (overrides POTIM; required for raw input)
    #[arg(long, value_name = "FS")]
    pub timestep: Option<f64>,
}

/// Estimator and statistics options (process command only).
#[derive(Args)]
#[command(next_help_heading = "Analysis Options")]
pub struct AnalysisOptions {
    /// Quasiharmonic pressure in GPa (centers the HMA pressure estimator)
    #[arg(
        short,
        long = "pressure-qh",
        value_name = "GPA",
        allow_hyphen_values = true
    )]
    pub pressure_qh: Option<f64>,

    /// Equilibration steps discarded before averaging
    #[arg(short, long, value_name = "N")]
    pub equilibration: Option<usize>,

    /// Block size for the blocked error estimate
    #[arg(short, long, value_name = "N")]
    pub blocksize: Option<usize>,

    /// Limit the analysis to the first N recorded steps
    #[arg(long, value_name = "N")]
    pub steps: Option<usize>,

    /// Maximum per-atom force (eV/Å) accepted in the reference configuration
    #[arg(long = "force-tol", value_name = "F")]
    pub force_tol: Option<f64>,

    /// Report energies in meV/atom instead of eV/atom
    #[arg(long)]
    pub mev: bool,
}

#[derive(Args)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub io: IoOptions,

    /// Input format (inferred from the path if not specified)
    #[arg(long = "infmt", value_name = "FORMAT")]
    pub input_format: Option<InputFormat>,

    #[command(flatten)]
    pub trajectory: TrajectoryOptions,

    #[command(flatten)]
    pub analysis: AnalysisOptions,
}

#[derive(Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub io: IoOptions,

    /// Input format (inferred from the path if not specified)
    #[arg(long = "infmt", value_name = "FORMAT")]
    pub input_format: Option<InputFormat>,

    #[command(flatten)]
    pub trajectory: TrajectoryOptions,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum InputFormat {
    /// VASP vasprun.xml structured output
    Vasprun,
    /// VASP OUTCAR text log
    Outcar,
    /// Raw files written by `hmapost extract`
    Raw,
}

impl From<InputFormat> for Format {
    fn from(fmt: InputFormat) -> Self {
        match fmt {
            InputFormat::Vasprun => Format::Vasprun,
            InputFormat::Outcar => Format::Outcar,
            InputFormat::Raw => Format::Raw,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
