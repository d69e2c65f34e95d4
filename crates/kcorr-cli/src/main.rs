use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    analyze::{self, AnalyzeArgs},
    synth::{self, SynthArgs},
};
use kcorr_fourier::EngineKind;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "kcorr", about = "Fourier-space correlations of particle trajectories")]
struct Cli {
    /// Log at debug level unless RUST_LOG overrides it.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a Brownian ideal-gas trajectory.
    Synth(SynthArgs),
    /// Self intermediate scattering function F_s(k,t).
    Fskt(AnalyzeArgs),
    /// Collective intermediate scattering function F(k,t).
    Fkt(AnalyzeArgs),
    /// Static structure factor S(k).
    Sk(AnalyzeArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Command::Synth(args) => synth::run(&args),
        Command::Fskt(args) => analyze::run(EngineKind::SelfScattering, &args),
        Command::Fkt(args) => analyze::run(EngineKind::Collective, &args),
        Command::Sk(args) => analyze::run(EngineKind::StructureFactor, &args),
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
