use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use kcorr_core::serde::to_canonical_json_bytes;
use kcorr_core::synthetic::{ideal_gas, IdealGasSpec};

#[derive(Args, Debug)]
pub struct SynthArgs {
    /// Destination JSON trajectory file.
    #[arg(long)]
    pub out: PathBuf,
    /// Number of particles.
    #[arg(long, default_value_t = 256)]
    pub particles: usize,
    /// Number of frames, one per step.
    #[arg(long, default_value_t = 100)]
    pub frames: usize,
    /// Side of the cubic cell.
    #[arg(long, default_value_t = 10.0)]
    pub side: f64,
    /// Per-axis displacement standard deviation per step.
    #[arg(long, default_value_t = 0.1)]
    pub sigma: f64,
    /// Physical time of one step.
    #[arg(long, default_value_t = 1.0)]
    pub timestep: f64,
    /// Number of species, assigned round-robin.
    #[arg(long, default_value_t = 1)]
    pub species: u32,
    /// Master deterministic seed.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

pub fn run(args: &SynthArgs) -> Result<(), Box<dyn Error>> {
    let spec = IdealGasSpec {
        particles: args.particles,
        frames: args.frames,
        side: args.side,
        sigma: args.sigma,
        timestep: args.timestep,
        species: args.species,
        seed: args.seed,
    };
    let trajectory = ideal_gas(&spec)?;
    if let Some(parent) = args.out.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.out, to_canonical_json_bytes(&trajectory.to_file())?)?;
    tracing::info!(
        path = %args.out.display(),
        particles = spec.particles,
        frames = spec.frames,
        "synthetic trajectory written"
    );
    Ok(())
}
