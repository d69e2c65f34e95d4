//! Synthetic trajectories of non-interacting particles.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::errors::{CorrError, ErrorInfo};
use crate::rng::RngHandle;
use crate::trajectory::{Cell, Frame, InMemoryTrajectory};

fn default_timestep() -> f64 {
    1.0
}

fn default_species() -> u32 {
    1
}

/// Parameters of a Brownian ideal-gas trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdealGasSpec {
    /// Number of particles.
    pub particles: usize,
    /// Number of frames (one per step).
    pub frames: usize,
    /// Side of the cubic cell.
    pub side: f64,
    /// Standard deviation of the per-step displacement along each axis.
    pub sigma: f64,
    /// Physical time of one step.
    #[serde(default = "default_timestep")]
    pub timestep: f64,
    /// Number of species, assigned round-robin.
    #[serde(default = "default_species")]
    pub species: u32,
    /// Master seed.
    pub seed: u64,
}

/// Generates a folded Brownian ideal-gas trajectory.
///
/// Displacements along each axis are Gaussian with variance `sigma²` per
/// step, so the mean square displacement per axis grows as `sigma² t`.
pub fn ideal_gas(spec: &IdealGasSpec) -> Result<InMemoryTrajectory, CorrError> {
    if spec.particles == 0 || spec.frames == 0 || spec.species == 0 {
        return Err(CorrError::Config(
            ErrorInfo::new("invalid-synthetic", "particles, frames and species must be positive")
                .with_context("particles", spec.particles)
                .with_context("frames", spec.frames)
                .with_context("species", spec.species),
        ));
    }
    let normal = Normal::new(0.0, spec.sigma).map_err(|err| {
        CorrError::Config(ErrorInfo::new("invalid-synthetic", err.to_string()))
    })?;
    let cell = Cell::cubic(spec.side);
    let mut rng = RngHandle::from_seed(spec.seed);
    let mut unfolded: Vec<[f64; 3]> = (0..spec.particles)
        .map(|_| {
            [
                rng.gen_range(-0.5..0.5) * spec.side,
                rng.gen_range(-0.5..0.5) * spec.side,
                rng.gen_range(-0.5..0.5) * spec.side,
            ]
        })
        .collect();
    let species: Vec<u32> = (0..spec.particles)
        .map(|index| index as u32 % spec.species)
        .collect();

    let mut frames = Vec::with_capacity(spec.frames);
    for step in 0..spec.frames {
        if step > 0 {
            for position in unfolded.iter_mut() {
                for coordinate in position.iter_mut() {
                    *coordinate += normal.sample(&mut rng);
                }
            }
        }
        frames.push(Frame {
            step: step as i64,
            cell,
            positions: unfolded.iter().map(|position| cell.fold(*position)).collect(),
            species: species.clone(),
            velocities: None,
        });
    }
    InMemoryTrajectory::new(frames, spec.timestep)
}

/// Appends an exact copy of every particle as species 1.
///
/// The two species then share the same dynamics, which makes cross
/// correlations directly comparable with the full-population ones.
pub fn with_twin_species(
    trajectory: &InMemoryTrajectory,
) -> Result<InMemoryTrajectory, CorrError> {
    let frames = trajectory
        .frames()
        .iter()
        .map(|frame| {
            let mut positions = frame.positions.clone();
            positions.extend_from_slice(&frame.positions);
            let mut species = vec![0; frame.positions.len()];
            species.extend(std::iter::repeat(1).take(frame.positions.len()));
            Frame {
                step: frame.step,
                cell: frame.cell,
                positions,
                species,
                velocities: None,
            }
        })
        .collect();
    let timestep = crate::trajectory::Trajectory::timestep(trajectory);
    InMemoryTrajectory::new(frames, timestep)
}
