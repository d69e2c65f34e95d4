//! Trajectory collaborator interface and its in-memory implementation.
//!
//! The correlation engines only read from a [`Trajectory`]: the step sequence,
//! the timestep, the block period and per-frame positions. Frames are assumed
//! to be materialised before an engine runs; nothing is streamed inside the
//! hot loops.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{CorrError, ErrorInfo};

/// Relative tolerance used when comparing cell sides between frames.
const CELL_TOLERANCE: f64 = 1e-12;

/// Orthorhombic simulation cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Side lengths along x, y and z.
    pub side: [f64; 3],
}

impl Cell {
    /// Creates a cubic cell with the given side.
    pub fn cubic(side: f64) -> Self {
        Self { side: [side; 3] }
    }

    /// Fundamental reciprocal vector `2π / L` along each axis.
    pub fn fundamental_wave_vector(&self) -> [f64; 3] {
        let mut k0 = [0.0; 3];
        for (axis, side) in self.side.iter().enumerate() {
            k0[axis] = 2.0 * std::f64::consts::PI / side;
        }
        k0
    }

    /// Applies the minimum image convention to a displacement.
    pub fn minimum_image(&self, mut delta: [f64; 3]) -> [f64; 3] {
        for (axis, side) in self.side.iter().enumerate() {
            delta[axis] -= (delta[axis] / side).round() * side;
        }
        delta
    }

    /// Folds a position into the cell centred on the origin.
    pub fn fold(&self, mut position: [f64; 3]) -> [f64; 3] {
        for (axis, side) in self.side.iter().enumerate() {
            position[axis] -= (position[axis] / side).round() * side;
        }
        position
    }

    /// Returns true when both cells agree within a relative tolerance.
    pub fn approx_eq(&self, other: &Cell) -> bool {
        self.side
            .iter()
            .zip(other.side.iter())
            .all(|(a, b)| (a - b).abs() <= CELL_TOLERANCE * a.abs().max(b.abs()))
    }

    fn validate(&self) -> Result<(), CorrError> {
        if self.side.iter().any(|side| !side.is_finite() || *side <= 0.0) {
            return Err(CorrError::Config(
                ErrorInfo::new("invalid-cell", "cell sides must be finite and positive")
                    .with_context("side", format!("{:?}", self.side)),
            ));
        }
        Ok(())
    }
}

/// One simulation snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Integer step number.
    pub step: i64,
    /// Simulation cell at this step.
    pub cell: Cell,
    /// Particle positions, folded into the cell.
    pub positions: Vec<[f64; 3]>,
    /// Species identifier per particle. Empty means every particle is species 0.
    #[serde(default)]
    pub species: Vec<u32>,
    /// Optional particle velocities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocities: Option<Vec<[f64; 3]>>,
}

impl Frame {
    /// Number of particles in the frame.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true when the frame holds no particles.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Read-only view of a materialised trajectory.
pub trait Trajectory: Send + Sync {
    /// Number of frames.
    fn len(&self) -> usize;

    /// Returns true when the trajectory holds no frames.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ordered step numbers, one per frame.
    fn steps(&self) -> &[i64];

    /// Physical time of one step.
    fn timestep(&self) -> f64;

    /// Number of samples after which the step pattern repeats (1 if none).
    fn block_period(&self) -> usize;

    /// Cell of the given frame.
    fn cell(&self, frame: usize) -> Result<Cell, CorrError>;

    /// Folded positions of the given frame.
    fn positions(&self, frame: usize) -> Result<&[[f64; 3]], CorrError>;

    /// Positions with periodic boundaries removed.
    fn unfolded_positions(&self, frame: usize) -> Result<&[[f64; 3]], CorrError>;

    /// Velocities of the given frame, if stored.
    fn velocities(&self, frame: usize) -> Result<Option<&[[f64; 3]]>, CorrError>;

    /// Species identifiers of the given frame.
    fn species(&self, frame: usize) -> Result<&[u32], CorrError>;

    /// Path the trajectory was read from, when it came from disk.
    fn source(&self) -> Option<&Path> {
        None
    }

    /// Human readable label used in provenance records.
    fn label(&self) -> String {
        self.source()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "in-memory".to_string())
    }

    /// Physical time spanned by the trajectory.
    fn total_time(&self) -> f64 {
        match (self.steps().first(), self.steps().last()) {
            (Some(first), Some(last)) => (last - first) as f64 * self.timestep(),
            _ => 0.0,
        }
    }

    /// Returns true when the cell changes shape between frames.
    fn is_cell_variable(&self) -> Result<bool, CorrError> {
        if self.len() < 2 {
            return Ok(false);
        }
        let first = self.cell(0)?;
        for frame in 1..self.len() {
            if !first.approx_eq(&self.cell(frame)?) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Verifies that the step sequence repeats with the given block period.
///
/// Steps must be strictly increasing. Every complete or trailing block must
/// have the same internal step offsets as the first block, and consecutive
/// blocks must start at evenly spaced steps.
pub fn check_block_period(steps: &[i64], period: usize) -> Result<(), CorrError> {
    if period == 0 {
        return Err(CorrError::config(
            "invalid-block-period",
            "block period must be at least one",
        ));
    }
    if let Some(index) = steps.windows(2).position(|pair| pair[1] <= pair[0]) {
        return Err(CorrError::Config(
            ErrorInfo::new("block-period-mismatch", "steps are not strictly increasing")
                .with_context("frame", index + 1)
                .with_context("previous", steps[index])
                .with_context("step", steps[index + 1])
                .with_hint("split restarted runs into separate trajectories"),
        ));
    }
    if period == 1 || steps.len() <= period {
        return Ok(());
    }
    let reference: Vec<i64> = steps[..period].iter().map(|step| step - steps[0]).collect();
    let block_stride = steps[period] - steps[0];
    for (block, chunk) in steps.chunks(period).enumerate() {
        let start = chunk[0];
        if start - steps[0] != block as i64 * block_stride {
            return Err(CorrError::Config(
                ErrorInfo::new("block-period-mismatch", "blocks are not evenly spaced")
                    .with_context("block", block)
                    .with_context("period", period)
                    .with_hint("check the block period declared for this trajectory"),
            ));
        }
        for (position, step) in chunk.iter().enumerate() {
            if step - start != reference[position] {
                return Err(CorrError::Config(
                    ErrorInfo::new(
                        "block-period-mismatch",
                        "step sequence is not periodic with the declared block period",
                    )
                    .with_context("block", block)
                    .with_context("position", position)
                    .with_context("period", period),
                ));
            }
        }
    }
    Ok(())
}

/// Serialized trajectory layout accepted by [`InMemoryTrajectory::from_json_path`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryFile {
    /// Physical time of one step.
    pub timestep: f64,
    /// Block period of the step sequence.
    #[serde(default = "default_block_period")]
    pub block_period: usize,
    /// Frames in temporal order.
    pub frames: Vec<Frame>,
}

fn default_block_period() -> usize {
    1
}

/// Trajectory fully held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryTrajectory {
    frames: Vec<Frame>,
    steps: Vec<i64>,
    default_species: Vec<Vec<u32>>,
    unfolded: Option<Vec<Vec<[f64; 3]>>>,
    timestep: f64,
    block_period: usize,
    source: Option<PathBuf>,
}

impl InMemoryTrajectory {
    /// Builds a trajectory from frames and a timestep, with block period 1.
    pub fn new(frames: Vec<Frame>, timestep: f64) -> Result<Self, CorrError> {
        if frames.is_empty() {
            return Err(CorrError::config(
                "empty-trajectory",
                "trajectory must contain at least one frame",
            ));
        }
        if !timestep.is_finite() || timestep <= 0.0 {
            return Err(CorrError::Config(
                ErrorInfo::new("invalid-timestep", "timestep must be finite and positive")
                    .with_context("timestep", timestep),
            ));
        }
        let mut default_species = Vec::with_capacity(frames.len());
        for (index, frame) in frames.iter().enumerate() {
            frame.cell.validate()?;
            if !frame.species.is_empty() && frame.species.len() != frame.positions.len() {
                return Err(CorrError::Config(
                    ErrorInfo::new("species-length", "species and positions disagree in length")
                        .with_context("frame", index)
                        .with_context("positions", frame.positions.len())
                        .with_context("species", frame.species.len()),
                ));
            }
            if let Some(velocities) = &frame.velocities {
                if velocities.len() != frame.positions.len() {
                    return Err(CorrError::Config(
                        ErrorInfo::new(
                            "velocity-length",
                            "velocities and positions disagree in length",
                        )
                        .with_context("frame", index),
                    ));
                }
            }
            default_species.push(if frame.species.is_empty() {
                vec![0; frame.positions.len()]
            } else {
                Vec::new()
            });
        }
        let steps = frames.iter().map(|frame| frame.step).collect();
        let unfolded = unfold(&frames);
        Ok(Self {
            frames,
            steps,
            default_species,
            unfolded,
            timestep,
            block_period: 1,
            source: None,
        })
    }

    /// Declares the block period of the step sequence.
    pub fn with_block_period(mut self, period: usize) -> Result<Self, CorrError> {
        check_block_period(&self.steps, period)?;
        self.block_period = period;
        Ok(self)
    }

    /// Records the file the trajectory was read from.
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Reads a [`TrajectoryFile`] from a JSON document.
    pub fn from_json_path(path: &Path) -> Result<Self, CorrError> {
        let bytes = fs::read(path).map_err(|err| CorrError::io("trajectory_read", err))?;
        let file: TrajectoryFile = crate::serde::from_json_slice(&bytes)?;
        debug!(
            path = %path.display(),
            frames = file.frames.len(),
            "loaded trajectory"
        );
        Self::new(file.frames, file.timestep)?
            .with_block_period(file.block_period)
            .map(|trajectory| trajectory.with_source(path))
    }

    /// Converts the trajectory back into its serialized layout.
    pub fn to_file(&self) -> TrajectoryFile {
        TrajectoryFile {
            timestep: self.timestep,
            block_period: self.block_period,
            frames: self.frames.clone(),
        }
    }

    /// Borrow the underlying frames.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    fn frame(&self, index: usize) -> Result<&Frame, CorrError> {
        self.frames.get(index).ok_or_else(|| {
            CorrError::Config(
                ErrorInfo::new("frame-out-of-range", "frame index exceeds trajectory length")
                    .with_context("frame", index)
                    .with_context("len", self.frames.len()),
            )
        })
    }
}

/// Removes periodic jumps by chaining minimum-image displacements.
///
/// Returns `None` when the particle count changes between frames, since
/// particle identity is then undefined.
fn unfold(frames: &[Frame]) -> Option<Vec<Vec<[f64; 3]>>> {
    let count = frames.first()?.positions.len();
    if frames.iter().any(|frame| frame.positions.len() != count) {
        return None;
    }
    let mut unfolded = Vec::with_capacity(frames.len());
    unfolded.push(frames[0].positions.clone());
    for pair in frames.windows(2) {
        let previous_unfolded = unfolded.last()?;
        let next: Vec<[f64; 3]> = pair[0]
            .positions
            .iter()
            .zip(pair[1].positions.iter())
            .zip(previous_unfolded.iter())
            .map(|((before, after), base)| {
                let delta = pair[1].cell.minimum_image([
                    after[0] - before[0],
                    after[1] - before[1],
                    after[2] - before[2],
                ]);
                [base[0] + delta[0], base[1] + delta[1], base[2] + delta[2]]
            })
            .collect();
        unfolded.push(next);
    }
    Some(unfolded)
}

impl Trajectory for InMemoryTrajectory {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn steps(&self) -> &[i64] {
        &self.steps
    }

    fn timestep(&self) -> f64 {
        self.timestep
    }

    fn block_period(&self) -> usize {
        self.block_period
    }

    fn cell(&self, frame: usize) -> Result<Cell, CorrError> {
        Ok(self.frame(frame)?.cell)
    }

    fn positions(&self, frame: usize) -> Result<&[[f64; 3]], CorrError> {
        Ok(&self.frame(frame)?.positions)
    }

    fn unfolded_positions(&self, frame: usize) -> Result<&[[f64; 3]], CorrError> {
        let unfolded = self.unfolded.as_ref().ok_or_else(|| {
            CorrError::config(
                "unfold-grand-canonical",
                "cannot unfold a trajectory whose particle count changes",
            )
        })?;
        unfolded.get(frame).map(Vec::as_slice).ok_or_else(|| {
            CorrError::Config(
                ErrorInfo::new("frame-out-of-range", "frame index exceeds trajectory length")
                    .with_context("frame", frame),
            )
        })
    }

    fn velocities(&self, frame: usize) -> Result<Option<&[[f64; 3]]>, CorrError> {
        Ok(self.frame(frame)?.velocities.as_deref())
    }

    fn species(&self, frame: usize) -> Result<&[u32], CorrError> {
        let stored = &self.frame(frame)?.species;
        if stored.is_empty() {
            Ok(&self.default_species[frame])
        } else {
            Ok(stored)
        }
    }

    fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}
