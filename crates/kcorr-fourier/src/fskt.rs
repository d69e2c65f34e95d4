//! Self intermediate scattering function F_s(k,t).

use std::sync::Arc;

use kcorr_core::cancel::CancelToken;
use kcorr_core::errors::{CorrError, ErrorInfo};
use kcorr_core::trajectory::Trajectory;
use rayon::prelude::*;

use crate::accum::LagAccumulator;
use crate::config::{CorrelationConfig, EngineKind};
use crate::curve::DynamicCurve;
use crate::expo::ExpoTable;
use crate::setup::{select_shells, selected_counts, with_pool};
use crate::shells::Selection;
use crate::tgrid::TimeOriginGrid;

/// Engine computing `F_s(k,t) = <exp(i k . (r_p(t0 + t) - r_p(t0)))>`.
///
/// Particles are processed in blocks of `block_size`; each block tabulates
/// the phase factors of all its frames once and accumulates a partial
/// [`LagAccumulator`]. Blocks run in parallel and are merged in block order.
pub struct SelfScattering {
    trajectory: Arc<dyn Trajectory>,
    config: CorrelationConfig,
    grid: TimeOriginGrid,
    selection: Selection,
    dk: f64,
}

impl SelfScattering {
    /// Validates the trajectory and builds the time grid and wave vectors.
    pub fn new(trajectory: Arc<dyn Trajectory>, config: &CorrelationConfig) -> Result<Self, CorrError> {
        config.validate()?;
        if config.filters.distinct_second().is_some() {
            return Err(CorrError::config(
                "cross-self-correlation",
                "the self correlation takes a single particle filter",
            ));
        }
        let times = config
            .times
            .resolve(EngineKind::SelfScattering, trajectory.as_ref());
        let grid = TimeOriginGrid::build(
            trajectory.steps(),
            trajectory.block_period(),
            trajectory.timestep(),
            &times,
            config.norigins,
        )?;

        let counts = selected_counts(trajectory.as_ref(), config.filters.first)?;
        if let Some(frame) = counts.windows(2).position(|pair| pair[0] != pair[1]) {
            return Err(CorrError::Config(
                ErrorInfo::new(
                    "variable-particle-count",
                    "the self correlation needs the same particles in every frame",
                )
                .with_context("frame", frame + 1),
            ));
        }
        trajectory.unfolded_positions(0)?;

        let cell = trajectory.cell(0)?;
        let shells = config
            .shells
            .resolve(EngineKind::SelfScattering, cell.fundamental_wave_vector())?;
        let selection = select_shells(&cell, &shells, config.seed, 0)?;
        tracing::info!(
            frames = trajectory.len(),
            particles = counts.first().copied().unwrap_or(0),
            pairs = grid.pairs().len(),
            shells = selection.shells.len(),
            vectors = selection.vector_count(),
            "self scattering engine ready"
        );
        Ok(Self {
            trajectory,
            config: config.clone(),
            grid,
            selection,
            dk: shells.dk,
        })
    }

    /// Time-origin grid used by the engine.
    pub fn grid(&self) -> &TimeOriginGrid {
        &self.grid
    }

    /// Selected wave vectors.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    /// Trajectory being analysed.
    pub fn trajectory(&self) -> &Arc<dyn Trajectory> {
        &self.trajectory
    }

    /// Runs the correlation; cancellation is checked between particle blocks.
    pub fn compute(&self, cancel: &CancelToken) -> Result<DynamicCurve, CorrError> {
        let filter = self.config.filters.first;
        let mut positions = Vec::with_capacity(self.trajectory.len());
        for frame in 0..self.trajectory.len() {
            let species = self.trajectory.species(frame)?;
            let unfolded = self.trajectory.unfolded_positions(frame)?;
            positions.push(filter.apply(species, unfolded));
        }
        let particles = positions.first().map(Vec::len).unwrap_or(0);
        let block = self.config.block_size.min(particles).max(1);
        let starts: Vec<usize> = (0..particles).step_by(block).collect();
        let kmax = self.selection.kmax(self.dk);

        let partials = with_pool(self.config.threads, || {
            starts
                .par_iter()
                .map(|&start| {
                    cancel.check("self-scattering")?;
                    self.block_accumulator(&positions, start, (start + block).min(particles), kmax)
                })
                .collect::<Result<Vec<_>, CorrError>>()
        })??;

        let accumulator = partials
            .into_iter()
            .fold(LagAccumulator::new(self.selection.shells.len()), LagAccumulator::merge);
        let curve = DynamicCurve::from_accumulator(
            &accumulator,
            &self.selection.shells,
            self.trajectory.timestep(),
        );
        tracing::info!(blocks = starts.len(), shells = curve.shells.len(), "self scattering done");
        Ok(curve)
    }

    fn block_accumulator(
        &self,
        positions: &[Vec<[f64; 3]>],
        start: usize,
        end: usize,
        kmax: f64,
    ) -> Result<LagAccumulator, CorrError> {
        let samples: Vec<&[[f64; 3]]> = positions.iter().map(|frame| &frame[start..end]).collect();
        let table = ExpoTable::tabulate(self.selection.k0, kmax, &samples)?;
        let steps = self.trajectory.steps();
        let particles = table.particles();
        let mut accumulator = LagAccumulator::new(self.selection.shells.len());
        for (index, shell) in self.selection.shells.iter().enumerate() {
            for vector in &shell.vectors {
                let columns = table.columns(*vector);
                for pair in self.grid.pairs() {
                    for origin in self.grid.origins(*pair) {
                        let later = origin + pair.lag;
                        let mut sum = 0.0;
                        for particle in 0..particles {
                            let now = table.phase(later, particle, columns);
                            let then = table.phase(origin, particle, columns);
                            sum += (now * then.conj()).re;
                        }
                        accumulator.add(index, steps[later] - steps[origin], sum, particles as u64);
                    }
                }
            }
        }
        tracing::debug!(start, end, "particle block accumulated");
        Ok(accumulator)
    }
}
