//! Collective intermediate scattering function F(k,t).

use std::collections::BTreeMap;
use std::sync::Arc;

use kcorr_core::cancel::CancelToken;
use kcorr_core::errors::CorrError;
use kcorr_core::filter::ParticleFilter;
use kcorr_core::trajectory::Trajectory;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::accum::{LagAccumulator, LagSums};
use crate::config::{CorrelationConfig, EngineKind};
use crate::curve::DynamicCurve;
use crate::expo::{ExpoTable, Partner};
use crate::setup::{mean_count, select_shells, selected_counts, with_pool};
use crate::shells::Selection;
use crate::tgrid::TimeOriginGrid;

/// Density amplitudes of one frame, indexed `[shell][vector]`.
pub type FrameAmplitudes = Vec<Vec<Complex64>>;

/// Engine computing `F(k,t) = <rho_0(k, t0 + t) conj(rho_1(k, t0))>`.
///
/// The first pass tabulates the density amplitudes of every frame; the
/// second correlates them shell by shell. When both filters coincide the
/// second body shares the first body's amplitudes.
pub struct CollectiveScattering {
    trajectory: Arc<dyn Trajectory>,
    config: CorrelationConfig,
    grid: TimeOriginGrid,
    selection: Selection,
    dk: f64,
    second: Option<ParticleFilter>,
}

impl CollectiveScattering {
    /// Validates the trajectory and builds the time grid and wave vectors.
    pub fn new(trajectory: Arc<dyn Trajectory>, config: &CorrelationConfig) -> Result<Self, CorrError> {
        config.validate()?;
        let times = config
            .times
            .resolve(EngineKind::Collective, trajectory.as_ref());
        let grid = TimeOriginGrid::build(
            trajectory.steps(),
            trajectory.block_period(),
            trajectory.timestep(),
            &times,
            config.norigins,
        )?;
        let second = config.filters.distinct_second();
        let first_counts = selected_counts(trajectory.as_ref(), config.filters.first)?;
        let second_counts = match second {
            Some(filter) => Some(selected_counts(trajectory.as_ref(), filter)?),
            None => None,
        };

        let cell = trajectory.cell(0)?;
        let shells = config
            .shells
            .resolve(EngineKind::Collective, cell.fundamental_wave_vector())?;
        let selection = select_shells(&cell, &shells, config.seed, 0)?;
        tracing::info!(
            frames = trajectory.len(),
            first = mean_count(&first_counts),
            second = second_counts.as_deref().map(mean_count),
            pairs = grid.pairs().len(),
            shells = selection.shells.len(),
            vectors = selection.vector_count(),
            "collective scattering engine ready"
        );
        Ok(Self {
            trajectory,
            config: config.clone(),
            grid,
            selection,
            dk: shells.dk,
            second,
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

    /// Runs both passes; cancellation is checked between frames and shells.
    pub fn compute(&self, cancel: &CancelToken) -> Result<DynamicCurve, CorrError> {
        let kmax = self.selection.kmax(self.dk);
        let tabulated = with_pool(self.config.threads, || {
            (0..self.trajectory.len())
                .into_par_iter()
                .map(|frame| {
                    cancel.check("collective-tabulation")?;
                    self.frame_amplitudes(frame, kmax)
                })
                .collect::<Result<Vec<_>, CorrError>>()
        })??;

        let (first, seconds): (Vec<FrameAmplitudes>, Vec<Option<FrameAmplitudes>>) =
            tabulated.into_iter().unzip();
        let partner = if self.second.is_some() {
            Partner::Distinct(seconds.into_iter().flatten().collect::<Vec<_>>())
        } else {
            Partner::Shared
        };
        let second = partner.resolve(&first);

        let buckets = with_pool(self.config.threads, || {
            (0..self.selection.shells.len())
                .into_par_iter()
                .map(|index| {
                    cancel.check("collective-correlation")?;
                    Ok(self.shell_buckets(index, &first, second))
                })
                .collect::<Result<Vec<_>, CorrError>>()
        })??;

        let accumulator = LagAccumulator::from_shells(buckets);
        let curve = DynamicCurve::from_accumulator(
            &accumulator,
            &self.selection.shells,
            self.trajectory.timestep(),
        );
        tracing::info!(
            shared = partner.is_shared(),
            shells = curve.shells.len(),
            "collective scattering done"
        );
        Ok(curve)
    }

    fn frame_amplitudes(
        &self,
        frame: usize,
        kmax: f64,
    ) -> Result<(FrameAmplitudes, Option<FrameAmplitudes>), CorrError> {
        let species = self.trajectory.species(frame)?;
        let positions = self.trajectory.positions(frame)?;
        let selected = self.config.filters.first.apply(species, positions);
        let first = self.amplitudes(&selected, kmax)?;
        let second = match self.second {
            Some(filter) => Some(self.amplitudes(&filter.apply(species, positions), kmax)?),
            None => None,
        };
        Ok((first, second))
    }

    fn amplitudes(&self, positions: &[[f64; 3]], kmax: f64) -> Result<FrameAmplitudes, CorrError> {
        let table = ExpoTable::tabulate(self.selection.k0, kmax, &[positions])?;
        Ok(self
            .selection
            .shells
            .iter()
            .map(|shell| {
                shell
                    .vectors
                    .iter()
                    .map(|vector| table.density(0, *vector, None))
                    .collect()
            })
            .collect())
    }

    fn shell_buckets(
        &self,
        index: usize,
        first: &[FrameAmplitudes],
        second: &[FrameAmplitudes],
    ) -> BTreeMap<i64, LagSums> {
        let steps = self.trajectory.steps();
        let vectors = self.selection.shells[index].vectors.len();
        let mut buckets: BTreeMap<i64, LagSums> = BTreeMap::new();
        for pair in self.grid.pairs() {
            for origin in self.grid.origins(*pair) {
                let later = origin + pair.lag;
                let mut sum = 0.0;
                for vector in 0..vectors {
                    sum += (first[later][index][vector] * second[origin][index][vector].conj()).re;
                }
                let bucket = buckets.entry(steps[later] - steps[origin]).or_default();
                bucket.sum += sum;
                bucket.count += vectors as u64;
            }
        }
        buckets
    }
}
