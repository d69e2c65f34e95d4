//! Static structure factor S(k), reference and kernel-reduced variants.

use std::borrow::Cow;
use std::sync::Arc;

use kcorr_core::cancel::CancelToken;
use kcorr_core::errors::{CorrError, ErrorInfo};
use kcorr_core::field::ScalarField;
use kcorr_core::filter::ParticleFilter;
use kcorr_core::trajectory::{Cell, Trajectory};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::accum::{StaticAccumulator, StaticSums};
use crate::config::{CorrelationConfig, EngineKind, ResolvedShells};
use crate::curve::{StaticCurve, StaticPoint};
use crate::expo::{ExpoTable, Partner};
use crate::native::{require_kernel, FramePhases, KernelInfo, NativeKernel};
use crate::setup::{mean_count, select_shells, selected_counts, with_pool};
use crate::shells::Selection;
use crate::tgrid::origin_stride;

/// Reduction turning a one-frame phase table into density amplitudes.
type Reduction<'r> =
    dyn Fn(&ExpoTable, &[[i32; 3]], Option<&[f64]>) -> Result<Vec<Complex64>, CorrError> + Sync + 'r;

/// Engine computing `S(k) = Re[<rho_0 rho_1*> - <rho_0><rho_1>*] / sqrt(N0 N1)`.
///
/// Densities are optionally weighted by a mean-subtracted scalar field; only
/// then are the mean densities accumulated. A variable cell re-derives the
/// vectors of the same shell radii whenever the cell changes.
pub struct StructureFactor {
    trajectory: Arc<dyn Trajectory>,
    config: CorrelationConfig,
    shells: ResolvedShells,
    selection: Selection,
    cell: Cell,
    field: Option<ScalarField>,
    second: Option<ParticleFilter>,
    first_count: f64,
    second_count: f64,
}

impl StructureFactor {
    /// Validates filters and field and draws the wave vectors of the first frame.
    pub fn new(
        trajectory: Arc<dyn Trajectory>,
        config: &CorrelationConfig,
        field: Option<ScalarField>,
    ) -> Result<Self, CorrError> {
        config.validate()?;
        if let Some(field) = &field {
            field.check_sync(trajectory.as_ref())?;
        }
        let second = config.filters.distinct_second();
        let first_count = mean_count(&selected_counts(trajectory.as_ref(), config.filters.first)?);
        let second_count = match second {
            Some(filter) => mean_count(&selected_counts(trajectory.as_ref(), filter)?),
            None => first_count,
        };

        let cell = trajectory.cell(0)?;
        let shells = config
            .shells
            .resolve(EngineKind::StructureFactor, cell.fundamental_wave_vector())?;
        let selection = select_shells(&cell, &shells, config.seed, 0)?;
        tracing::info!(
            frames = trajectory.len(),
            first = first_count,
            second = second_count,
            weighted = field.is_some(),
            shells = selection.shells.len(),
            vectors = selection.vector_count(),
            "structure factor engine ready"
        );
        Ok(Self {
            trajectory,
            config: config.clone(),
            shells,
            selection,
            cell,
            field,
            second,
            first_count,
            second_count,
        })
    }

    /// Wave vectors drawn for the first frame.
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

    /// Time-averaged particle counts of the two bodies.
    pub fn particle_counts(&self) -> (f64, f64) {
        (self.first_count, self.second_count)
    }

    /// Runs the reference reduction.
    pub fn compute(&self, cancel: &CancelToken) -> Result<StaticCurve, CorrError> {
        self.accumulate(cancel, &|table: &ExpoTable, vectors: &[[i32; 3]], weights: Option<&[f64]>| {
            Ok(vectors
                .iter()
                .map(|vector| table.density(0, *vector, weights))
                .collect())
        })
    }

    fn accumulate(&self, cancel: &CancelToken, reduce: &Reduction<'_>) -> Result<StaticCurve, CorrError> {
        let accumulator = with_pool(self.config.threads, || self.frame_loop(cancel, reduce))??;
        let norm = (self.first_count * self.second_count).sqrt();
        let points = self
            .shells
            .radii
            .iter()
            .enumerate()
            .filter_map(|(slot, radius)| {
                let fluctuation = accumulator.slot(slot)?.fluctuation()?;
                Some(StaticPoint {
                    norm: *radius,
                    value: fluctuation / norm,
                    unnormalized: fluctuation,
                })
            })
            .collect::<Vec<_>>();
        tracing::info!(shells = points.len(), "structure factor done");
        Ok(StaticCurve { points })
    }

    fn frame_loop(&self, cancel: &CancelToken, reduce: &Reduction<'_>) -> Result<StaticAccumulator, CorrError> {
        let variable = self.trajectory.is_cell_variable()?;
        let stride = origin_stride(
            self.trajectory.block_period(),
            self.trajectory.len(),
            self.config.norigins,
        );
        let mut cell = self.cell;
        let mut selection = Cow::Borrowed(&self.selection);
        let mut accumulator = StaticAccumulator::new(self.shells.radii.len());
        for frame in (0..self.trajectory.len()).step_by(stride) {
            cancel.check("structure-factor")?;
            if variable {
                let current = self.trajectory.cell(frame)?;
                if !current.approx_eq(&cell) {
                    selection = Cow::Owned(select_shells(
                        &current,
                        &self.shells,
                        self.config.seed,
                        frame,
                    )?);
                    cell = current;
                    tracing::debug!(frame, "wave vectors rebuilt for new cell");
                }
            }
            for (slot, sums) in self.frame_sums(frame, &selection, reduce)? {
                accumulator.add(slot, &sums);
            }
        }
        Ok(accumulator)
    }

    fn frame_sums(
        &self,
        frame: usize,
        selection: &Selection,
        reduce: &Reduction<'_>,
    ) -> Result<Vec<(usize, StaticSums)>, CorrError> {
        let species = self.trajectory.species(frame)?;
        let positions = self.trajectory.positions(frame)?;
        let values = match &self.field {
            Some(field) => Some(field.frame(frame).ok_or_else(|| {
                CorrError::Config(
                    ErrorInfo::new("field-not-synced", "field has no values for frame")
                        .with_context("frame", frame),
                )
            })?),
            None => None,
        };
        let kmax = selection.kmax(self.shells.dk);
        let body = |filter: ParticleFilter| -> Result<(ExpoTable, Option<Vec<f64>>), CorrError> {
            let selected = filter.apply(species, positions);
            let table = ExpoTable::tabulate(selection.k0, kmax, &[selected.as_slice()])?;
            let weights = values.map(|values| filter.apply(species, values));
            Ok((table, weights))
        };
        let first = body(self.config.filters.first)?;
        let partner = match self.second {
            Some(filter) => Partner::Distinct(body(filter)?),
            None => Partner::Shared,
        };
        let weighted = self.field.is_some();

        selection
            .shells
            .par_iter()
            .map(|shell| {
                let (table, weights) = &first;
                let rho_first = reduce(table, &shell.vectors, weights.as_deref())?;
                let rho_second = match &partner {
                    Partner::Shared => Partner::Shared,
                    Partner::Distinct((table, weights)) => {
                        Partner::Distinct(reduce(table, &shell.vectors, weights.as_deref())?)
                    }
                };
                let rho_second = rho_second.resolve(&rho_first);
                let mut sums = StaticSums {
                    count: shell.vectors.len() as u64,
                    ..StaticSums::default()
                };
                for (a, b) in rho_first.iter().zip(rho_second.iter()) {
                    sums.cross += a * b.conj();
                    if weighted {
                        sums.first += a;
                        sums.second += b;
                    }
                }
                Ok((shell.slot, sums))
            })
            .collect()
    }
}

/// Structure factor whose density reduction runs in an injected [`NativeKernel`].
///
/// The kernel contract is unweighted, so scalar fields are rejected.
pub struct StructureFactorOptimized {
    base: StructureFactor,
    kernel: Arc<dyn NativeKernel>,
    info: KernelInfo,
}

impl StructureFactorOptimized {
    /// Probes `kernel` and builds the underlying engine.
    pub fn new(
        trajectory: Arc<dyn Trajectory>,
        config: &CorrelationConfig,
        field: Option<ScalarField>,
        kernel: Option<Arc<dyn NativeKernel>>,
    ) -> Result<Self, CorrError> {
        let (kernel, info) = require_kernel(kernel)?;
        if field.is_some() {
            return Err(CorrError::config(
                "field-unsupported",
                "the native kernel cannot weight densities by a scalar field",
            ));
        }
        let base = StructureFactor::new(trajectory, config, None)?;
        Ok(Self { base, kernel, info })
    }

    /// Capabilities reported by the kernel probe.
    pub fn kernel_info(&self) -> &KernelInfo {
        &self.info
    }

    /// Reference engine sharing the configuration and wave vectors.
    pub fn base(&self) -> &StructureFactor {
        &self.base
    }

    /// Runs the kernel reduction.
    pub fn compute(&self, cancel: &CancelToken) -> Result<StaticCurve, CorrError> {
        let kernel = self.kernel.as_ref();
        self.base
            .accumulate(cancel, &|table: &ExpoTable, vectors: &[[i32; 3]], _weights: Option<&[f64]>| {
                kernel.reduce(
                    FramePhases {
                        table: table.sample_view(0),
                        cutoff: table.cutoff(),
                    },
                    vectors,
                )
            })
    }
}
