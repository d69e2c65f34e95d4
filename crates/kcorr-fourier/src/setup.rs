//! Construction helpers shared by the engines.

use kcorr_core::errors::{CorrError, ErrorInfo};
use kcorr_core::filter::ParticleFilter;
use kcorr_core::rng::RngHandle;
use kcorr_core::trajectory::{Cell, Trajectory};

use crate::config::ResolvedShells;
use crate::shells::{Selection, ShellCatalogue, SphericalShells};

/// Number of particles passing `filter` in every frame.
///
/// A frame without any selected particle cannot be normalized, so it is a
/// configuration error rather than a silent zero.
pub(crate) fn selected_counts(
    trajectory: &dyn Trajectory,
    filter: ParticleFilter,
) -> Result<Vec<usize>, CorrError> {
    let mut counts = Vec::with_capacity(trajectory.len());
    for frame in 0..trajectory.len() {
        let species = trajectory.species(frame)?;
        let count = species.iter().filter(|id| filter.accepts(**id)).count();
        if count == 0 {
            return Err(CorrError::Config(
                ErrorInfo::new("empty-selection", "filter selects no particle in a frame")
                    .with_context("frame", frame)
                    .with_context("filter", filter.tag())
                    .with_hint("grand-canonical trajectories need the species present in every frame"),
            ));
        }
        counts.push(count);
    }
    Ok(counts)
}

/// Mean of the per-frame particle counts.
pub(crate) fn mean_count(counts: &[usize]) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    counts.iter().sum::<usize>() as f64 / counts.len() as f64
}

/// Catalogue of `cell` decimated with the substream of `frame`.
pub(crate) fn select_shells(
    cell: &Cell,
    shells: &ResolvedShells,
    seed: u64,
    frame: usize,
) -> Result<Selection, CorrError> {
    let catalogue = SphericalShells::build(cell, &shells.radii, shells.dk)?;
    let mut rng = RngHandle::substream(seed, frame as u64);
    let selection = catalogue.select(shells.nk, &mut rng);
    if selection.shells.is_empty() {
        return Err(CorrError::Config(
            ErrorInfo::new("no-wave-vectors", "no wave vector falls inside any shell")
                .with_context("dk", shells.dk)
                .with_hint("increase dk or choose radii above the fundamental wave number"),
        ));
    }
    Ok(selection)
}

/// Runs `op` on a dedicated pool of `threads` workers, or on the global pool.
pub(crate) fn with_pool<R, F>(threads: Option<usize>, op: F) -> Result<R, CorrError>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    match threads {
        Some(count) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(count.max(1))
                .build()
                .map_err(|err| CorrError::config("thread-pool", err.to_string()))?;
            Ok(pool.install(op))
        }
        None => Ok(op()),
    }
}

