//! Time-origin grid: maps requested physical lags onto `(offset, lag)` pairs.

use std::collections::{BTreeMap, BTreeSet};

use kcorr_core::errors::{CorrError, ErrorInfo};
use kcorr_core::trajectory::check_block_period;
use serde::{Deserialize, Serialize};

fn grid_error(code: &str, message: impl Into<String>) -> CorrError {
    CorrError::Config(ErrorInfo::new(code, message))
}

/// First frame inside a block and frame separation for one realised lag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OriginLag {
    /// Index of the origin frame within the first block.
    pub offset: usize,
    /// Frame separation between origin and later sample.
    pub lag: usize,
}

/// Ordered, deduplicated `(offset, lag)` pairs plus the origin stride.
///
/// The grid is immutable once built and can be shared between threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeOriginGrid {
    pairs: Vec<OriginLag>,
    stride: usize,
    frames: usize,
}

impl TimeOriginGrid {
    /// Builds the grid for the provided step sequence and requested times.
    ///
    /// Each requested time is matched to the realised lag whose physical
    /// time is closest, ties going to the smaller lag. Trajectories shorter
    /// than one block only use offset zero.
    pub fn build(
        steps: &[i64],
        block_period: usize,
        timestep: f64,
        times: &[f64],
        norigins: Option<usize>,
    ) -> Result<Self, CorrError> {
        if steps.is_empty() {
            return Err(grid_error("empty-trajectory", "no frames to build a time grid on"));
        }
        if !(timestep.is_finite() && timestep > 0.0) {
            return Err(CorrError::Config(
                ErrorInfo::new("invalid-timestep", "timestep must be positive")
                    .with_context("timestep", timestep),
            ));
        }
        check_block_period(steps, block_period)?;

        let offsets = if steps.len() <= block_period {
            1
        } else {
            block_period
        };
        let mut candidates: BTreeMap<i64, OriginLag> = BTreeMap::new();
        for offset in 0..offsets {
            for sample in offset..steps.len() {
                let delta = steps[sample] - steps[offset];
                candidates.entry(delta).or_insert(OriginLag {
                    offset,
                    lag: sample - offset,
                });
            }
        }

        let mut selected = BTreeSet::new();
        for &time in times {
            if !time.is_finite() || time < 0.0 {
                return Err(CorrError::Config(
                    ErrorInfo::new("invalid-time", "requested times must be finite and non-negative")
                        .with_context("time", time),
                ));
            }
            let target = (time / timestep).round() as i64;
            if let Some(pair) = closest(&candidates, target) {
                selected.insert((pair.lag, pair.offset));
            }
        }
        let pairs = selected
            .into_iter()
            .map(|(lag, offset)| OriginLag { offset, lag })
            .collect();

        Ok(Self {
            pairs,
            stride: origin_stride(block_period, steps.len(), norigins),
            frames: steps.len(),
        })
    }

    /// Returns the selected pairs ordered by lag, then offset.
    pub fn pairs(&self) -> &[OriginLag] {
        &self.pairs
    }

    /// Returns the spacing between consecutive origins of one pair.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the number of frames the grid was built for.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Iterates over the origin frames of `pair` whose later sample exists.
    pub fn origins(&self, pair: OriginLag) -> impl Iterator<Item = usize> {
        (pair.offset..self.frames.saturating_sub(pair.lag)).step_by(self.stride)
    }
}

/// Picks the candidate whose step difference is closest to `target`.
fn closest(candidates: &BTreeMap<i64, OriginLag>, target: i64) -> Option<OriginLag> {
    let below = candidates.range(..=target).next_back();
    let above = candidates.range(target + 1..).next();
    match (below, above) {
        (Some((low, low_pair)), Some((high, high_pair))) => {
            if high - target < target - low {
                Some(*high_pair)
            } else {
                Some(*low_pair)
            }
        }
        (Some((_, pair)), None) | (None, Some((_, pair))) => Some(*pair),
        (None, None) => None,
    }
}

/// Spacing between time origins.
///
/// Block-periodic trajectories always use the block period so that origins
/// stay aligned with the block layout.
pub fn origin_stride(block_period: usize, frames: usize, norigins: Option<usize>) -> usize {
    if block_period > 1 {
        return block_period;
    }
    match norigins {
        Some(count) if count > 0 => (frames / count).max(1),
        _ => 1,
    }
}
