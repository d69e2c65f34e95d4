//! Partial sums for time-dependent and static correlations.

use std::collections::BTreeMap;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Sum of correlation samples and the number of contributions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LagSums {
    /// Accumulated correlation value.
    pub sum: f64,
    /// Number of contributions (particles or origins).
    pub count: u64,
}

impl LagSums {
    /// Mean value, or `None` for an empty bucket.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Per shell, per realised step difference partial sums.
///
/// Buckets are keyed by the step difference actually observed, so lags that
/// map to the same physical time are merged. Two accumulators combine with
/// [`LagAccumulator::merge`], which is associative and commutative up to
/// floating point rounding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LagAccumulator {
    shells: Vec<BTreeMap<i64, LagSums>>,
}

impl LagAccumulator {
    /// Creates an empty accumulator for `shells` shells.
    pub fn new(shells: usize) -> Self {
        Self {
            shells: vec![BTreeMap::new(); shells],
        }
    }

    /// Wraps already reduced per-shell buckets.
    pub fn from_shells(shells: Vec<BTreeMap<i64, LagSums>>) -> Self {
        Self { shells }
    }

    /// Adds `count` contributions summing to `value` at step difference `delta`.
    pub fn add(&mut self, shell: usize, delta: i64, value: f64, count: u64) {
        if shell >= self.shells.len() {
            self.shells.resize(shell + 1, BTreeMap::new());
        }
        let bucket = self.shells[shell].entry(delta).or_default();
        bucket.sum += value;
        bucket.count += count;
    }

    /// Folds `other` into `self`.
    pub fn merge(mut self, other: Self) -> Self {
        if other.shells.len() > self.shells.len() {
            self.shells.resize(other.shells.len(), BTreeMap::new());
        }
        for (mine, theirs) in self.shells.iter_mut().zip(other.shells) {
            for (delta, sums) in theirs {
                let bucket = mine.entry(delta).or_default();
                bucket.sum += sums.sum;
                bucket.count += sums.count;
            }
        }
        self
    }

    /// Number of shells tracked.
    pub fn len(&self) -> usize {
        self.shells.len()
    }

    /// Returns true when no shell is tracked.
    pub fn is_empty(&self) -> bool {
        self.shells.is_empty()
    }

    /// Mean values of one shell, skipping empty buckets.
    pub fn means(&self, shell: usize) -> Vec<(i64, f64)> {
        self.shells
            .get(shell)
            .map(|buckets| {
                buckets
                    .iter()
                    .filter_map(|(delta, sums)| sums.mean().map(|mean| (*delta, mean)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Per-shell sums needed by the static structure factor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticSums {
    /// Sum of `rho_0 conj(rho_1)` over vectors and frames.
    pub cross: Complex64,
    /// Sum of `rho_0`, only accumulated for field-weighted densities.
    pub first: Complex64,
    /// Sum of `rho_1`, only accumulated for field-weighted densities.
    pub second: Complex64,
    /// Number of (vector, frame) contributions.
    pub count: u64,
}

impl StaticSums {
    fn absorb(&mut self, other: &StaticSums) {
        self.cross += other.cross;
        self.first += other.first;
        self.second += other.second;
        self.count += other.count;
    }

    /// `Re[<rho_0 rho_1*> - <rho_0><rho_1>*]`, or `None` for an empty shell.
    pub fn fluctuation(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let mean_cross = self.cross / n;
        let mean_first = self.first / n;
        let mean_second = self.second / n;
        Some((mean_cross - mean_first * mean_second.conj()).re)
    }
}

/// Static accumulator indexed by shell slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticAccumulator {
    shells: Vec<StaticSums>,
}

impl StaticAccumulator {
    /// Creates an empty accumulator for `shells` slots.
    pub fn new(shells: usize) -> Self {
        Self {
            shells: vec![StaticSums::default(); shells],
        }
    }

    /// Adds partial sums to one slot.
    pub fn add(&mut self, slot: usize, sums: &StaticSums) {
        if slot >= self.shells.len() {
            self.shells.resize(slot + 1, StaticSums::default());
        }
        self.shells[slot].absorb(sums);
    }

    /// Folds `other` into `self`.
    pub fn merge(mut self, other: Self) -> Self {
        for (slot, sums) in other.shells.iter().enumerate() {
            self.add(slot, sums);
        }
        self
    }

    /// Sums of one slot.
    pub fn slot(&self, slot: usize) -> Option<&StaticSums> {
        self.shells.get(slot)
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.shells.len()
    }

    /// Returns true when no slot is tracked.
    pub fn is_empty(&self) -> bool {
        self.shells.is_empty()
    }
}
