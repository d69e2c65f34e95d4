//! Correlation curves produced by the engines.

use serde::{Deserialize, Serialize};

use crate::accum::LagAccumulator;
use crate::shells::Shell;

/// Time-dependent correlation of one shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellCurve {
    /// Nominal shell radius.
    pub norm: f64,
    /// Realised physical lag times in increasing order.
    pub times: Vec<f64>,
    /// Values divided by the lag-zero value when `normalized` is set.
    pub values: Vec<f64>,
    /// Values averaged over contributions but not divided by lag zero.
    pub unnormalized: Vec<f64>,
    /// False when the lag-zero value was zero or non-finite.
    pub normalized: bool,
}

/// Time-dependent correlation over all selected shells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicCurve {
    /// One curve per non-empty shell, in radius order.
    pub shells: Vec<ShellCurve>,
}

impl DynamicCurve {
    /// Averages `accumulator` per bucket and normalizes by the lag-zero bucket.
    ///
    /// Accumulator index `i` belongs to `shells[i]`. Shells without any
    /// contribution are dropped; a shell without a lag-zero bucket stays
    /// unnormalized.
    pub fn from_accumulator(accumulator: &LagAccumulator, shells: &[Shell], timestep: f64) -> Self {
        let mut curves = Vec::with_capacity(shells.len());
        for (index, shell) in shells.iter().enumerate() {
            let means = accumulator.means(index);
            if means.is_empty() {
                tracing::warn!(k = shell.norm, "shell received no contributions");
                continue;
            }
            let reference = means
                .iter()
                .find(|(delta, _)| *delta == 0)
                .map_or(f64::NAN, |(_, mean)| *mean);
            let times = means.iter().map(|(delta, _)| *delta as f64 * timestep).collect();
            let unnormalized: Vec<f64> = means.iter().map(|(_, mean)| *mean).collect();
            let normalized = reference.is_finite() && reference != 0.0;
            let values = if normalized {
                unnormalized.iter().map(|value| value / reference).collect()
            } else {
                tracing::warn!(
                    k = shell.norm,
                    reference,
                    "lag-zero value is degenerate; keeping unnormalized values"
                );
                unnormalized.clone()
            };
            curves.push(ShellCurve {
                norm: shell.norm,
                times,
                values,
                unnormalized,
                normalized,
            });
        }
        Self { shells: curves }
    }
}

/// Structure factor value of one shell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticPoint {
    /// Nominal shell radius.
    pub norm: f64,
    /// S(k) normalized by `sqrt(N0 N1)`.
    pub value: f64,
    /// Fluctuation before dividing by the particle counts.
    pub unnormalized: f64,
}

/// Static correlation over all selected shells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticCurve {
    /// One point per shell with at least one contribution.
    pub points: Vec<StaticPoint>,
}

/// Result of any engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "curve", rename_all = "kebab-case")]
pub enum Correlation {
    /// F_s(k,t) or F(k,t).
    Dynamic(DynamicCurve),
    /// S(k).
    Static(StaticCurve),
}

impl Correlation {
    /// Returns the time-dependent curve, if any.
    pub fn as_dynamic(&self) -> Option<&DynamicCurve> {
        match self {
            Correlation::Dynamic(curve) => Some(curve),
            Correlation::Static(_) => None,
        }
    }

    /// Returns the static curve, if any.
    pub fn as_static(&self) -> Option<&StaticCurve> {
        match self {
            Correlation::Static(curve) => Some(curve),
            Correlation::Dynamic(_) => None,
        }
    }
}
