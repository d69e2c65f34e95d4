//! Relaxation times from the first 1/e crossing of a correlation curve.

use serde::{Deserialize, Serialize};

use crate::curve::DynamicCurve;

/// Level whose first crossing defines the relaxation time.
pub const INVERSE_E: f64 = 0.367_879_441_171_442_33;

/// Relaxation time of one shell; `None` when the curve never crosses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelaxationEntry {
    /// Nominal shell radius.
    pub norm: f64,
    /// Interpolated crossing time.
    pub tau: Option<f64>,
}

/// Relaxation times of every shell of a curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelaxationRecord {
    /// Entries in shell order.
    pub entries: Vec<RelaxationEntry>,
}

impl RelaxationRecord {
    /// Relaxation time of the shell with nominal radius `norm`.
    pub fn tau(&self, norm: f64) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| entry.norm == norm)
            .and_then(|entry| entry.tau)
    }
}

/// First time at which `values` decays through `level`, by linear interpolation.
///
/// The first finite sample must lie above the level; the crossing is the first
/// later sample at or below it. Non-finite samples are skipped.
pub fn first_crossing(times: &[f64], values: &[f64], level: f64) -> Option<f64> {
    let mut samples = times
        .iter()
        .zip(values.iter())
        .filter(|(t, v)| t.is_finite() && v.is_finite());
    let (&t0, &v0) = samples.next()?;
    if v0 <= level {
        return None;
    }
    let mut previous = (t0, v0);
    for (&t, &v) in samples {
        if v == level {
            return Some(t);
        }
        if v < level {
            let (tp, vp) = previous;
            let slope = (v - vp) / (t - tp);
            if !slope.is_finite() || slope == 0.0 {
                return Some(t);
            }
            return Some(tp + (level - vp) / slope);
        }
        previous = (t, v);
    }
    None
}

/// Relaxation time of every shell of `curve`.
///
/// Shells that never decay below 1/e, or that could not be normalized, get `None`.
pub fn extract_relaxation(curve: &DynamicCurve) -> RelaxationRecord {
    let entries = curve
        .shells
        .iter()
        .map(|shell| {
            let tau = if shell.normalized {
                let tau = first_crossing(&shell.times, &shell.values, INVERSE_E);
                if tau.is_none() {
                    tracing::debug!(k = shell.norm, "curve never crosses 1/e");
                }
                tau
            } else {
                tracing::debug!(k = shell.norm, "unnormalized shell has no relaxation time");
                None
            };
            RelaxationEntry {
                norm: shell.norm,
                tau,
            }
        })
        .collect();
    RelaxationRecord { entries }
}
