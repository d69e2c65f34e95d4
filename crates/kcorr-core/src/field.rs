//! Per-particle scalar fields used as structure factor weights.

use serde::{Deserialize, Serialize};

use crate::errors::{CorrError, ErrorInfo};
use crate::trajectory::Trajectory;

/// One real value per particle per frame, shifted to zero global mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarField {
    name: String,
    steps: Vec<i64>,
    values: Vec<Vec<f64>>,
}

impl ScalarField {
    /// Builds a field and subtracts its global mean.
    ///
    /// The global mean is the average of the per-frame means, so frames with
    /// different particle counts weigh equally.
    pub fn centered(
        name: impl Into<String>,
        steps: Vec<i64>,
        mut values: Vec<Vec<f64>>,
    ) -> Result<Self, CorrError> {
        if steps.len() != values.len() {
            return Err(CorrError::Config(
                ErrorInfo::new("field-frames", "field steps and values disagree in length")
                    .with_context("steps", steps.len())
                    .with_context("frames", values.len()),
            ));
        }
        if values.is_empty() || values.iter().any(Vec::is_empty) {
            return Err(CorrError::config(
                "field-empty",
                "scalar field must provide values for every frame",
            ));
        }
        let mean = values
            .iter()
            .map(|frame| frame.iter().sum::<f64>() / frame.len() as f64)
            .sum::<f64>()
            / values.len() as f64;
        for frame in values.iter_mut() {
            for value in frame.iter_mut() {
                *value -= mean;
            }
        }
        Ok(Self {
            name: name.into(),
            steps,
            values,
        })
    }

    /// Name of the field (used as output tag).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Step stamps of the field frames.
    pub fn steps(&self) -> &[i64] {
        &self.steps
    }

    /// Values of one frame.
    pub fn frame(&self, index: usize) -> Option<&[f64]> {
        self.values.get(index).map(Vec::as_slice)
    }

    /// Checks that the field is step-synchronised with the trajectory.
    pub fn check_sync(&self, trajectory: &dyn Trajectory) -> Result<(), CorrError> {
        if self.steps.as_slice() != trajectory.steps() {
            return Err(CorrError::Config(
                ErrorInfo::new("field-not-synced", "field and trajectory steps differ")
                    .with_context("field_frames", self.steps.len())
                    .with_context("trajectory_frames", trajectory.len()),
            ));
        }
        for (index, frame) in self.values.iter().enumerate() {
            let particles = trajectory.positions(index)?.len();
            if frame.len() != particles {
                return Err(CorrError::Config(
                    ErrorInfo::new("field-not-synced", "field and frame particle counts differ")
                        .with_context("frame", index)
                        .with_context("field", frame.len())
                        .with_context("particles", particles),
                ));
            }
        }
        Ok(())
    }
}
