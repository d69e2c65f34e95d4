//! Linear and logarithmic sampling grids for shell radii and lag times.

/// Returns `samples` evenly spaced values from `min` to `max` inclusive.
pub fn linear_grid(min: f64, max: f64, samples: usize) -> Vec<f64> {
    match samples {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (samples - 1) as f64;
            (0..samples).map(|i| min + step * i as f64).collect()
        }
    }
}

/// Returns `samples` logarithmically spaced values from `min` to `max`.
///
/// A positive `min` yields a geometric progression. When `min` is zero the
/// grid starts at zero and continues as `(max + 1)^(i / (samples - 1)) - 1`,
/// which keeps the spacing logarithmic while still reaching `max`.
pub fn log_grid(min: f64, max: f64, samples: usize) -> Vec<f64> {
    match samples {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let last = (samples - 1) as f64;
            if min > 0.0 {
                let ratio = (max / min).powf(1.0 / last);
                (0..samples)
                    .map(|i| {
                        if i + 1 == samples {
                            max
                        } else {
                            min * ratio.powi(i as i32)
                        }
                    })
                    .collect()
            } else {
                let base = max + 1.0;
                (0..samples)
                    .map(|i| base.powf(i as f64 / last) - 1.0)
                    .collect()
            }
        }
    }
}
