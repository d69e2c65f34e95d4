//! Batched complex-exponential tabulation of particle positions.

use kcorr_core::errors::{CorrError, ErrorInfo};
use ndarray::{s, Array4, ArrayView3};
use num_complex::Complex64;

fn expo_error(code: &str, message: impl Into<String>) -> CorrError {
    CorrError::Config(ErrorInfo::new(code, message))
}

/// Per-axis phase factors `exp(i n k0_a r_a)` for a block of positions.
///
/// Layout is `(sample, particle, axis, n + half_width)` with `n` running over
/// `-half_width..=half_width`. A three-dimensional phase is the product of the
/// three per-axis entries and is only evaluated for selected wave vectors.
#[derive(Debug, Clone)]
pub struct ExpoTable {
    data: Array4<Complex64>,
    half_width: usize,
}

impl ExpoTable {
    /// Signed index cutoff needed to cover every wave vector with `|k| <= kmax`.
    pub fn half_width(k0: [f64; 3], kmax: f64) -> usize {
        let smallest = k0.iter().copied().fold(f64::INFINITY, f64::min);
        1 + (kmax / smallest).floor() as usize
    }

    /// Tabulates `samples`, each a slice holding the same number of particles.
    pub fn tabulate(k0: [f64; 3], kmax: f64, samples: &[&[[f64; 3]]]) -> Result<Self, CorrError> {
        if k0.iter().any(|k| !(k.is_finite() && *k > 0.0)) {
            return Err(expo_error("invalid-k0", "fundamental wave vector must be positive"));
        }
        if !(kmax.is_finite() && kmax > 0.0) {
            return Err(expo_error("invalid-kmax", "kmax must be positive"));
        }
        let particles = samples.first().map(|sample| sample.len()).unwrap_or(0);
        if let Some(bad) = samples.iter().position(|sample| sample.len() != particles) {
            return Err(CorrError::Config(
                ErrorInfo::new("ragged-block", "every sample of a block needs the same particles")
                    .with_context("sample", bad)
                    .with_context("expected", particles),
            ));
        }

        let half_width = Self::half_width(k0, kmax);
        let width = 2 * half_width + 1;
        let one = Complex64::new(1.0, 0.0);
        let mut data = Array4::from_elem((samples.len(), particles, 3, width), one);
        for (index, sample) in samples.iter().enumerate() {
            for (particle, position) in sample.iter().enumerate() {
                for axis in 0..3 {
                    let base = Complex64::from_polar(1.0, k0[axis] * position[axis]);
                    let mut row = data.slice_mut(s![index, particle, axis, ..]);
                    let mut current = one;
                    for n in 1..=half_width {
                        current *= base;
                        row[half_width + n] = current;
                        row[half_width - n] = current.conj();
                    }
                }
            }
        }
        Ok(Self { data, half_width })
    }

    /// Number of samples (frames) in the block.
    pub fn samples(&self) -> usize {
        self.data.dim().0
    }

    /// Number of particles in the block.
    pub fn particles(&self) -> usize {
        self.data.dim().1
    }

    /// Signed index cutoff of the table.
    pub fn cutoff(&self) -> usize {
        self.half_width
    }

    /// Returns true when every component of `n` lies inside the table.
    pub fn covers(&self, n: [i32; 3]) -> bool {
        n.iter().all(|c| c.unsigned_abs() as usize <= self.half_width)
    }

    /// Column indices of a wave-index triple.
    pub fn columns(&self, n: [i32; 3]) -> [usize; 3] {
        let offset = self.half_width as i64;
        [
            (n[0] as i64 + offset) as usize,
            (n[1] as i64 + offset) as usize,
            (n[2] as i64 + offset) as usize,
        ]
    }

    /// Three-dimensional phase factor of one particle for pre-resolved columns.
    pub fn phase(&self, sample: usize, particle: usize, columns: [usize; 3]) -> Complex64 {
        self.data[[sample, particle, 0, columns[0]]]
            * self.data[[sample, particle, 1, columns[1]]]
            * self.data[[sample, particle, 2, columns[2]]]
    }

    /// Fourier amplitude `sum_p w_p exp(i k . r_p)` of one sample.
    pub fn density(&self, sample: usize, n: [i32; 3], weights: Option<&[f64]>) -> Complex64 {
        let columns = self.columns(n);
        let mut rho = Complex64::new(0.0, 0.0);
        match weights {
            Some(weights) => {
                for (particle, weight) in weights.iter().enumerate().take(self.particles()) {
                    rho += self.phase(sample, particle, columns) * *weight;
                }
            }
            None => {
                for particle in 0..self.particles() {
                    rho += self.phase(sample, particle, columns);
                }
            }
        }
        rho
    }

    /// Read-only view of one sample as `(particle, axis, n + cutoff)`.
    pub fn sample_view(&self, sample: usize) -> ArrayView3<'_, Complex64> {
        self.data.slice(s![sample, .., .., ..])
    }
}

/// Second body of a two-body correlation.
///
/// `Shared` means both bodies come from the same particle filter, so the
/// first body's table or amplitudes are reused by reference. `Distinct`
/// owns a separately computed second body.
#[derive(Debug, Clone)]
pub enum Partner<T> {
    /// Same filter on both sides.
    Shared,
    /// Separately computed second body.
    Distinct(T),
}

impl<T> Partner<T> {
    /// Returns the second body, falling back to `first` when shared.
    pub fn resolve<'a>(&'a self, first: &'a T) -> &'a T {
        match self {
            Partner::Shared => first,
            Partner::Distinct(second) => second,
        }
    }

    /// Returns true for the shared variant.
    pub fn is_shared(&self) -> bool {
        matches!(self, Partner::Shared)
    }

    /// Maps the owned second body, keeping the sharing mode.
    pub fn map<U>(self, op: impl FnOnce(T) -> U) -> Partner<U> {
        match self {
            Partner::Shared => Partner::Shared,
            Partner::Distinct(second) => Partner::Distinct(op(second)),
        }
    }
}
