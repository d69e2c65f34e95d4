//! Injected reduction kernel used by the optimized structure factor.

use std::fmt;
use std::sync::Arc;

use kcorr_core::errors::{CorrError, ErrorInfo};
use ndarray::ArrayView3;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Capabilities reported by a kernel at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelInfo {
    /// Kernel name.
    pub name: String,
    /// Kernel version string.
    pub version: String,
}

/// Phase table of one frame handed to a kernel.
#[derive(Debug, Clone, Copy)]
pub struct FramePhases<'a> {
    /// Per-axis phase factors laid out as `(particle, axis, n + cutoff)`.
    pub table: ArrayView3<'a, Complex64>,
    /// Signed index cutoff of the table.
    pub cutoff: usize,
}

/// Accelerated evaluation of `rho(k) = sum_p exp(i k . r_p)`.
///
/// Implementations must return one amplitude per requested triple, in order.
pub trait NativeKernel: Send + Sync + fmt::Debug {
    /// Verifies the kernel is functional and reports its capabilities.
    fn probe(&self) -> Result<KernelInfo, CorrError>;

    /// Reduces the phase table over particles for every triple of `vectors`.
    fn reduce(&self, phases: FramePhases<'_>, vectors: &[[i32; 3]]) -> Result<Vec<Complex64>, CorrError>;
}

/// Probes `kernel`, turning its absence into a backend error.
pub fn require_kernel(
    kernel: Option<Arc<dyn NativeKernel>>,
) -> Result<(Arc<dyn NativeKernel>, KernelInfo), CorrError> {
    let Some(kernel) = kernel else {
        tracing::error!("optimized structure factor requested without a native kernel");
        return Err(CorrError::Backend(
            ErrorInfo::new(
                "missing-accelerated-backend",
                "no native kernel available for the optimized structure factor",
            )
            .with_hint("enable the native-kernel feature or use the reference structure factor"),
        ));
    };
    match kernel.probe() {
        Ok(info) => {
            tracing::info!(kernel = %info.name, version = %info.version, "native kernel ready");
            Ok((kernel, info))
        }
        Err(err) => {
            tracing::error!(error = %err, "native kernel probe failed");
            Err(err)
        }
    }
}

/// Kernel shipped with the crate, if the `native-kernel` feature is enabled.
pub fn default_kernel() -> Option<Arc<dyn NativeKernel>> {
    #[cfg(feature = "native-kernel")]
    {
        Some(Arc::new(BlockedKernel))
    }
    #[cfg(not(feature = "native-kernel"))]
    {
        None
    }
}

/// Kernel reducing lanes of the phase table with `ndarray::Zip`, vectors in parallel.
#[cfg(feature = "native-kernel")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockedKernel;

#[cfg(feature = "native-kernel")]
impl NativeKernel for BlockedKernel {
    fn probe(&self) -> Result<KernelInfo, CorrError> {
        let table = ndarray::Array3::from_elem((2, 3, 3), Complex64::new(1.0, 0.0));
        let phases = FramePhases {
            table: table.view(),
            cutoff: 1,
        };
        let rho = self.reduce(phases, &[[0, 0, 0], [1, -1, 1]])?;
        if rho.iter().any(|value| (value - Complex64::new(2.0, 0.0)).norm() > 1e-12) {
            return Err(CorrError::backend(
                "kernel-probe-mismatch",
                "blocked kernel failed its self test",
            ));
        }
        Ok(KernelInfo {
            name: "blocked".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    fn reduce(&self, phases: FramePhases<'_>, vectors: &[[i32; 3]]) -> Result<Vec<Complex64>, CorrError> {
        use ndarray::{s, Zip};
        use rayon::prelude::*;

        let width = phases.table.dim().2;
        let cutoff = phases.cutoff as i64;
        vectors
            .par_iter()
            .map(|vector| {
                let mut columns = [0usize; 3];
                for axis in 0..3 {
                    let column = vector[axis] as i64 + cutoff;
                    if column < 0 || column >= width as i64 {
                        return Err(CorrError::Backend(
                            ErrorInfo::new("kernel-index-range", "wave index outside the phase table")
                                .with_context("axis", axis)
                                .with_context("index", vector[axis]),
                        ));
                    }
                    columns[axis] = column as usize;
                }
                let x = phases.table.slice(s![.., 0, columns[0]]);
                let y = phases.table.slice(s![.., 1, columns[1]]);
                let z = phases.table.slice(s![.., 2, columns[2]]);
                Ok(Zip::from(&x)
                    .and(&y)
                    .and(&z)
                    .fold(Complex64::new(0.0, 0.0), |acc, a, b, c| acc + a * b * c))
            })
            .collect()
    }
}
