//! Spherical wave-vector shells and their deterministic decimation.

use kcorr_core::errors::{CorrError, ErrorInfo};
use kcorr_core::rng::RngHandle;
use kcorr_core::trajectory::Cell;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

/// Wave vectors whose norm lies within `dk` of a nominal radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shell {
    /// Position of the radius in the requested radius list.
    pub slot: usize,
    /// Nominal shell radius.
    pub norm: f64,
    /// Integer wave-index triples; the wave vector is `n * k0`.
    pub vectors: Vec<[i32; 3]>,
}

/// Subset of each shell's vectors used by an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Fundamental wave vector of the cell the selection was drawn for.
    pub k0: [f64; 3],
    /// Selected shells; empty shells are omitted.
    pub shells: Vec<Shell>,
}

impl Selection {
    /// Largest wave-vector norm any engine must tabulate for this selection.
    pub fn kmax(&self, dk: f64) -> f64 {
        self.shells
            .iter()
            .map(|shell| shell.norm)
            .fold(0.0, f64::max)
            + dk
    }

    /// Total number of selected vectors.
    pub fn vector_count(&self) -> usize {
        self.shells.iter().map(|shell| shell.vectors.len()).sum()
    }
}

/// Collaborator producing wave-vector shells for a simulation cell.
pub trait ShellCatalogue: Send + Sync {
    /// Fundamental wave vector `2 pi / L` per axis.
    fn k0(&self) -> [f64; 3];

    /// All shells, including empty ones, in radius order.
    fn shells(&self) -> &[Shell];

    /// Draws at most `nk` distinct vectors per shell, without replacement.
    fn select(&self, nk: usize, rng: &mut RngHandle) -> Selection {
        let shells = self
            .shells()
            .iter()
            .filter(|shell| !shell.vectors.is_empty())
            .map(|shell| {
                let take = nk.min(shell.vectors.len());
                let mut picked = sample(&mut *rng, shell.vectors.len(), take).into_vec();
                picked.sort_unstable();
                Shell {
                    slot: shell.slot,
                    norm: shell.norm,
                    vectors: picked.into_iter().map(|i| shell.vectors[i]).collect(),
                }
            })
            .collect();
        Selection {
            k0: self.k0(),
            shells,
        }
    }
}

/// Shells built by enumerating integer triples inside a sphere of radius kmax.
#[derive(Debug, Clone, PartialEq)]
pub struct SphericalShells {
    k0: [f64; 3],
    shells: Vec<Shell>,
}

impl SphericalShells {
    /// Builds shells of half-width `dk` around `radii` for `cell`.
    ///
    /// A triple belongs to the first radius it lies within `dk` of. The zero
    /// vector is never included.
    pub fn build(cell: &Cell, radii: &[f64], dk: f64) -> Result<Self, CorrError> {
        if !(dk.is_finite() && dk > 0.0) {
            return Err(CorrError::Config(
                ErrorInfo::new("invalid-dk", "shell width must be positive").with_context("dk", dk),
            ));
        }
        if radii.is_empty() {
            return Err(CorrError::config("empty-shells", "at least one shell radius is required"));
        }
        if let Some(bad) = radii.iter().find(|r| !(r.is_finite() && **r > 0.0)) {
            return Err(CorrError::Config(
                ErrorInfo::new("invalid-radius", "shell radii must be positive")
                    .with_context("radius", bad),
            ));
        }

        let k0 = cell.fundamental_wave_vector();
        let kmax = radii.iter().copied().fold(0.0, f64::max) + dk;
        let smallest = k0.iter().copied().fold(f64::INFINITY, f64::min);
        let bound = 1 + (kmax / smallest).floor() as i32;
        let mut shells: Vec<Shell> = radii
            .iter()
            .enumerate()
            .map(|(slot, norm)| Shell {
                slot,
                norm: *norm,
                vectors: Vec::new(),
            })
            .collect();

        for ix in -bound..=bound {
            for iy in -bound..=bound {
                for iz in -bound..=bound {
                    if ix == 0 && iy == 0 && iz == 0 {
                        continue;
                    }
                    let kx = ix as f64 * k0[0];
                    let ky = iy as f64 * k0[1];
                    let kz = iz as f64 * k0[2];
                    let ksq = kx * kx + ky * ky + kz * kz;
                    if ksq > kmax * kmax {
                        continue;
                    }
                    let knorm = ksq.sqrt();
                    if let Some(shell) = shells
                        .iter_mut()
                        .find(|shell| (knorm - shell.norm).abs() < dk)
                    {
                        shell.vectors.push([ix, iy, iz]);
                    }
                }
            }
        }

        tracing::debug!(
            shells = shells.len(),
            vectors = shells.iter().map(|s| s.vectors.len()).sum::<usize>(),
            "built spherical shells"
        );
        Ok(Self { k0, shells })
    }
}

impl ShellCatalogue for SphericalShells {
    fn k0(&self) -> [f64; 3] {
        self.k0
    }

    fn shells(&self) -> &[Shell] {
        &self.shells
    }
}
