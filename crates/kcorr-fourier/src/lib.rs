//! Fourier-space correlation engines for particle trajectories.

pub mod accum;
/// Configuration structures loadable from YAML or JSON.
pub mod config;
pub mod curve;
pub mod engine;
pub mod expo;
pub mod fkt;
pub mod fskt;
pub mod grid;
pub mod native;
pub mod output;
mod setup;
pub mod shells;
pub mod sk;
pub mod tau;
pub mod tgrid;

pub use accum::{LagAccumulator, LagSums, StaticAccumulator, StaticSums};
pub use config::{CorrelationConfig, EngineKind, OutputConfig, ShellSpec, TimeSpec};
pub use curve::{Correlation, DynamicCurve, ShellCurve, StaticCurve, StaticPoint};
pub use engine::{build_engine, run_engine, Correlator, Engine, RunOutcome};
pub use expo::{ExpoTable, Partner};
pub use fkt::CollectiveScattering;
pub use fskt::SelfScattering;
pub use grid::{linear_grid, log_grid};
pub use native::{default_kernel, require_kernel, FramePhases, KernelInfo, NativeKernel};
pub use output::{CorrelationReport, OutputTarget};
pub use shells::{Selection, Shell, ShellCatalogue, SphericalShells};
pub use sk::{StructureFactor, StructureFactorOptimized};
pub use tau::{extract_relaxation, first_crossing, RelaxationEntry, RelaxationRecord, INVERSE_E};
pub use tgrid::{origin_stride, OriginLag, TimeOriginGrid};

#[cfg(feature = "native-kernel")]
pub use native::BlockedKernel;
