//! Engine interface, tagged engine variant and run driver.

use std::path::PathBuf;
use std::sync::Arc;

use kcorr_core::cancel::CancelToken;
use kcorr_core::errors::CorrError;
use kcorr_core::field::ScalarField;
use kcorr_core::hash::stable_hash_string;
use kcorr_core::provenance::RunProvenance;
use kcorr_core::trajectory::Trajectory;

use crate::config::{CorrelationConfig, EngineKind};
use crate::curve::Correlation;
use crate::fkt::CollectiveScattering;
use crate::fskt::SelfScattering;
use crate::native::NativeKernel;
use crate::output::{is_up_to_date, write_report, CorrelationReport, OutputTarget};
use crate::sk::{StructureFactor, StructureFactorOptimized};
use crate::tau::{extract_relaxation, RelaxationRecord};

/// Common surface of every correlation engine.
pub trait Correlator {
    /// Engine variant.
    fn kind(&self) -> EngineKind;

    /// Configuration the engine was built with.
    fn config(&self) -> &CorrelationConfig;

    /// Trajectory being analysed.
    fn trajectory(&self) -> &Arc<dyn Trajectory>;

    /// Computes the correlation.
    fn compute(&self, cancel: &CancelToken) -> Result<Correlation, CorrError>;

    /// Derived quantities; relaxation times for time-dependent correlations.
    fn analyze(&self, correlation: &Correlation) -> Option<RelaxationRecord> {
        correlation.as_dynamic().map(extract_relaxation)
    }

    /// Builds the report of a computed correlation.
    fn report(
        &self,
        correlation: Correlation,
        relaxation: Option<RelaxationRecord>,
    ) -> Result<CorrelationReport, CorrError> {
        let trajectory = self.trajectory();
        let provenance = RunProvenance::now(
            stable_hash_string(self.config())?,
            trajectory.label(),
            trajectory.len(),
            self.config().seed,
        );
        CorrelationReport::new(self.kind(), correlation, relaxation, provenance)
    }

    /// Writes tables and report to `target`.
    fn write(
        &self,
        correlation: &Correlation,
        relaxation: Option<&RelaxationRecord>,
        target: &OutputTarget,
    ) -> Result<Vec<PathBuf>, CorrError> {
        let report = self.report(correlation.clone(), relaxation.cloned())?;
        write_report(&report, target)
    }
}

impl Correlator for SelfScattering {
    fn kind(&self) -> EngineKind {
        EngineKind::SelfScattering
    }

    fn config(&self) -> &CorrelationConfig {
        SelfScattering::config(self)
    }

    fn trajectory(&self) -> &Arc<dyn Trajectory> {
        SelfScattering::trajectory(self)
    }

    fn compute(&self, cancel: &CancelToken) -> Result<Correlation, CorrError> {
        SelfScattering::compute(self, cancel).map(Correlation::Dynamic)
    }
}

impl Correlator for CollectiveScattering {
    fn kind(&self) -> EngineKind {
        EngineKind::Collective
    }

    fn config(&self) -> &CorrelationConfig {
        CollectiveScattering::config(self)
    }

    fn trajectory(&self) -> &Arc<dyn Trajectory> {
        CollectiveScattering::trajectory(self)
    }

    fn compute(&self, cancel: &CancelToken) -> Result<Correlation, CorrError> {
        CollectiveScattering::compute(self, cancel).map(Correlation::Dynamic)
    }
}

impl Correlator for StructureFactor {
    fn kind(&self) -> EngineKind {
        EngineKind::StructureFactor
    }

    fn config(&self) -> &CorrelationConfig {
        StructureFactor::config(self)
    }

    fn trajectory(&self) -> &Arc<dyn Trajectory> {
        StructureFactor::trajectory(self)
    }

    fn compute(&self, cancel: &CancelToken) -> Result<Correlation, CorrError> {
        StructureFactor::compute(self, cancel).map(Correlation::Static)
    }
}

impl Correlator for StructureFactorOptimized {
    fn kind(&self) -> EngineKind {
        EngineKind::StructureFactorOptimized
    }

    fn config(&self) -> &CorrelationConfig {
        self.base().config()
    }

    fn trajectory(&self) -> &Arc<dyn Trajectory> {
        self.base().trajectory()
    }

    fn compute(&self, cancel: &CancelToken) -> Result<Correlation, CorrError> {
        StructureFactorOptimized::compute(self, cancel).map(Correlation::Static)
    }
}

/// Engine selected at runtime.
pub enum Engine {
    /// F_s(k,t).
    SelfScattering(SelfScattering),
    /// F(k,t).
    Collective(CollectiveScattering),
    /// S(k), reference reduction.
    StructureFactor(StructureFactor),
    /// S(k), native kernel reduction.
    StructureFactorOptimized(StructureFactorOptimized),
}

impl Engine {
    fn inner(&self) -> &dyn Correlator {
        match self {
            Engine::SelfScattering(engine) => engine,
            Engine::Collective(engine) => engine,
            Engine::StructureFactor(engine) => engine,
            Engine::StructureFactorOptimized(engine) => engine,
        }
    }
}

impl Correlator for Engine {
    fn kind(&self) -> EngineKind {
        self.inner().kind()
    }

    fn config(&self) -> &CorrelationConfig {
        self.inner().config()
    }

    fn trajectory(&self) -> &Arc<dyn Trajectory> {
        self.inner().trajectory()
    }

    fn compute(&self, cancel: &CancelToken) -> Result<Correlation, CorrError> {
        self.inner().compute(cancel)
    }

    fn analyze(&self, correlation: &Correlation) -> Option<RelaxationRecord> {
        self.inner().analyze(correlation)
    }
}

/// Builds the engine of `kind`.
///
/// `field` is only accepted by the reference structure factor; `kernel` is
/// required by the optimized one and ignored otherwise.
pub fn build_engine(
    kind: EngineKind,
    trajectory: Arc<dyn Trajectory>,
    config: &CorrelationConfig,
    field: Option<ScalarField>,
    kernel: Option<Arc<dyn NativeKernel>>,
) -> Result<Engine, CorrError> {
    if field.is_some() && kind.is_dynamic() {
        return Err(CorrError::config(
            "field-unsupported",
            "scalar fields only weight the structure factor",
        ));
    }
    let engine = match kind {
        EngineKind::SelfScattering => Engine::SelfScattering(SelfScattering::new(trajectory, config)?),
        EngineKind::Collective => Engine::Collective(CollectiveScattering::new(trajectory, config)?),
        EngineKind::StructureFactor => {
            Engine::StructureFactor(StructureFactor::new(trajectory, config, field)?)
        }
        EngineKind::StructureFactorOptimized => Engine::StructureFactorOptimized(
            StructureFactorOptimized::new(trajectory, config, field, kernel)?,
        ),
    };
    Ok(engine)
}

/// Outcome of [`run_engine`].
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Output was newer than the trajectory and update mode was on.
    Skipped {
        /// Existing output file.
        path: PathBuf,
    },
    /// Correlation computed and written.
    Completed {
        /// Written report.
        report: Box<CorrelationReport>,
        /// Written files.
        paths: Vec<PathBuf>,
    },
}

/// Computes, analyses and writes one engine's correlation.
pub fn run_engine(
    engine: &dyn Correlator,
    cancel: &CancelToken,
    target: &OutputTarget,
) -> Result<RunOutcome, CorrError> {
    let path = target.path(engine.kind().symbol());
    if engine.config().output.update && is_up_to_date(engine.trajectory().source(), &path) {
        tracing::info!(path = %path.display(), "output is up to date, skipping");
        return Ok(RunOutcome::Skipped { path });
    }
    tracing::info!(engine = engine.kind().symbol(), trajectory = %engine.trajectory().label(), "starting correlation");
    let correlation = engine.compute(cancel)?;
    let relaxation = engine.analyze(&correlation);
    let report = engine.report(correlation, relaxation)?;
    let paths = write_report(&report, target)?;
    Ok(RunOutcome::Completed {
        report: Box::new(report),
        paths,
    })
}
