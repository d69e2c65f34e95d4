use std::fs;
use std::path::Path;

use kcorr_core::errors::{CorrError, ErrorInfo};
use kcorr_core::filter::FilterPair;
use kcorr_core::trajectory::Trajectory;
use serde::{Deserialize, Serialize};

use crate::grid::{linear_grid, log_grid};

fn config_error(code: &str, message: impl Into<String>) -> CorrError {
    CorrError::Config(ErrorInfo::new(code, message))
}

/// Correlation computed by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    /// Self intermediate scattering function F_s(k,t).
    SelfScattering,
    /// Collective intermediate scattering function F(k,t).
    Collective,
    /// Static structure factor S(k), reference reduction.
    StructureFactor,
    /// Static structure factor S(k) reduced by a native kernel.
    StructureFactorOptimized,
}

impl EngineKind {
    /// Short symbol used in output file names.
    pub fn symbol(&self) -> &'static str {
        match self {
            EngineKind::SelfScattering => "fskt",
            EngineKind::Collective => "fkt",
            EngineKind::StructureFactor | EngineKind::StructureFactorOptimized => "sk",
        }
    }

    /// Human readable title written in output headers.
    pub fn title(&self) -> &'static str {
        match self {
            EngineKind::SelfScattering => "self intermediate scattering function",
            EngineKind::Collective => "intermediate scattering function",
            EngineKind::StructureFactor | EngineKind::StructureFactorOptimized => {
                "structure factor"
            }
        }
    }

    /// Returns true for time-dependent correlations.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, EngineKind::SelfScattering | EngineKind::Collective)
    }

    fn shell_defaults(&self) -> ShellDefaults {
        match self {
            EngineKind::SelfScattering => ShellDefaults {
                kmin: Some(1.0),
                kmax: 10.0,
                ksamples: 10,
                nk: 8,
            },
            EngineKind::Collective => ShellDefaults {
                kmin: Some(1.0),
                kmax: 10.0,
                ksamples: 10,
                nk: 100,
            },
            EngineKind::StructureFactor | EngineKind::StructureFactorOptimized => ShellDefaults {
                kmin: None,
                kmax: 15.0,
                ksamples: 30,
                nk: 20,
            },
        }
    }
}

struct ShellDefaults {
    kmin: Option<f64>,
    kmax: f64,
    ksamples: usize,
    nk: usize,
}

/// Shell radii and sampling budget. Unset fields take per-engine defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellSpec {
    /// Explicit shell radii; overrides `kmin`, `kmax` and `ksamples`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radii: Option<Vec<f64>>,
    /// Smallest radius; defaults to the smallest fundamental wave number for S(k).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kmin: Option<f64>,
    /// Largest radius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kmax: Option<f64>,
    /// Number of radii between `kmin` and `kmax`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ksamples: Option<usize>,
    /// Shell half-width.
    #[serde(default = "default_dk")]
    pub dk: f64,
    /// Maximum number of vectors kept per shell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nk: Option<usize>,
}

fn default_dk() -> f64 {
    0.1
}

impl Default for ShellSpec {
    fn default() -> Self {
        Self {
            radii: None,
            kmin: None,
            kmax: None,
            ksamples: None,
            dk: default_dk(),
            nk: None,
        }
    }
}

/// Radii and budget after defaults have been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedShells {
    /// Nominal shell radii.
    pub radii: Vec<f64>,
    /// Shell half-width.
    pub dk: f64,
    /// Maximum number of vectors per shell.
    pub nk: usize,
}

impl ShellSpec {
    /// Explicit radii with the default width.
    pub fn with_radii(radii: Vec<f64>) -> Self {
        Self {
            radii: Some(radii),
            ..Self::default()
        }
    }

    /// Applies the defaults of `kind` for a cell with fundamental wave vector `k0`.
    pub fn resolve(&self, kind: EngineKind, k0: [f64; 3]) -> Result<ResolvedShells, CorrError> {
        let defaults = kind.shell_defaults();
        let radii = match &self.radii {
            Some(radii) => radii.clone(),
            None => {
                let smallest = k0.iter().copied().fold(f64::INFINITY, f64::min);
                let kmin = self.kmin.or(defaults.kmin).unwrap_or(smallest);
                let kmax = self.kmax.unwrap_or(defaults.kmax);
                if kmax < kmin {
                    return Err(CorrError::Config(
                        ErrorInfo::new("invalid-shell-range", "kmax must not be below kmin")
                            .with_context("kmin", kmin)
                            .with_context("kmax", kmax),
                    ));
                }
                linear_grid(kmin, kmax, self.ksamples.unwrap_or(defaults.ksamples))
            }
        };
        let nk = self.nk.unwrap_or(defaults.nk);
        if nk == 0 {
            return Err(config_error("invalid-nk", "at least one vector per shell is required"));
        }
        Ok(ResolvedShells {
            radii,
            dk: self.dk,
            nk,
        })
    }
}

/// Requested lag times of the time-dependent engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSpec {
    /// Explicit physical times; lag zero is always added.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<Vec<f64>>,
    /// Number of logarithmically spaced default times.
    #[serde(default = "default_tsamples")]
    pub tsamples: usize,
    /// Fraction of the total trajectory time covered by default times.
    #[serde(default = "default_fraction")]
    pub fraction: f64,
}

fn default_tsamples() -> usize {
    60
}

fn default_fraction() -> f64 {
    0.75
}

impl Default for TimeSpec {
    fn default() -> Self {
        Self {
            times: None,
            tsamples: default_tsamples(),
            fraction: default_fraction(),
        }
    }
}

impl TimeSpec {
    /// Explicit times.
    pub fn with_times(times: Vec<f64>) -> Self {
        Self {
            times: Some(times),
            ..Self::default()
        }
    }

    /// Requested times for `kind` on `trajectory`, always starting at zero.
    pub fn resolve(&self, kind: EngineKind, trajectory: &dyn Trajectory) -> Vec<f64> {
        let mut times = match &self.times {
            Some(times) => times.clone(),
            None => {
                let horizon = self.fraction * trajectory.total_time();
                if horizon <= 0.0 {
                    Vec::new()
                } else if kind == EngineKind::SelfScattering {
                    log_grid(trajectory.timestep(), horizon, self.tsamples)
                } else {
                    log_grid(0.0, horizon, self.tsamples)
                }
            }
        };
        if !times.iter().any(|t| *t == 0.0) {
            times.insert(0, 0.0);
        }
        times
    }
}

/// Output naming and update policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Prefix inserted between the trajectory stem and the symbol.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Optional tag appended to the file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Skip the run when the output is newer than the trajectory.
    #[serde(default)]
    pub update: bool,
}

fn default_prefix() -> String {
    "pp".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            tag: None,
            update: false,
        }
    }
}

/// Complete configuration of one correlation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Engine to run.
    pub engine: EngineKind,
    /// Shell radii and budget.
    #[serde(default)]
    pub shells: ShellSpec,
    /// Requested lag times.
    #[serde(default)]
    pub times: TimeSpec,
    /// Approximate number of time origins (frames for S(k)).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub norigins: Option<usize>,
    /// Particles tabulated at once by the self engine.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    /// Species filters of the two bodies.
    #[serde(default)]
    pub filters: FilterPair,
    /// Master seed for wave-vector decimation.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Dedicated worker count; the global pool is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    /// Output naming.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_block_size() -> usize {
    20
}

fn default_seed() -> u64 {
    1
}

impl CorrelationConfig {
    /// Default configuration for `engine`.
    pub fn new(engine: EngineKind) -> Self {
        Self {
            engine,
            shells: ShellSpec::default(),
            times: TimeSpec::default(),
            norigins: None,
            block_size: default_block_size(),
            filters: FilterPair::default(),
            seed: default_seed(),
            threads: None,
            output: OutputConfig::default(),
        }
    }

    /// Parses a YAML (or JSON, which is valid YAML) document.
    pub fn from_yaml_str(contents: &str) -> Result<Self, CorrError> {
        let config: Self = serde_yaml::from_str(contents)
            .map_err(|err| CorrError::Serde(ErrorInfo::new("yaml_deserialize", err.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file; `.json` files go through `serde_json`.
    pub fn from_path(path: &Path) -> Result<Self, CorrError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            CorrError::Io(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            let config: Self = serde_json::from_str(&contents)
                .map_err(|err| CorrError::Serde(ErrorInfo::new("json_deserialize", err.to_string())))?;
            config.validate()?;
            Ok(config)
        } else {
            Self::from_yaml_str(&contents)
        }
    }

    /// Rejects settings no engine can run with.
    pub fn validate(&self) -> Result<(), CorrError> {
        if self.block_size == 0 {
            return Err(config_error("invalid-block-size", "block size must be positive"));
        }
        if self.threads == Some(0) {
            return Err(config_error("invalid-threads", "thread count must be positive"));
        }
        if self.times.tsamples == 0 {
            return Err(config_error("invalid-tsamples", "tsamples must be positive"));
        }
        if !(self.times.fraction.is_finite() && self.times.fraction > 0.0) {
            return Err(config_error("invalid-fraction", "time fraction must be positive"));
        }
        Ok(())
    }
}
