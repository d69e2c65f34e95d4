use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use kcorr_core::filter::{FilterPair, ParticleFilter};
use kcorr_core::trajectory::{InMemoryTrajectory, Trajectory};
use kcorr_core::{CancelToken, ScalarField};
use kcorr_fourier::{
    build_engine, default_kernel, run_engine, CorrelationConfig, EngineKind, OutputTarget,
    RunOutcome,
};
use serde::Deserialize;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Trajectory JSON files to analyse.
    #[arg(required = true)]
    pub trajectories: Vec<PathBuf>,
    /// YAML or JSON configuration; engine defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Output directory; defaults to the directory of each trajectory.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Comma separated shell radii.
    #[arg(long, value_delimiter = ',')]
    pub radii: Vec<f64>,
    /// Comma separated lag times.
    #[arg(long, value_delimiter = ',')]
    pub times: Vec<f64>,
    /// Maximum number of wave vectors per shell.
    #[arg(long)]
    pub nk: Option<usize>,
    /// Approximate number of time origins (frames for S(k)).
    #[arg(long)]
    pub norigins: Option<usize>,
    /// Species of the first body.
    #[arg(long)]
    pub species: Option<u32>,
    /// Species of the second body, for cross correlations.
    #[arg(long)]
    pub species_b: Option<u32>,
    /// Seed for wave-vector decimation.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Dedicated worker threads.
    #[arg(long)]
    pub threads: Option<usize>,
    /// JSON scalar field weighting S(k).
    #[arg(long)]
    pub field: Option<PathBuf>,
    /// Reduce S(k) with the native kernel.
    #[arg(long)]
    pub optimized: bool,
    /// Tag appended to output file names.
    #[arg(long)]
    pub tag: Option<String>,
    /// Skip trajectories whose output is newer than the input.
    #[arg(long)]
    pub update: bool,
}

#[derive(Debug, Deserialize)]
struct FieldFile {
    name: String,
    steps: Vec<i64>,
    values: Vec<Vec<f64>>,
}

fn load_field(path: &Path) -> Result<ScalarField, Box<dyn Error>> {
    let file: FieldFile = serde_json::from_slice(&fs::read(path)?)?;
    Ok(ScalarField::centered(file.name, file.steps, file.values)?)
}

fn engine_kind(kind: EngineKind, optimized: bool) -> Result<EngineKind, Box<dyn Error>> {
    match (kind, optimized) {
        (EngineKind::StructureFactor, true) => Ok(EngineKind::StructureFactorOptimized),
        (kind, false) => Ok(kind),
        (kind, true) => Err(format!("--optimized only applies to sk, not {}", kind.symbol()).into()),
    }
}

fn configure(kind: EngineKind, args: &AnalyzeArgs) -> Result<CorrelationConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => CorrelationConfig::from_path(path)?,
        None => CorrelationConfig::new(kind),
    };
    config.engine = kind;
    if !args.radii.is_empty() {
        config.shells.radii = Some(args.radii.clone());
    }
    if !args.times.is_empty() {
        config.times.times = Some(args.times.clone());
    }
    config.shells.nk = args.nk.or(config.shells.nk);
    config.norigins = args.norigins.or(config.norigins);
    config.seed = args.seed.unwrap_or(config.seed);
    config.threads = args.threads.or(config.threads);
    if let Some(id) = args.species {
        config.filters = FilterPair::single(ParticleFilter::Species { id });
    }
    if let Some(id) = args.species_b {
        config.filters.second = Some(ParticleFilter::Species { id });
    }
    config.output.update |= args.update;
    if args.tag.is_some() {
        config.output.tag = args.tag.clone();
    }
    config.validate()?;
    Ok(config)
}

fn default_tag(config: &CorrelationConfig, field: Option<&ScalarField>) -> Option<String> {
    let parts: Vec<String> = [Some(config.filters.tag()), field.map(|field| field.name().to_string())]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join("."))
}

pub fn run(kind: EngineKind, args: &AnalyzeArgs) -> Result<(), Box<dyn Error>> {
    let kind = engine_kind(kind, args.optimized)?;
    let mut config = configure(kind, args)?;
    let field = args.field.as_deref().map(load_field).transpose()?;
    if config.output.tag.is_none() {
        config.output.tag = default_tag(&config, field.as_ref());
    }
    let kernel = match kind {
        EngineKind::StructureFactorOptimized => default_kernel(),
        _ => None,
    };
    let cancel = CancelToken::new();

    for path in &args.trajectories {
        let trajectory: Arc<dyn Trajectory> = Arc::new(InMemoryTrajectory::from_json_path(path)?);
        let engine = build_engine(kind, trajectory.clone(), &config, field.clone(), kernel.clone())?;
        let directory = args
            .out
            .clone()
            .or_else(|| path.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let target = OutputTarget::for_trajectory(directory, trajectory.as_ref(), &config.output);
        match run_engine(&engine, &cancel, &target)? {
            RunOutcome::Skipped { path } => {
                tracing::info!(path = %path.display(), "skipped, output is current");
            }
            RunOutcome::Completed { report, paths } => {
                for written in &paths {
                    println!("{}", written.display());
                }
                tracing::debug!(hash = %report.analysis_hash, "report written");
            }
        }
    }
    Ok(())
}
