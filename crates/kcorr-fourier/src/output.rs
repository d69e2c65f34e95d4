//! Text tables and JSON reports written for a correlation run.

use std::fs;
use std::path::{Path, PathBuf};

use kcorr_core::errors::{CorrError, ErrorInfo};
use kcorr_core::hash::stable_hash_string;
use kcorr_core::provenance::{RunProvenance, SchemaVersion};
use kcorr_core::serde::to_canonical_json_bytes;
use kcorr_core::trajectory::Trajectory;
use serde::{Deserialize, Serialize};

use crate::config::{EngineKind, OutputConfig};
use crate::curve::{Correlation, DynamicCurve, StaticCurve};
use crate::tau::RelaxationRecord;

fn io_error(code: &str, path: &Path, err: impl ToString) -> CorrError {
    CorrError::Io(ErrorInfo::new(code, err.to_string()).with_context("path", path.display()))
}

/// Location and naming of the artefacts of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// Directory receiving the files.
    pub directory: PathBuf,
    /// Stem shared by every file, usually the trajectory file name.
    pub stem: String,
    /// Prefix inserted before the engine symbol.
    pub prefix: String,
    /// Optional trailing tag.
    pub tag: Option<String>,
}

impl OutputTarget {
    /// Target named after the trajectory source, or its label when in memory.
    pub fn for_trajectory(directory: impl Into<PathBuf>, trajectory: &dyn Trajectory, output: &OutputConfig) -> Self {
        let stem = trajectory
            .source()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| trajectory.label());
        Self {
            directory: directory.into(),
            stem,
            prefix: output.prefix.clone(),
            tag: output.tag.clone(),
        }
    }

    /// `<directory>/<stem>.<prefix>.<symbol>[.<tag>]`.
    pub fn path(&self, symbol: &str) -> PathBuf {
        let mut name = format!("{}.{}.{}", self.stem, self.prefix, symbol);
        if let Some(tag) = &self.tag {
            name.push('.');
            name.push_str(tag);
        }
        self.directory.join(name)
    }

    /// Path of the relaxation-time table for `symbol`.
    pub fn tau_path(&self, symbol: &str) -> PathBuf {
        with_suffix(self.path(symbol), "tau")
    }

    /// Path of the JSON report for `symbol`.
    pub fn report_path(&self, symbol: &str) -> PathBuf {
        with_suffix(self.path(symbol), "json")
    }
}

fn with_suffix(path: PathBuf, suffix: &str) -> PathBuf {
    let mut raw = path.into_os_string();
    raw.push(".");
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Returns true when `output` exists and is not older than `source`.
///
/// Without a source on disk the output is never considered current.
pub fn is_up_to_date(source: Option<&Path>, output: &Path) -> bool {
    let Some(source) = source else {
        return false;
    };
    let modified = |path: &Path| fs::metadata(path).and_then(|meta| meta.modified()).ok();
    match (modified(source), modified(output)) {
        (Some(source), Some(output)) => output >= source,
        _ => false,
    }
}

/// Renders a time-dependent curve as `k t value` rows, one block per shell.
pub fn render_dynamic(kind: EngineKind, curve: &DynamicCurve) -> String {
    let mut out = header(kind.title(), &format!("k, t, {}", value_label(kind)));
    for (index, shell) in curve.shells.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        if !shell.normalized {
            out.push_str(&format!(
                "# k = {}: lag-zero value degenerate, unnormalized\n",
                shell.norm
            ));
        }
        for (time, value) in shell.times.iter().zip(&shell.values) {
            out.push_str(&format!("{} {} {}\n", shell.norm, time, value));
        }
    }
    out
}

/// Renders relaxation times; shells without a crossing only list `k`.
pub fn render_relaxation(record: &RelaxationRecord) -> String {
    let mut out = header("relaxation times tau", "k, tau");
    for entry in &record.entries {
        let row = match entry.tau {
            Some(tau) => format!("{} {}\n", entry.norm, tau),
            None => format!("{}\n", entry.norm),
        };
        out.push_str(&row);
    }
    out
}

/// Renders a static curve as `k value` rows.
pub fn render_static(kind: EngineKind, curve: &StaticCurve) -> String {
    let mut out = header(kind.title(), &format!("k, {}", value_label(kind)));
    for point in &curve.points {
        out.push_str(&format!("{} {}\n", point.norm, point.value));
    }
    out
}

fn header(title: &str, columns: &str) -> String {
    format!("# title: {title}\n# columns: {columns}\n")
}

fn value_label(kind: EngineKind) -> &'static str {
    match kind {
        EngineKind::SelfScattering => "F_s(k,t)",
        EngineKind::Collective => "F(k,t)",
        EngineKind::StructureFactor | EngineKind::StructureFactorOptimized => "S(k)",
    }
}

/// Content-addressed JSON artefact of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    /// Schema of this payload.
    pub schema: SchemaVersion,
    /// Engine that produced the data.
    pub kind: EngineKind,
    /// Hash over kind, correlation and relaxation times.
    pub analysis_hash: String,
    /// Run metadata.
    pub provenance: RunProvenance,
    /// Computed correlation.
    pub correlation: Correlation,
    /// Relaxation times of time-dependent correlations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relaxation: Option<RelaxationRecord>,
}

#[derive(Serialize)]
struct HashedContent<'a> {
    kind: EngineKind,
    correlation: &'a Correlation,
    relaxation: Option<&'a RelaxationRecord>,
}

impl CorrelationReport {
    /// Builds the report and computes its content hash.
    pub fn new(
        kind: EngineKind,
        correlation: Correlation,
        relaxation: Option<RelaxationRecord>,
        provenance: RunProvenance,
    ) -> Result<Self, CorrError> {
        let analysis_hash = stable_hash_string(&HashedContent {
            kind,
            correlation: &correlation,
            relaxation: relaxation.as_ref(),
        })?;
        Ok(Self {
            schema: SchemaVersion::default(),
            kind,
            analysis_hash,
            provenance,
            correlation,
            relaxation,
        })
    }
}

/// Writes the text tables and the JSON report; returns the written paths.
pub fn write_report(report: &CorrelationReport, target: &OutputTarget) -> Result<Vec<PathBuf>, CorrError> {
    fs::create_dir_all(&target.directory)
        .map_err(|err| io_error("output-dir", &target.directory, err))?;
    let symbol = report.kind.symbol();
    let mut written = Vec::new();

    let table = match &report.correlation {
        Correlation::Dynamic(curve) => render_dynamic(report.kind, curve),
        Correlation::Static(curve) => render_static(report.kind, curve),
    };
    let path = target.path(symbol);
    fs::write(&path, table).map_err(|err| io_error("output-write", &path, err))?;
    written.push(path);

    if let Some(record) = &report.relaxation {
        let path = target.tau_path(symbol);
        fs::write(&path, render_relaxation(record)).map_err(|err| io_error("output-write", &path, err))?;
        written.push(path);
    }

    let path = target.report_path(symbol);
    fs::write(&path, to_canonical_json_bytes(report)?).map_err(|err| io_error("output-write", &path, err))?;
    written.push(path);

    tracing::info!(files = written.len(), directory = %target.directory.display(), "artefacts written");
    Ok(written)
}
