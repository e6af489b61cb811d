//! Artifact manager for persisting and re-reading run outputs.
//!
//! Layout of a run directory:
//! `trades.csv`, `equity_curve.csv`, `rejections.json`, `summary.json`,
//! `verification_report.json`, `manifest.json`.

mod equity;
mod manifest;
mod trades;

use crate::metrics::SummaryStats;
use crate::records::{EquityRecord, TradeRecord};
use crate::result::BacktestResult;
use crate::verify::{VerificationInput, VerificationReport};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub use manifest::RunManifest;

pub const TRADES_FILE: &str = "trades.csv";
pub const EQUITY_FILE: &str = "equity_curve.csv";
pub const REJECTIONS_FILE: &str = "rejections.json";
pub const SUMMARY_FILE: &str = "summary.json";
pub const REPORT_FILE: &str = "verification_report.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Artifact paths returned after export.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub trades_csv: PathBuf,
    pub equity_csv: PathBuf,
    pub rejections_json: PathBuf,
    pub summary_json: PathBuf,
    pub report_json: PathBuf,
    pub manifest: PathBuf,
}

/// Run outputs read back from disk. Missing or unreadable pieces stay
/// empty so the verifier can report them; parse failures are kept in
/// `load_errors`.
#[derive(Debug, Clone, Default)]
pub struct LoadedRun {
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityRecord>,
    pub summary: Option<SummaryStats>,
    pub manifest: Option<RunManifest>,
    pub load_errors: Vec<String>,
}

impl LoadedRun {
    pub fn verification_input(&self) -> VerificationInput<'_> {
        VerificationInput {
            summary: self.summary.as_ref(),
            trades: &self.trades,
            equity: &self.equity_curve,
            coverage: self.manifest.as_ref().map(|m| &m.coverage),
            truncation: None,
            load_errors: &self.load_errors,
        }
    }
}

/// Manages writing all artifacts for a run.
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    output_dir: PathBuf,
}

impl ArtifactManager {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .context("Failed to create artifact output directory")?;
        Ok(Self { output_dir })
    }

    /// Open an existing run directory for reading.
    pub fn open(dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.output_dir
    }

    /// Save complete run artifacts.
    pub fn save_run(&self, result: &BacktestResult) -> Result<ArtifactPaths> {
        let paths = ArtifactPaths {
            trades_csv: self.output_dir.join(TRADES_FILE),
            equity_csv: self.output_dir.join(EQUITY_FILE),
            rejections_json: self.output_dir.join(REJECTIONS_FILE),
            summary_json: self.output_dir.join(SUMMARY_FILE),
            report_json: self.output_dir.join(REPORT_FILE),
            manifest: self.output_dir.join(MANIFEST_FILE),
        };

        trades::write_trades_csv(&paths.trades_csv, &result.trades)?;
        equity::write_equity_csv(&paths.equity_csv, &result.equity_curve)?;
        manifest::write_json(&paths.rejections_json, &result.rejections, "rejections")?;
        manifest::write_json(&paths.summary_json, &result.summary, "summary")?;
        self.write_report(&result.report)?;
        manifest::write_json(
            &paths.manifest,
            &RunManifest::from_result(result),
            "run manifest",
        )?;

        info!(dir = %self.output_dir.display(), "artifacts written");
        Ok(paths)
    }

    pub fn write_report(&self, report: &VerificationReport) -> Result<PathBuf> {
        let path = self.output_dir.join(REPORT_FILE);
        manifest::write_json(&path, report, "verification report")?;
        Ok(path)
    }

    /// Read trades, equity, summary and manifest back from the directory.
    ///
    /// Never fails: a file that cannot be parsed loads as empty and its
    /// error is recorded in [`LoadedRun::load_errors`].
    pub fn load_run(&self) -> LoadedRun {
        let mut load_errors = Vec::new();
        let trades_path = self.output_dir.join(TRADES_FILE);
        let equity_path = self.output_dir.join(EQUITY_FILE);

        let trades = if trades_path.exists() {
            recover(trades::read_trades_csv(&trades_path), TRADES_FILE, &mut load_errors)
        } else {
            None
        };
        let equity_curve = if equity_path.exists() {
            recover(equity::read_equity_csv(&equity_path), EQUITY_FILE, &mut load_errors)
        } else {
            None
        };
        let summary = recover(
            manifest::read_json_if_present(&self.output_dir.join(SUMMARY_FILE), "summary"),
            SUMMARY_FILE,
            &mut load_errors,
        );
        let manifest = recover(
            manifest::read_json_if_present(&self.output_dir.join(MANIFEST_FILE), "run manifest"),
            MANIFEST_FILE,
            &mut load_errors,
        );

        LoadedRun {
            trades: trades.unwrap_or_default(),
            equity_curve: equity_curve.unwrap_or_default(),
            summary: summary.flatten(),
            manifest: manifest.flatten(),
            load_errors,
        }
    }
}

fn recover<T>(result: Result<T>, file: &str, errors: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(file, error = %format!("{e:#}"), "unreadable artifact");
            errors.push(format!("{file}: {e:#}"));
            None
        }
    }
}
