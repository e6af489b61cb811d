//! Run manifest export (JSON).

use crate::config::RunSpec;
use crate::result::{BacktestResult, SCHEMA_VERSION};
use crate::verify::Coverage;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use simlab_core::domain::DatasetHash;
use simlab_core::fingerprint::RunDigest;
use std::path::Path;

/// Identifies a run: what was asked for, on what data, and what came out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub spec_hash: String,
    pub dataset_hash: DatasetHash,
    pub run_digest: RunDigest,
    pub bars_processed: usize,
    pub coverage: Coverage,
    pub spec: RunSpec,
}

impl RunManifest {
    pub fn from_result(result: &BacktestResult) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            spec_hash: result.spec_hash.clone(),
            dataset_hash: result.dataset_hash.clone(),
            run_digest: result.digest.clone(),
            bars_processed: result.bars_processed,
            coverage: result.coverage.clone(),
            spec: result.spec.clone(),
        }
    }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {what}"))?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write {what} to {}", path.display()))?;
    Ok(())
}

/// Read a JSON artifact; a missing file is `None`, a malformed one an error.
pub fn read_json_if_present<T: serde::de::DeserializeOwned>(
    path: &Path,
    what: &str,
) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} from {}", path.display()))?;
    let value = serde_json::from_str(&text)
        .with_context(|| format!("Malformed {what} in {}", path.display()))?;
    Ok(Some(value))
}
