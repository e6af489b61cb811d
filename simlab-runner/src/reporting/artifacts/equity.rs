//! Equity curve export (CSV).

use crate::records::EquityRecord;
use anyhow::{Context, Result};
use std::path::Path;

pub fn write_equity_csv(path: &Path, equity: &[EquityRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create equity CSV {}", path.display()))?;
    for sample in equity {
        writer.serialize(sample).context("Failed to write equity row")?;
    }
    writer.flush().context("Failed to flush equity CSV")?;
    Ok(())
}

pub fn read_equity_csv(path: &Path) -> Result<Vec<EquityRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open equity CSV {}", path.display()))?;
    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("Malformed equity row {}", i + 1)))
        .collect()
}
