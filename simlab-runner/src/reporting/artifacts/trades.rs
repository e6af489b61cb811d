//! Trade log export (CSV).

use crate::records::TradeRecord;
use anyhow::{Context, Result};
use std::path::Path;

pub fn write_trades_csv(path: &Path, trades: &[TradeRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create trades CSV {}", path.display()))?;
    for trade in trades {
        writer.serialize(trade).context("Failed to write trade row")?;
    }
    writer.flush().context("Failed to flush trades CSV")?;
    Ok(())
}

pub fn read_trades_csv(path: &Path) -> Result<Vec<TradeRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open trades CSV {}", path.display()))?;
    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("Malformed trade row {}", i + 1)))
        .collect()
}
