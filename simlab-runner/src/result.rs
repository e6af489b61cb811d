//! Result of a single backtest: records, summary and verification report.

use crate::config::RunSpec;
use crate::metrics::SummaryStats;
use crate::records::{EquityRecord, TradeRecord};
use crate::verify::{Coverage, VerificationReport};
use simlab_core::domain::DatasetHash;
use simlab_core::engine::Rejection;
use simlab_core::fingerprint::RunDigest;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub spec: RunSpec,
    pub spec_hash: String,
    pub dataset_hash: DatasetHash,
    /// Hash of fills and equity samples; equal digests mean identical runs.
    pub digest: RunDigest,
    pub bars_processed: usize,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityRecord>,
    pub rejections: Vec<Rejection>,
    pub summary: SummaryStats,
    pub coverage: Coverage,
    pub report: VerificationReport,
}
