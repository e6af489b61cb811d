//! Truncation replay: a behavioural look-ahead detector.
//!
//! A strategy that only uses past data makes the same decisions whether or
//! not the future exists. Re-run over prefixes of the tape and require each
//! truncated run to reproduce the full run's fills up to the cut exactly.

use serde::{Deserialize, Serialize};
use simlab_core::data::VecSequencer;
use simlab_core::domain::{Bar, Fill};
use simlab_core::engine::{BacktestDriver, DriverConfig, EngineError};
use simlab_core::strategy::StrategyLogic;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    /// Timestamp of the last bar kept in the truncated run.
    pub cut_timestamp: i64,
    pub full_run_fills: usize,
    pub truncated_run_fills: usize,
    pub first_mismatch_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruncationOutcome {
    pub cuts_checked: usize,
    /// First cut at which the runs disagreed.
    pub divergence: Option<Divergence>,
}

/// Prefix lengths to test, snapped forward so a cut never splits the bars
/// that share a timestamp.
fn cut_points(bars: &[Bar], cuts: usize) -> Vec<usize> {
    let len = bars.len();
    let mut points: Vec<usize> = (1..=cuts)
        .map(|k| k * len / (cuts + 1))
        .filter(|&c| c > 0)
        .map(|mut c| {
            while c < len && bars[c].timestamp == bars[c - 1].timestamp {
                c += 1;
            }
            c
        })
        .filter(|&c| c < len)
        .collect();
    points.dedup();
    points
}

pub fn truncation_replay<L: StrategyLogic>(
    config: &DriverConfig,
    bars: &[Bar],
    strategy: L,
    full_fills: &[Fill],
    cuts: usize,
) -> Result<TruncationOutcome, EngineError> {
    let points = cut_points(bars, cuts);
    for (checked, &cut) in points.iter().enumerate() {
        let cut_timestamp = bars[cut - 1].timestamp;
        let mut driver = BacktestDriver::new(
            config.clone(),
            VecSequencer::new(bars[..cut].to_vec()),
            &strategy,
        )?;
        let truncated = driver.run()?.fills;
        let expected: Vec<&Fill> = full_fills
            .iter()
            .filter(|f| f.timestamp <= cut_timestamp)
            .collect();

        let mismatch = expected
            .iter()
            .zip(&truncated)
            .position(|(a, b)| *a != b)
            .or_else(|| (expected.len() != truncated.len()).then(|| expected.len().min(truncated.len())));

        debug!(cut, cut_timestamp, fills = truncated.len(), "truncation replay cut");
        if let Some(first_mismatch_index) = mismatch {
            return Ok(TruncationOutcome {
                cuts_checked: checked + 1,
                divergence: Some(Divergence {
                    cut_timestamp,
                    full_run_fills: expected.len(),
                    truncated_run_fills: truncated.len(),
                    first_mismatch_index,
                }),
            });
        }
    }
    Ok(TruncationOutcome {
        cuts_checked: points.len(),
        divergence: None,
    })
}
