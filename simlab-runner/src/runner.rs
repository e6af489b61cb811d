//! Backtest orchestration: run, verify, batch, replay.

use crate::config::{ConfigError, RunSpec};
use crate::metrics::SummaryStats;
use crate::records::{EquityRecord, TradeRecord};
use crate::result::BacktestResult;
use crate::verify::{truncation_replay, Coverage, VerificationInput, Verifier};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use simlab_core::data::{load_bars, DataError, VecSequencer};
use simlab_core::domain::Bar;
use simlab_core::engine::{BacktestDriver, EngineError};
use simlab_core::fingerprint::{dataset_hash, run_digest, RunDigest};
use simlab_core::strategy::StrategyLogic;
use std::path::Path;
use thiserror::Error;
use tracing::{info, info_span, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("replay needs at least two runs, got {0}")]
    TooFewReplays(usize),
}

/// Load a bar tape from Parquet or CSV. Order is preserved; the engine
/// rejects tapes whose timestamps go backwards.
pub fn load_market_data(path: &Path) -> Result<Vec<Bar>, RunError> {
    Ok(load_bars(path)?)
}

/// Run one backtest over `bars` and verify its output.
pub fn run_backtest(spec: &RunSpec, bars: &[Bar]) -> Result<BacktestResult, RunError> {
    spec.validate()?;
    let spec_hash = spec.spec_hash()?;
    let span = info_span!("backtest", strategy = spec.strategy.name(), seed = spec.seed);
    let _guard = span.enter();

    let config = spec.driver_config();
    let mut driver = BacktestDriver::new(
        config.clone(),
        VecSequencer::new(bars.to_vec()),
        &spec.strategy,
    )?;
    let output = driver.run()?;

    let trades: Vec<TradeRecord> = output.fills.iter().map(TradeRecord::from).collect();
    let equity_curve: Vec<EquityRecord> =
        output.equity_curve.iter().map(EquityRecord::from).collect();
    let summary = SummaryStats::compute(
        output.initial_cash,
        output.portfolio.realized_pnl(),
        &trades,
        &equity_curve,
        output.rejections.len(),
        output.fill_timing,
    );
    let coverage = Coverage {
        universe: spec.universe.clone(),
        spans: output.symbol_spans.clone(),
    };

    let truncation = if spec.verification.truncation_replay {
        Some(truncation_replay(
            &config,
            bars,
            &spec.strategy,
            &output.fills,
            spec.verification.truncation_cuts,
        )?)
    } else {
        None
    };

    let verifier = Verifier::new(spec.policy.clone(), spec.verification.clone());
    let report = verifier.verify(&VerificationInput {
        summary: Some(&summary),
        trades: &trades,
        equity: &equity_curve,
        coverage: Some(&coverage),
        truncation: truncation.as_ref(),
        load_errors: &[],
    });
    if !report.passed {
        warn!(issues = report.issues().count(), "run failed verification");
    }

    let digest = run_digest(&output.fills, &output.equity_curve);
    info!(
        digest = %digest.0,
        trades = trades.len(),
        total_return = summary.total_return,
        sharpe = summary.sharpe_ratio,
        max_drawdown = summary.max_drawdown,
        "run complete"
    );

    Ok(BacktestResult {
        spec: spec.clone(),
        spec_hash,
        dataset_hash: dataset_hash(bars),
        digest,
        bars_processed: output.bars_processed,
        trades,
        equity_curve,
        rejections: output.rejections,
        summary,
        coverage,
        report,
    })
}

/// Run many specs over the same tape in parallel. Results come back in
/// input order and equal what a sequential loop would produce.
pub fn run_batch(specs: &[RunSpec], bars: &[Bar]) -> Vec<Result<BacktestResult, RunError>> {
    info!(runs = specs.len(), "batch started");
    specs
        .par_iter()
        .map(|spec| run_backtest(spec, bars))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayOutcome {
    pub digests: Vec<RunDigest>,
    pub deterministic: bool,
}

/// Execute the same spec `runs` times and compare output digests.
pub fn replay(spec: &RunSpec, bars: &[Bar], runs: usize) -> Result<ReplayOutcome, RunError> {
    if runs < 2 {
        return Err(RunError::TooFewReplays(runs));
    }
    let digests = (0..runs)
        .map(|_| run_backtest(spec, bars).map(|r| r.digest))
        .collect::<Result<Vec<_>, _>>()?;
    let deterministic = digests.windows(2).all(|w| w[0] == w[1]);
    if deterministic {
        info!(runs, digest = %digests[0].0, "replay deterministic");
    } else {
        warn!(runs, "replay produced differing digests");
    }
    Ok(ReplayOutcome {
        digests,
        deterministic,
    })
}
