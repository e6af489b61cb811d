//! Individual verification rules. Each returns at most one finding.

use super::truncation::TruncationOutcome;
use super::report::{Finding, RuleId, Severity};
use super::{Coverage, VerificationInput};
use crate::metrics::{period_equity, sharpe_ratio, turnover, SamplingFrequency, SummaryStats};
use crate::records::{EquityRecord, TradeRecord};
use serde_json::json;
use std::collections::BTreeSet;

/// Delisted share of the universe above which survivorship is flagged.
const MISSING_SYMBOL_FRACTION: f64 = 0.05;
/// Traded share of the universe below which cherry-picking is suspected.
const TRADED_SYMBOL_FRACTION: f64 = 0.10;
const MIN_UNIVERSE_FOR_CHERRY_PICKING: usize = 10;

fn diverges(reported: f64, recomputed: f64, tol: f64) -> bool {
    let diff = (reported - recomputed).abs();
    // NaN on either side counts as divergence.
    !(diff <= tol * recomputed.abs().max(1.0))
}

#[derive(Debug, Clone, Copy)]
pub(super) struct Drawdown {
    pub depth: f64,
    pub peak_timestamp: i64,
    pub trough_timestamp: i64,
}

/// Metrics re-derived from the records, independent of the summary.
#[derive(Debug, Clone)]
pub(super) struct Recomputed {
    pub frequency: Option<SamplingFrequency>,
    pub sharpe: Option<f64>,
    pub drawdown: Option<Drawdown>,
    /// (leverage, timestamp) at the worst sample.
    pub peak_leverage: Option<(f64, i64)>,
    pub turnover: Option<f64>,
}

impl Recomputed {
    pub fn from_equity(equity: &[EquityRecord], trades: &[TradeRecord]) -> Self {
        let periods = period_equity(equity);
        let timestamps: Vec<i64> = periods.iter().map(|&(t, _)| t).collect();
        let values: Vec<f64> = periods.iter().map(|&(_, v)| v).collect();
        let frequency = SamplingFrequency::infer(&timestamps);
        let sharpe = frequency.map(|f| sharpe_ratio(&values, f.annualization_factor()));

        let peak_leverage = equity
            .iter()
            .map(|rec| (rec.leverage(), rec.timestamp))
            .filter(|(lev, _)| !lev.is_nan())
            .fold(None, |worst: Option<(f64, i64)>, (lev, ts)| match worst {
                Some((w, _)) if w >= lev => worst,
                _ => Some((lev, ts)),
            });

        Self {
            frequency,
            sharpe,
            drawdown: drawdown_scan(&periods),
            peak_leverage,
            turnover: (!values.is_empty()).then(|| turnover(trades, &values)),
        }
    }
}

fn drawdown_scan(periods: &[(i64, f64)]) -> Option<Drawdown> {
    let (&(t0, v0), rest) = periods.split_first()?;
    let mut peak = (t0, v0);
    let mut worst = Drawdown {
        depth: 0.0,
        peak_timestamp: t0,
        trough_timestamp: t0,
    };
    for &(t, v) in rest {
        if v > peak.1 {
            peak = (t, v);
            continue;
        }
        if peak.1 > 0.0 {
            let depth = (peak.1 - v) / peak.1;
            if depth > worst.depth {
                worst = Drawdown {
                    depth,
                    peak_timestamp: peak.0,
                    trough_timestamp: t,
                };
            }
        }
    }
    Some(worst)
}

// ── Data presence ──

pub(super) fn missing_data(input: &VerificationInput<'_>) -> Option<Finding> {
    let mut problems: Vec<String> = input
        .load_errors
        .iter()
        .map(|e| format!("unreadable artifact {e}"))
        .collect();

    if input.summary.is_none() {
        problems.push("summary statistics missing".into());
    }
    if input.equity.is_empty() {
        problems.push("equity curve is empty".into());
    }
    if let Some(s) = input.summary {
        if s.trade_count > 0 && input.trades.is_empty() {
            problems.push(format!(
                "trade log is empty but summary reports {} trades",
                s.trade_count
            ));
        }
    }

    let bad_equity = input
        .equity
        .iter()
        .filter(|e| {
            ![e.equity, e.cash, e.net_exposure, e.gross_exposure]
                .iter()
                .all(|v| v.is_finite())
        })
        .count();
    if bad_equity > 0 {
        problems.push(format!("{bad_equity} equity samples have non-finite values"));
    }
    let bad_trades = input
        .trades
        .iter()
        .filter(|t| {
            !(t.quantity.is_finite() && t.price.is_finite() && t.commission.is_finite())
                || t.quantity <= 0.0
        })
        .count();
    if bad_trades > 0 {
        problems.push(format!("{bad_trades} trades have invalid quantity, price or commission"));
    }

    if problems.is_empty() {
        return None;
    }
    Some(
        Finding::new(
            RuleId::MissingData,
            Severity::Critical,
            format!("incomplete or malformed run output: {}", problems.join("; ")),
        )
        .with("problems", problems),
    )
}

// ── Look-ahead and ordering ──

/// A fill leaks when its decision saw information newer than the price it
/// executed at: a later bar, or the close of the bar it filled at the open of.
fn leaked(t: &TradeRecord) -> bool {
    (t.decision_timestamp, t.decision_phase) > (t.timestamp, t.reference)
}

pub(super) fn temporal_leakage(trades: &[TradeRecord]) -> Option<Finding> {
    let leaks: Vec<&TradeRecord> = trades.iter().filter(|t| leaked(t)).collect();
    let first = leaks.first()?;
    let max_lead = leaks
        .iter()
        .map(|t| t.decision_timestamp - t.timestamp)
        .max()
        .unwrap_or_default();
    let same_bar = leaks
        .iter()
        .filter(|t| t.decision_timestamp == t.timestamp)
        .count();

    Some(
        Finding::new(
            RuleId::TemporalLeakage,
            Severity::Critical,
            format!(
                "{} fills executed before the data their decision used was available",
                leaks.len()
            ),
        )
        .with("count", leaks.len())
        .with("first_fill_timestamp", first.timestamp)
        .with("first_decision_timestamp", first.decision_timestamp)
        .with("first_decision_phase", first.decision_phase.as_str())
        .with("first_fill_reference", first.reference.as_str())
        .with("first_symbol", first.symbol.as_str())
        .with("max_lead_seconds", max_lead)
        .with("same_bar_count", same_bar),
    )
}

fn first_inversion(timestamps: impl Iterator<Item = i64>) -> (usize, Option<usize>) {
    let mut count = 0;
    let mut first = None;
    let mut prev: Option<i64> = None;
    for (i, ts) in timestamps.enumerate() {
        if let Some(p) = prev {
            if ts < p {
                count += 1;
                first.get_or_insert(i);
            }
        }
        prev = Some(ts);
    }
    (count, first)
}

pub(super) fn chronological_order(
    trades: &[TradeRecord],
    equity: &[EquityRecord],
) -> Option<Finding> {
    let (trade_inversions, first_trade) = first_inversion(trades.iter().map(|t| t.timestamp));
    let (equity_inversions, first_equity) = first_inversion(equity.iter().map(|e| e.timestamp));
    if trade_inversions + equity_inversions == 0 {
        return None;
    }
    let mut f = Finding::new(
        RuleId::ChronologicalOrder,
        Severity::Critical,
        format!(
            "records out of time order: {trade_inversions} in trade log, {equity_inversions} in equity curve"
        ),
    )
    .with("trade_inversions", trade_inversions)
    .with("equity_inversions", equity_inversions);
    if let Some(i) = first_trade {
        f = f.with("first_trade_index", i);
    }
    if let Some(i) = first_equity {
        f = f.with("first_equity_index", i);
    }
    Some(f)
}

pub(super) fn fill_reference_consistency(
    trades: &[TradeRecord],
    summary: Option<&SummaryStats>,
) -> Option<Finding> {
    let references: BTreeSet<&str> = trades.iter().map(|t| t.reference.as_str()).collect();
    let declared = summary.map(|s| s.fill_timing.as_str());

    let consistent = match (references.len(), declared) {
        (0, _) => true,
        (1, None) => true,
        (1, Some(d)) => references.contains(d),
        _ => false,
    };
    if consistent {
        return None;
    }
    let mut f = Finding::new(
        RuleId::FillReferenceConsistency,
        Severity::High,
        "fills do not consistently use the declared fill timing",
    )
    .with("observed", references.into_iter().collect::<Vec<_>>());
    if let Some(d) = declared {
        f = f.with("declared", d);
    }
    Some(f)
}

// ── Accounting ──

pub(super) fn equity_identity(equity: &[EquityRecord], tol: f64) -> Option<Finding> {
    let violations: Vec<&EquityRecord> = equity
        .iter()
        .filter(|e| {
            let slack = tol * e.equity.abs().max(1.0);
            diverges(e.equity, e.cash + e.net_exposure, tol)
                || e.net_exposure.abs() > e.gross_exposure + slack
        })
        .collect();
    let first = violations.first()?;
    Some(
        Finding::new(
            RuleId::EquityIdentity,
            Severity::High,
            format!(
                "{} equity samples are not explained by cash plus positions",
                violations.len()
            ),
        )
        .with("count", violations.len())
        .with("first_timestamp", first.timestamp)
        .with("equity", first.equity)
        .with("cash", first.cash)
        .with("net_exposure", first.net_exposure)
        .with("gross_exposure", first.gross_exposure),
    )
}

pub(super) fn negative_equity(equity: &[EquityRecord]) -> Option<Finding> {
    let below: Vec<&EquityRecord> = equity.iter().filter(|e| e.equity < 0.0).collect();
    let first = below.first()?;
    let lowest = below
        .iter()
        .map(|e| e.equity)
        .fold(f64::INFINITY, f64::min);
    Some(
        Finding::new(
            RuleId::NegativeEquity,
            Severity::Critical,
            format!(
                "equity went negative at {} (bankruptcy): {:.2}",
                first.timestamp, first.equity
            ),
        )
        .with("count", below.len())
        .with("first_timestamp", first.timestamp)
        .with("first_equity", first.equity)
        .with("lowest_equity", lowest),
    )
}

pub(super) fn cash_reconciliation(
    summary: Option<&SummaryStats>,
    trades: &[TradeRecord],
    equity: &[EquityRecord],
    tol: f64,
) -> Option<Finding> {
    let Some(summary) = summary else {
        return Some(Finding::skipped(
            RuleId::CashReconciliation,
            "no summary: initial cash unknown",
        ));
    };

    // Compare against the last sample at each timestamp, after every fill
    // at that timestamp has been applied.
    let mut last_per_ts: Vec<&EquityRecord> = Vec::with_capacity(equity.len());
    for rec in equity {
        match last_per_ts.last_mut() {
            Some(last) if last.timestamp == rec.timestamp => *last = rec,
            _ => last_per_ts.push(rec),
        }
    }

    let mut cash = summary.initial_equity;
    let mut next_trade = 0;
    let mut mismatches = 0usize;
    let mut first: Option<(i64, f64, f64)> = None;
    for rec in last_per_ts {
        while let Some(t) = trades.get(next_trade) {
            if t.timestamp > rec.timestamp {
                break;
            }
            cash += t.cash_delta();
            next_trade += 1;
        }
        if diverges(rec.cash, cash, tol) {
            mismatches += 1;
            first.get_or_insert((rec.timestamp, cash, rec.cash));
        }
    }
    let orphaned = trades.len() - next_trade.min(trades.len());
    if mismatches == 0 && orphaned == 0 {
        return None;
    }

    let mut f = Finding::new(
        RuleId::CashReconciliation,
        Severity::High,
        format!(
            "cash does not follow the trade log: {mismatches} mismatched samples, {orphaned} trades after the last sample"
        ),
    )
    .with("mismatches", mismatches)
    .with("trades_after_last_sample", orphaned);
    if let Some((ts, expected, reported)) = first {
        f = f
            .with("first_timestamp", ts)
            .with("expected_cash", expected)
            .with("reported_cash", reported);
    }
    Some(f)
}

pub(super) fn summary_consistency(
    summary: Option<&SummaryStats>,
    trades: &[TradeRecord],
    equity: &[EquityRecord],
    tol: f64,
) -> Option<Finding> {
    let Some(s) = summary else {
        return Some(Finding::skipped(RuleId::SummaryConsistency, "no summary to check"));
    };

    let mut f = Finding::new(
        RuleId::SummaryConsistency,
        Severity::High,
        "summary disagrees with the trade log or equity curve",
    );

    if s.trade_count != trades.len() {
        f = f.with(
            "trade_count",
            json!({ "reported": s.trade_count, "recomputed": trades.len() }),
        );
    }
    let commission: f64 = trades.iter().map(|t| t.commission).sum();
    if diverges(s.total_commission, commission, tol) {
        f = f.with(
            "total_commission",
            json!({ "reported": s.total_commission, "recomputed": commission }),
        );
    }
    if let Some(last) = equity.last() {
        if diverges(s.final_equity, last.equity, tol) {
            f = f.with(
                "final_equity",
                json!({ "reported": s.final_equity, "recomputed": last.equity }),
            );
        }
        let total_return = crate::metrics::total_return(s.initial_equity, last.equity);
        if diverges(s.total_return, total_return, tol) {
            f = f.with(
                "total_return",
                json!({ "reported": s.total_return, "recomputed": total_return }),
            );
        }
    }

    (!f.evidence.is_empty()).then_some(f)
}

// ── Metric recomputation ──

pub(super) fn sharpe_recomputation(
    summary: Option<&SummaryStats>,
    recomputed: &Recomputed,
    tol: f64,
) -> Option<Finding> {
    let Some(s) = summary else {
        return Some(Finding::skipped(RuleId::SharpeRecomputation, "no summary to compare"));
    };
    let (Some(freq), Some(sharpe)) = (recomputed.frequency, recomputed.sharpe) else {
        return Some(Finding::skipped(
            RuleId::SharpeRecomputation,
            "fewer than two distinct timestamps: sampling frequency unknown",
        ));
    };
    if !diverges(s.sharpe_ratio, sharpe, tol) {
        return None;
    }
    Some(
        Finding::new(
            RuleId::SharpeRecomputation,
            Severity::High,
            format!(
                "reported Sharpe {:.4} differs from recomputed {:.4}",
                s.sharpe_ratio, sharpe
            ),
        )
        .with("reported", s.sharpe_ratio)
        .with("recomputed", sharpe)
        .with("annualization_factor", freq.annualization_factor())
        .with("reported_annualization_factor", s.annualization_factor),
    )
}

pub(super) fn drawdown_recomputation(
    summary: Option<&SummaryStats>,
    recomputed: &Recomputed,
    tol: f64,
) -> Option<Finding> {
    let Some(s) = summary else {
        return Some(Finding::skipped(RuleId::DrawdownRecomputation, "no summary to compare"));
    };
    let Some(dd) = recomputed.drawdown else {
        return Some(Finding::skipped(RuleId::DrawdownRecomputation, "equity curve is empty"));
    };

    // Depth above 1 is legitimate once equity goes negative.
    if s.max_drawdown < 0.0 {
        return Some(
            Finding::new(
                RuleId::DrawdownRecomputation,
                Severity::Critical,
                format!("reported max drawdown {} is negative", s.max_drawdown),
            )
            .with("reported", s.max_drawdown)
            .with("recomputed", dd.depth),
        );
    }
    if !diverges(s.max_drawdown, dd.depth, tol) {
        return None;
    }
    Some(
        Finding::new(
            RuleId::DrawdownRecomputation,
            Severity::High,
            format!(
                "reported max drawdown {:.4} differs from recomputed {:.4}",
                s.max_drawdown, dd.depth
            ),
        )
        .with("reported", s.max_drawdown)
        .with("recomputed", dd.depth),
    )
}

// ── Policy limits ──

pub(super) fn max_drawdown_limit(recomputed: &Recomputed, limit: Option<f64>) -> Option<Finding> {
    let limit = limit?;
    let Some(dd) = recomputed.drawdown else {
        return Some(Finding::skipped(RuleId::MaxDrawdownLimit, "equity curve is empty"));
    };
    (dd.depth > limit).then(|| {
        Finding::new(
            RuleId::MaxDrawdownLimit,
            Severity::High,
            format!(
                "max drawdown {:.2}% exceeds the {:.2}% limit",
                dd.depth * 100.0,
                limit * 100.0
            ),
        )
        .with("observed", dd.depth)
        .with("limit", limit)
        .with("peak_timestamp", dd.peak_timestamp)
        .with("trough_timestamp", dd.trough_timestamp)
    })
}

pub(super) fn max_leverage_limit(recomputed: &Recomputed, limit: Option<f64>) -> Option<Finding> {
    let limit = limit?;
    let Some((lev, ts)) = recomputed.peak_leverage else {
        return Some(Finding::skipped(RuleId::MaxLeverageLimit, "equity curve is empty"));
    };
    (lev > limit).then(|| {
        Finding::new(
            RuleId::MaxLeverageLimit,
            Severity::High,
            format!("peak leverage {lev:.2} exceeds the {limit:.2} limit"),
        )
        .with("observed", lev)
        .with("limit", limit)
        .with("timestamp", ts)
    })
}

pub(super) fn max_turnover_limit(recomputed: &Recomputed, limit: Option<f64>) -> Option<Finding> {
    let limit = limit?;
    let Some(turnover) = recomputed.turnover else {
        return Some(Finding::skipped(RuleId::MaxTurnoverLimit, "equity curve is empty"));
    };
    (turnover > limit).then(|| {
        Finding::new(
            RuleId::MaxTurnoverLimit,
            Severity::High,
            format!("turnover {turnover:.2} exceeds the {limit:.2} limit"),
        )
        .with("observed", turnover)
        .with("limit", limit)
    })
}

// ── Plausibility ──

pub(super) fn implausible_sharpe(recomputed: &Recomputed, threshold: f64) -> Option<Finding> {
    let sharpe = recomputed.sharpe?;
    (sharpe.abs() > threshold).then(|| {
        Finding::new(
            RuleId::ImplausibleSharpe,
            Severity::Medium,
            format!("Sharpe ratio {sharpe:.2} is implausibly high"),
        )
        .with("observed", sharpe)
        .with("threshold", threshold)
    })
}

pub(super) fn survivorship_bias(
    coverage: Option<&Coverage>,
    trades: &[TradeRecord],
) -> Option<Finding> {
    let coverage = coverage?;
    if coverage.universe.is_empty() {
        return None;
    }
    let universe: BTreeSet<&str> = coverage.universe.iter().map(String::as_str).collect();
    let total = universe.len();

    let missing: Vec<&str> = universe
        .iter()
        .copied()
        .filter(|s| !coverage.spans.contains_key(*s))
        .collect();
    let tape_end = coverage.spans.values().map(|s| s.last).max();
    let ended_early: Vec<&str> = universe
        .iter()
        .copied()
        .filter(|s| {
            matches!(
                (coverage.spans.get(*s), tape_end),
                (Some(span), Some(end)) if span.last < end
            )
        })
        .collect();
    let traded: BTreeSet<&str> = trades
        .iter()
        .map(|t| t.symbol.as_str())
        .filter(|s| universe.contains(s))
        .collect();

    let missing_fraction = missing.len() as f64 / total as f64;
    let traded_fraction = traded.len() as f64 / total as f64;

    let severity = if missing_fraction > MISSING_SYMBOL_FRACTION {
        Severity::High
    } else if traded_fraction < TRADED_SYMBOL_FRACTION && total > MIN_UNIVERSE_FOR_CHERRY_PICKING
    {
        Severity::Medium
    } else {
        return None;
    };

    let message = match severity {
        Severity::High => format!(
            "{} of {} universe symbols never appear in the data",
            missing.len(),
            total
        ),
        _ => format!(
            "strategy traded only {} of {} universe symbols",
            traded.len(),
            total
        ),
    };
    Some(
        Finding::new(RuleId::SurvivorshipBias, severity, message)
            .with("universe_size", total)
            .with("missing_symbols", missing)
            .with("ended_early", ended_early)
            .with("traded_symbols", traded.len()),
    )
}

// ── Behavioural leakage ──

pub(super) fn truncation_divergence(outcome: &TruncationOutcome) -> Option<Finding> {
    let d = outcome.divergence.as_ref()?;
    Some(
        Finding::new(
            RuleId::TruncationDivergence,
            Severity::Critical,
            format!(
                "re-running on data truncated at {} changed fills already made",
                d.cut_timestamp
            ),
        )
        .with("cut_timestamp", d.cut_timestamp)
        .with("cuts_checked", outcome.cuts_checked)
        .with("full_run_fills", d.full_run_fills)
        .with("truncated_run_fills", d.truncated_run_fills)
        .with("first_mismatch_index", d.first_mismatch_index),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use simlab_core::domain::{PriceReference, Side};

    #[test]
    fn drawdown_scan_tracks_peak_and_trough() {
        let dd = drawdown_scan(&[(0, 100.0), (1, 120.0), (2, 90.0), (3, 78.0), (4, 130.0)]).unwrap();
        assert!((dd.depth - 0.35).abs() < 1e-12);
        assert_eq!(dd.peak_timestamp, 1);
        assert_eq!(dd.trough_timestamp, 3);
        assert!(drawdown_scan(&[]).is_none());
    }

    #[test]
    fn divergence_tolerance_is_relative_above_one() {
        assert!(!diverges(1000.0, 1000.0005, 1e-6));
        assert!(diverges(1000.0, 1000.1, 1e-6));
        assert!(!diverges(0.0, 1e-7, 1e-6));
        assert!(diverges(f64::NAN, 1.0, 1e-6));
    }

    fn record(equity: f64, cash: f64, net: f64, gross: f64) -> EquityRecord {
        EquityRecord {
            timestamp: 0,
            equity,
            cash,
            net_exposure: net,
            gross_exposure: gross,
        }
    }

    #[test]
    fn equity_must_equal_cash_plus_net_exposure() {
        assert!(equity_identity(&[record(1_500.0, 500.0, 1_000.0, 1_000.0)], 1e-6).is_none());
        // Within the gross bound but not the identity.
        let f = equity_identity(&[record(500.0, 0.0, 1_000.0, 1_000.0)], 1e-6).unwrap();
        assert_eq!(f.severity, Severity::High);
        assert_eq!(f.evidence["net_exposure"].as_f64(), Some(1_000.0));
        // Net exposure larger than gross is impossible.
        assert!(equity_identity(&[record(3_000.0, 1_000.0, 2_000.0, 1_000.0)], 1e-6).is_some());
    }

    #[test]
    fn negative_equity_is_critical() {
        assert!(negative_equity(&[record(100.0, 100.0, 0.0, 0.0)]).is_none());
        let mut curve = vec![
            record(100.0, 100.0, 0.0, 0.0),
            record(-40.0, -540.0, 500.0, 500.0),
            record(-90.0, -590.0, 500.0, 500.0),
        ];
        for (i, rec) in curve.iter_mut().enumerate() {
            rec.timestamp = i as i64 * 60;
        }
        let f = negative_equity(&curve).unwrap();
        assert_eq!(f.severity, Severity::Critical);
        assert_eq!(f.evidence["count"], 2);
        assert_eq!(f.evidence["first_timestamp"], 60);
        assert_eq!(f.evidence["lowest_equity"].as_f64(), Some(-90.0));
    }

    fn open_fill(decided: i64, phase: PriceReference) -> TradeRecord {
        TradeRecord {
            timestamp: 600,
            symbol: "SPY".into(),
            side: Side::Buy,
            quantity: 1.0,
            price: 10.0,
            commission: 0.0,
            slippage: 0.0,
            decision_timestamp: decided,
            decision_phase: phase,
            reference: PriceReference::Open,
        }
    }

    #[test]
    fn reading_the_fill_bar_close_before_an_open_fill_leaks() {
        assert!(temporal_leakage(&[open_fill(600, PriceReference::Open)]).is_none());
        assert!(temporal_leakage(&[open_fill(540, PriceReference::Close)]).is_none());

        let f = temporal_leakage(&[open_fill(600, PriceReference::Close)]).unwrap();
        assert_eq!(f.severity, Severity::Critical);
        assert_eq!(f.evidence["same_bar_count"], 1);
        assert_eq!(f.evidence["max_lead_seconds"], 0);
        assert_eq!(f.evidence["first_decision_phase"], "close");
        assert_eq!(f.evidence["first_fill_reference"], "open");
    }

    #[test]
    fn inversions_are_counted() {
        let (count, first) = first_inversion([1, 3, 2, 4, 0].into_iter());
        assert_eq!(count, 2);
        assert_eq!(first, Some(2));
    }
}
