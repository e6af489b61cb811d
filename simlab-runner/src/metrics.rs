//! Summary statistics: pure functions over the trade log and equity curve.
//!
//! Every metric is a pure function: records in, scalar out. Sharpe is
//! annualized with the factor inferred from the observed sampling frequency.

use crate::records::{EquityRecord, TradeRecord};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use simlab_core::domain::PriceReference;
use std::collections::BTreeMap;

const SECONDS_PER_DAY: i64 = 86_400;
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// The summary produced once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub initial_equity: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub sharpe_ratio: f64,
    /// Positive fraction of the running peak.
    pub max_drawdown: f64,
    pub trade_count: usize,
    pub total_commission: f64,
    pub realized_pnl: f64,
    pub turnover: f64,
    /// `None` once equity was exhausted while exposure remained open.
    pub peak_leverage: Option<f64>,
    pub rejected_orders: usize,
    pub fill_timing: PriceReference,
    pub annualization_factor: f64,
}

impl SummaryStats {
    pub fn compute(
        initial_equity: f64,
        realized_pnl: f64,
        trades: &[TradeRecord],
        equity: &[EquityRecord],
        rejected_orders: usize,
        fill_timing: PriceReference,
    ) -> Self {
        let periods = period_equity(equity);
        let values: Vec<f64> = periods.iter().map(|&(_, v)| v).collect();
        let timestamps: Vec<i64> = periods.iter().map(|&(t, _)| t).collect();
        let annualization_factor = SamplingFrequency::infer(&timestamps)
            .map(|f| f.annualization_factor())
            .unwrap_or(TRADING_DAYS_PER_YEAR);
        let final_equity = values.last().copied().unwrap_or(initial_equity);

        Self {
            initial_equity,
            final_equity,
            total_return: total_return(initial_equity, final_equity),
            sharpe_ratio: sharpe_ratio(&values, annualization_factor),
            max_drawdown: max_drawdown(&values),
            trade_count: trades.len(),
            total_commission: trades.iter().map(|t| t.commission).sum(),
            realized_pnl,
            turnover: turnover(trades, &values),
            peak_leverage: Some(peak_leverage(equity)).filter(|l| l.is_finite()),
            rejected_orders,
            fill_timing,
            annualization_factor,
        }
    }
}

// ─── Sampling frequency ─────────────────────────────────────────────

/// Observed sampling frequency of an equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SamplingFrequency {
    Monthly,
    Weekly,
    Daily,
    Intraday { samples_per_day: f64 },
}

impl SamplingFrequency {
    /// Classify by the median gap between distinct timestamps. Returns `None`
    /// with fewer than two distinct timestamps.
    pub fn infer(timestamps: &[i64]) -> Option<Self> {
        let mut distinct: Vec<i64> = timestamps.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < 2 {
            return None;
        }

        let gaps: Vec<f64> = distinct.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
        let gap = median(&gaps)?;
        let day = SECONDS_PER_DAY as f64;

        let freq = if gap >= 25.0 * day {
            Self::Monthly
        } else if gap >= 5.0 * day {
            Self::Weekly
        } else if gap >= 20.0 * 3600.0 {
            Self::Daily
        } else {
            let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
            for &ts in &distinct {
                let date = DateTime::from_timestamp(ts, 0)
                    .map(|dt| dt.date_naive())
                    .unwrap_or_default();
                *per_day.entry(date).or_default() += 1;
            }
            let counts: Vec<f64> = per_day.values().map(|&c| c as f64).collect();
            Self::Intraday {
                samples_per_day: median(&counts).unwrap_or(1.0),
            }
        };
        Some(freq)
    }

    pub fn annualization_factor(&self) -> f64 {
        match self {
            Self::Monthly => 12.0,
            Self::Weekly => 52.0,
            Self::Daily => TRADING_DAYS_PER_YEAR,
            Self::Intraday { samples_per_day } => TRADING_DAYS_PER_YEAR * samples_per_day,
        }
    }
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

// ─── Individual metric functions ────────────────────────────────────

/// Collapse the curve to one value per timestamp (the last sample recorded
/// at that timestamp, i.e. after every symbol's bar has been processed).
pub fn period_equity(equity: &[EquityRecord]) -> Vec<(i64, f64)> {
    let mut out: Vec<(i64, f64)> = Vec::with_capacity(equity.len());
    for rec in equity {
        match out.last_mut() {
            Some(last) if last.0 == rec.timestamp => last.1 = rec.equity,
            _ => out.push((rec.timestamp, rec.equity)),
        }
    }
    out
}

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(initial: f64, final_equity: f64) -> f64 {
    if initial <= 0.0 {
        return 0.0;
    }
    (final_equity - initial) / initial
}

/// Simple period-over-period returns. Periods starting at non-positive
/// equity are skipped.
pub fn period_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Annualized Sharpe ratio (zero risk-free rate, population std).
///
/// Returns 0.0 with fewer than two returns or zero variance.
pub fn sharpe_ratio(values: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(values);
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    if std < 1e-15 {
        return 0.0;
    }
    mean / std * periods_per_year.sqrt()
}

/// Maximum drawdown as a positive fraction (0.15 = 15% below the peak).
///
/// The peak is seeded by the first sample.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = match values.first() {
        Some(&v) => v,
        None => return 0.0,
    };
    let mut max_dd = 0.0_f64;
    for &v in values {
        peak = peak.max(v);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - v) / peak);
        }
    }
    max_dd
}

/// Traded notional over average equity.
pub fn turnover(trades: &[TradeRecord], equity_values: &[f64]) -> f64 {
    if equity_values.is_empty() {
        return 0.0;
    }
    let avg = equity_values.iter().sum::<f64>() / equity_values.len() as f64;
    if avg <= 0.0 {
        return 0.0;
    }
    trades.iter().map(TradeRecord::notional).sum::<f64>() / avg
}

pub fn peak_leverage(equity: &[EquityRecord]) -> f64 {
    equity
        .iter()
        .map(EquityRecord::leverage)
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64, eps: f64) {
        assert!(
            (actual - expected).abs() < eps,
            "expected {expected}, got {actual}"
        );
    }

    fn records(step: i64, equity: &[f64]) -> Vec<EquityRecord> {
        equity
            .iter()
            .enumerate()
            .map(|(i, &e)| EquityRecord {
                timestamp: 1_704_153_600 + i as i64 * step,
                equity: e,
                cash: e,
                net_exposure: 0.0,
                gross_exposure: 0.0,
            })
            .collect()
    }

    // ── Sampling frequency ──

    #[test]
    fn daily_bars_annualize_with_252() {
        let ts: Vec<i64> = (0..30).map(|i| i * SECONDS_PER_DAY).collect();
        let freq = SamplingFrequency::infer(&ts).unwrap();
        assert_eq!(freq, SamplingFrequency::Daily);
        assert_approx(freq.annualization_factor(), 252.0, 1e-12);
    }

    #[test]
    fn weekends_do_not_change_daily_classification() {
        let mut ts = Vec::new();
        for week in 0..6 {
            for day in 0..5 {
                ts.push((week * 7 + day) * SECONDS_PER_DAY);
            }
        }
        assert_eq!(SamplingFrequency::infer(&ts), Some(SamplingFrequency::Daily));
    }

    #[test]
    fn weekly_and_monthly() {
        let weekly: Vec<i64> = (0..20).map(|i| i * 7 * SECONDS_PER_DAY).collect();
        let monthly: Vec<i64> = (0..20).map(|i| i * 30 * SECONDS_PER_DAY).collect();
        assert_eq!(SamplingFrequency::infer(&weekly), Some(SamplingFrequency::Weekly));
        assert_eq!(SamplingFrequency::infer(&monthly), Some(SamplingFrequency::Monthly));
    }

    #[test]
    fn hourly_bars_scale_by_samples_per_day() {
        // Seven hourly samples per UTC day over five days.
        let mut ts = Vec::new();
        for day in 0..5 {
            for hour in 0..7 {
                ts.push(day * SECONDS_PER_DAY + (14 + hour) * 3600);
            }
        }
        let freq = SamplingFrequency::infer(&ts).unwrap();
        assert_eq!(freq, SamplingFrequency::Intraday { samples_per_day: 7.0 });
        assert_approx(freq.annualization_factor(), 252.0 * 7.0, 1e-9);
    }

    #[test]
    fn single_timestamp_has_no_frequency() {
        assert_eq!(SamplingFrequency::infer(&[5, 5, 5]), None);
        assert_eq!(SamplingFrequency::infer(&[]), None);
    }

    // ── Metrics ──

    #[test]
    fn drawdown_is_positive_fraction() {
        assert_approx(max_drawdown(&[100.0, 120.0, 78.0, 90.0]), 0.35, 1e-12);
        assert_eq!(max_drawdown(&[100.0, 110.0, 120.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn sharpe_zero_for_flat_curve() {
        assert_eq!(sharpe_ratio(&[100.0; 10], 252.0), 0.0);
        assert_eq!(sharpe_ratio(&[100.0, 101.0], 252.0), 0.0);
    }

    #[test]
    fn sharpe_matches_hand_computation() {
        let values = [100.0, 110.0, 99.0, 108.9];
        // returns: 0.1, -0.1, 0.1 -> mean 1/30, population std sqrt(8)/30
        let expected = (1.0 / 30.0) / (8.0_f64.sqrt() / 30.0) * 252.0_f64.sqrt();
        assert_approx(sharpe_ratio(&values, 252.0), expected, 1e-9);
    }

    #[test]
    fn period_equity_keeps_last_sample_per_timestamp() {
        let mut eq = records(SECONDS_PER_DAY, &[100.0, 101.0]);
        eq.insert(
            1,
            EquityRecord {
                timestamp: eq[0].timestamp,
                equity: 100.5,
                cash: 0.0,
                net_exposure: 100.5,
                gross_exposure: 100.5,
            },
        );
        let periods = period_equity(&eq);
        assert_eq!(periods.len(), 2);
        assert_approx(periods[0].1, 100.5, 1e-12);
    }

    #[test]
    fn compute_summary() {
        let eq = records(SECONDS_PER_DAY, &[1000.0, 1100.0, 990.0]);
        let trades = vec![TradeRecord {
            timestamp: eq[0].timestamp,
            symbol: "SPY".into(),
            side: simlab_core::domain::Side::Buy,
            quantity: 10.0,
            price: 100.0,
            commission: 2.0,
            slippage: 0.0,
            decision_timestamp: eq[0].timestamp,
            decision_phase: PriceReference::Close,
            reference: PriceReference::Close,
        }];
        let s = SummaryStats::compute(1000.0, 0.0, &trades, &eq, 1, PriceReference::Close);
        assert_approx(s.total_return, -0.01, 1e-12);
        assert_approx(s.max_drawdown, 0.1, 1e-12);
        assert_eq!(s.trade_count, 1);
        assert_approx(s.total_commission, 2.0, 1e-12);
        assert_eq!(s.rejected_orders, 1);
        assert_approx(s.annualization_factor, 252.0, 1e-12);
        assert_approx(s.turnover, 1000.0 / (3090.0 / 3.0), 1e-9);
    }

    #[test]
    fn empty_curve_summary_is_neutral() {
        let s = SummaryStats::compute(500.0, 0.0, &[], &[], 0, PriceReference::Close);
        assert_eq!(s.final_equity, 500.0);
        assert_eq!(s.total_return, 0.0);
        assert_eq!(s.sharpe_ratio, 0.0);
        assert_eq!(s.max_drawdown, 0.0);
        assert_eq!(s.peak_leverage, Some(0.0));
    }
}
