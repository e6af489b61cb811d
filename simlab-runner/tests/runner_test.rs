//! End-to-end runs: engine, summary and verification together.

mod common;

use common::*;
use simlab_core::domain::PriceReference;
use simlab_core::engine::FaultProfile;
use simlab_runner::{replay, run_backtest, run_batch, RuleId, RunError, Severity};

// ── Policy limits ──

#[test]
fn drawdown_breach_is_the_only_high_finding() {
    let bars = flat_bars("SPY", &[100.0, 120.0, 78.0, 90.0]);
    let spec = buy_and_hold(1000.0);
    let result = run_backtest(&spec, &bars).unwrap();

    assert!((result.summary.max_drawdown - 0.35).abs() < 1e-9);
    assert!(!result.report.passed);
    assert_eq!(
        result.report.count(Severity::High),
        1,
        "{:#?}",
        result.report.findings
    );
    assert_eq!(result.report.count(Severity::Critical), 0);

    let f = result.report.finding(RuleId::MaxDrawdownLimit).unwrap();
    assert_eq!(f.severity, Severity::High);
    assert!((f.evidence["observed"].as_f64().unwrap() - 0.35).abs() < 1e-9);
    assert_eq!(f.evidence["limit"].as_f64(), Some(0.25));
}

#[test]
fn raising_the_limit_clears_the_breach() {
    let bars = flat_bars("SPY", &[100.0, 120.0, 78.0, 90.0]);
    let mut spec = buy_and_hold(1000.0);
    spec.policy.max_drawdown = Some(0.4);
    let result = run_backtest(&spec, &bars).unwrap();
    assert!(result.report.passed, "{:#?}", result.report.findings);
    assert!(result.report.finding(RuleId::MaxDrawdownLimit).is_none());
}

// ── Leakage ──

#[test]
fn injected_lookahead_is_flagged_critical() {
    let bars = synthetic("SPY", 150, 5);
    let mut spec = momentum();
    spec.fault = FaultProfile::leak_future_bars(1);
    let result = run_backtest(&spec, &bars).unwrap();

    assert!(!result.trades.is_empty());
    let f = result.report.finding(RuleId::TemporalLeakage).unwrap();
    assert_eq!(f.severity, Severity::Critical);
    assert_eq!(f.evidence["max_lead_seconds"], DAY);
    assert!(!result.report.passed);
}

#[test]
fn honest_momentum_has_no_leakage_findings() {
    let bars = synthetic("SPY", 150, 5);
    let result = run_backtest(&momentum(), &bars).unwrap();
    assert!(result.report.finding(RuleId::TemporalLeakage).is_none());
    assert!(result.report.finding(RuleId::TruncationDivergence).is_none());
    assert!(result
        .trades
        .iter()
        .all(|t| t.decision_timestamp <= t.timestamp));
}

#[test]
fn injected_lookahead_under_open_fills_is_flagged_critical() {
    let bars = synthetic("SPY", 150, 5);
    let mut spec = momentum();
    spec.execution.fill_timing = PriceReference::Open;
    spec.fault = FaultProfile::leak_future_bars(1);
    let result = run_backtest(&spec, &bars).unwrap();

    assert!(!result.trades.is_empty());
    assert!(result
        .trades
        .iter()
        .all(|t| t.reference == PriceReference::Open));
    let f = result.report.finding(RuleId::TemporalLeakage).unwrap();
    assert_eq!(f.severity, Severity::Critical);
    assert_eq!(f.evidence["count"], result.trades.len());
    assert_eq!(f.evidence["same_bar_count"], result.trades.len());
    assert_eq!(f.evidence["first_decision_phase"], "close");
    assert!(!result.report.passed);
}

#[test]
fn honest_momentum_under_open_fills_has_no_leakage_findings() {
    let bars = synthetic("SPY", 150, 5);
    let mut spec = momentum();
    spec.execution.fill_timing = PriceReference::Open;
    let result = run_backtest(&spec, &bars).unwrap();

    assert!(!result.trades.is_empty());
    assert!(result.report.finding(RuleId::TemporalLeakage).is_none());
    assert!(result.report.finding(RuleId::TruncationDivergence).is_none());
    assert!(result
        .trades
        .iter()
        .all(|t| (t.decision_timestamp, t.decision_phase) <= (t.timestamp, t.reference)));
}

// ── Consistency ──

#[test]
fn summary_matches_records() {
    let bars = synthetic("SPY", 120, 9);
    let result = run_backtest(&mean_reversion(), &bars).unwrap();
    let s = &result.summary;
    assert_eq!(s.trade_count, result.trades.len());
    assert_eq!(s.rejected_orders, result.rejections.len());
    assert_eq!(result.equity_curve.len(), 120);
    let last = result.equity_curve.last().unwrap();
    assert!((s.final_equity - last.equity).abs() < 1e-9);
    assert!((s.annualization_factor - 252.0).abs() < 1e-12);
    for rule in [
        RuleId::CashReconciliation,
        RuleId::SummaryConsistency,
        RuleId::SharpeRecomputation,
        RuleId::DrawdownRecomputation,
        RuleId::EquityIdentity,
    ] {
        assert!(
            result.report.finding(rule).is_none(),
            "{rule:?}: {:#?}",
            result.report.findings
        );
    }
}

#[test]
fn empty_tape_reports_missing_data() {
    let result = run_backtest(&buy_and_hold(10.0), &[]).unwrap();
    let f = result.report.finding(RuleId::MissingData).unwrap();
    assert_eq!(f.severity, Severity::Critical);
    assert!(!result.report.passed);
}

#[test]
fn invalid_spec_is_rejected_before_running() {
    let mut spec = buy_and_hold(10.0);
    spec.initial_cash = 0.0;
    let bars = flat_bars("SPY", &[100.0, 101.0]);
    assert!(matches!(
        run_backtest(&spec, &bars),
        Err(RunError::Config(_))
    ));
}

#[test]
fn out_of_order_tape_is_an_engine_error() {
    let mut bars = flat_bars("SPY", &[100.0, 101.0, 102.0]);
    bars.swap(1, 2);
    assert!(matches!(
        run_backtest(&buy_and_hold(10.0), &bars),
        Err(RunError::Engine(_))
    ));
}

// ── Determinism ──

#[test]
fn reports_are_byte_identical_across_runs() {
    let bars = synthetic("SPY", 120, 3);
    let a = run_backtest(&momentum(), &bars).unwrap();
    let b = run_backtest(&momentum(), &bars).unwrap();
    assert_eq!(a.digest, b.digest);
    assert_eq!(
        serde_json::to_string(&a.report).unwrap(),
        serde_json::to_string(&b.report).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&a.summary).unwrap(),
        serde_json::to_string(&b.summary).unwrap()
    );
}

#[test]
fn replay_confirms_determinism() {
    let bars = synthetic("SPY", 80, 4);
    let outcome = replay(&mean_reversion(), &bars, 3).unwrap();
    assert!(outcome.deterministic);
    assert_eq!(outcome.digests.len(), 3);
    assert!(matches!(
        replay(&mean_reversion(), &bars, 1),
        Err(RunError::TooFewReplays(1))
    ));
}

#[test]
fn batch_equals_sequential() {
    let bars = synthetic("SPY", 120, 12);
    let mut specs = vec![momentum(), mean_reversion(), buy_and_hold(100.0)];
    let mut reseeded = momentum();
    reseeded.seed = 99;
    specs.push(reseeded);

    let parallel = run_batch(&specs, &bars);
    assert_eq!(parallel.len(), specs.len());
    for (spec, result) in specs.iter().zip(parallel) {
        let batch = result.unwrap();
        let serial = run_backtest(spec, &bars).unwrap();
        assert_eq!(batch.digest, serial.digest);
        assert_eq!(batch.summary, serial.summary);
        assert_eq!(batch.report, serial.report);
    }
}
