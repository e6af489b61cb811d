//! Artifact export and re-verification from files.

mod common;

use common::*;
use simlab_core::domain::PriceReference;
use simlab_runner::{ArtifactManager, RuleId, Severity, Verifier};

#[test]
fn artifacts_round_trip_and_reverify() {
    let bars = synthetic("SPY", 100, 21);
    let spec = mean_reversion();
    let result = simlab_runner::run_backtest(&spec, &bars).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let manager = ArtifactManager::new(dir.path()).unwrap();
    let paths = manager.save_run(&result).unwrap();
    for p in [
        &paths.trades_csv,
        &paths.equity_csv,
        &paths.summary_json,
        &paths.report_json,
        &paths.manifest,
    ] {
        assert!(p.exists(), "{} missing", p.display());
    }

    let loaded = ArtifactManager::open(dir.path()).load_run();
    assert!(loaded.load_errors.is_empty(), "{:?}", loaded.load_errors);
    assert_eq!(loaded.trades, result.trades);
    assert_eq!(loaded.equity_curve, result.equity_curve);
    assert_eq!(loaded.summary.as_ref(), Some(&result.summary));
    let manifest = loaded.manifest.as_ref().unwrap();
    assert_eq!(manifest.run_digest, result.digest);
    assert_eq!(manifest.spec, spec);

    let verifier = Verifier::new(manifest.spec.policy.clone(), manifest.spec.verification.clone());
    let report = verifier.verify(&loaded.verification_input());
    let from_files: Vec<_> = report.findings.iter().map(|f| f.rule_id).collect();
    let in_memory: Vec<_> = result
        .report
        .findings
        .iter()
        .map(|f| f.rule_id)
        .filter(|r| *r != RuleId::TruncationDivergence)
        .collect();
    assert_eq!(from_files, in_memory);
}

#[test]
fn trades_csv_has_expected_header() {
    let bars = flat_bars("SPY", &[100.0, 101.0, 102.0]);
    let result = simlab_runner::run_backtest(&buy_and_hold(10.0), &bars).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactManager::new(dir.path()).unwrap().save_run(&result).unwrap();

    let trades = std::fs::read_to_string(&paths.trades_csv).unwrap();
    assert_eq!(
        trades.lines().next(),
        Some(
            "timestamp,symbol,side,quantity,price,commission,slippage,\
             decision_timestamp,decision_phase,reference"
        )
    );
    assert!(trades.lines().nth(1).unwrap().contains(",buy,"));

    let equity = std::fs::read_to_string(&paths.equity_csv).unwrap();
    assert_eq!(equity.lines().next(), Some("timestamp,equity,cash,net_exposure,gross_exposure"));
    assert_eq!(equity.lines().count(), 4);
}

#[test]
fn missing_files_become_findings() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("trades.csv"),
        "timestamp,symbol,side,quantity,price,commission,slippage,decision_timestamp,reference\n\
         86400,SPY,buy,10,100,1,0,172800,close\n",
    )
    .unwrap();

    let loaded = ArtifactManager::open(dir.path()).load_run();
    assert!(loaded.summary.is_none());
    assert!(loaded.load_errors.is_empty());
    // Logs without a decision_phase column read as full-bar decisions.
    assert_eq!(loaded.trades[0].decision_phase, PriceReference::Close);
    let report = Verifier::default().verify(&loaded.verification_input());

    assert!(!report.passed);
    assert_eq!(
        report.finding(RuleId::MissingData).map(|f| f.severity),
        Some(Severity::Critical)
    );
    assert_eq!(
        report.finding(RuleId::TemporalLeakage).map(|f| f.severity),
        Some(Severity::Critical)
    );
}

#[test]
fn malformed_artifacts_become_missing_data_findings() {
    let bars = flat_bars("SPY", &[100.0, 101.0, 102.0]);
    let result = simlab_runner::run_backtest(&buy_and_hold(10.0), &bars).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactManager::new(dir.path()).unwrap().save_run(&result).unwrap();
    std::fs::write(
        &paths.equity_csv,
        "timestamp,equity,cash,net_exposure,gross_exposure\nnot-a-number,1,1,0,0\n",
    )
    .unwrap();
    std::fs::write(&paths.summary_json, "{ \"final_equity\": ").unwrap();

    let loaded = ArtifactManager::open(dir.path()).load_run();
    assert_eq!(loaded.load_errors.len(), 2, "{:?}", loaded.load_errors);
    assert!(loaded.load_errors[0].contains("Malformed equity row 1"));
    assert!(loaded.load_errors[1].starts_with("summary.json"));
    assert!(loaded.equity_curve.is_empty());
    assert!(loaded.summary.is_none());
    assert_eq!(loaded.trades, result.trades);

    let report = Verifier::default().verify(&loaded.verification_input());
    let f = report.finding(RuleId::MissingData).unwrap();
    assert_eq!(f.severity, Severity::Critical);
    let problems = f.evidence["problems"].as_array().unwrap();
    assert!(problems
        .iter()
        .any(|p| p.as_str().unwrap().contains("equity_curve.csv")));
    assert!(!report.passed);
}
