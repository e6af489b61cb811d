//! Look-ahead contamination tests.
//!
//! Run each strategy on the full series and on truncated prefixes. Without
//! lookahead, the fills on the prefix must match the full run's fills on the
//! same bars exactly. With fault injection leaking one future bar, they must not.

mod common;

use common::DAY;
use simlab_core::data::{SyntheticSeries, VecSequencer};
use simlab_core::domain::{Bar, Fill};
use simlab_core::engine::{BacktestDriver, DriverConfig, FaultProfile};
use simlab_core::rng::SeedHierarchy;
use simlab_core::strategy::{Breakout, MeanReversion, Strategy, TsMomentum};

fn bars() -> Vec<Bar> {
    let mut spec = SyntheticSeries::daily("SPY", 160);
    spec.volatility = 0.02;
    spec.generate(&SeedHierarchy::new(2024))
}

fn fills(strategy: &Strategy, bars: &[Bar], fault: FaultProfile) -> Vec<Fill> {
    let config = DriverConfig::new(100_000.0, 5).with_fault(fault);
    BacktestDriver::new(config, VecSequencer::new(bars.to_vec()), strategy)
        .unwrap()
        .run()
        .unwrap()
        .fills
}

fn strategies() -> Vec<Strategy> {
    vec![
        Strategy::TsMomentum(TsMomentum::new("SPY", 20, 0.01, 10)),
        Strategy::MeanReversion(MeanReversion::new("SPY", 15, 1.5, 50.0)),
        Strategy::Breakout(Breakout::new("SPY", 10, 5, 0.02)),
    ]
}

fn prefix_mismatch(strategy: &Strategy, fault: FaultProfile) -> Option<usize> {
    let tape = bars();
    let full = fills(strategy, &tape, fault);
    for cut in 30..tape.len() {
        let cutoff = tape[cut - 1].timestamp;
        let truncated = fills(strategy, &tape[..cut], fault);
        let expected: Vec<&Fill> = full.iter().filter(|f| f.timestamp <= cutoff).collect();
        let got: Vec<&Fill> = truncated.iter().collect();
        if expected != got {
            return Some(cut);
        }
    }
    None
}

#[test]
fn no_lookahead_in_shipped_strategies() {
    for strategy in strategies() {
        assert_eq!(
            prefix_mismatch(&strategy, FaultProfile::disabled()),
            None,
            "{strategy:?} changed its past decisions when future bars were added"
        );
    }
}

#[test]
fn leaked_future_bar_is_visible_in_prefix_comparison() {
    let strategy = Strategy::TsMomentum(TsMomentum::new("SPY", 20, 0.01, 10));
    assert!(prefix_mismatch(&strategy, FaultProfile::leak_future_bars(1)).is_some());
}

#[test]
fn leaked_decisions_are_stamped_after_their_fills() {
    let strategy = Strategy::TsMomentum(TsMomentum::new("SPY", 20, 0.01, 10));
    let leaked = fills(&strategy, &bars(), FaultProfile::leak_future_bars(1));
    assert!(leaked
        .iter()
        .any(|f| f.decision_timestamp == f.timestamp + DAY));

    let clean = fills(&strategy, &bars(), FaultProfile::disabled());
    assert!(clean.iter().all(|f| f.decision_timestamp <= f.timestamp));
}
