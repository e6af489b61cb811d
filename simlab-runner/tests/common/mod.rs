//! Shared fixtures for runner integration tests.

#![allow(dead_code)]

use simlab_core::data::SyntheticSeries;
use simlab_core::domain::Bar;
use simlab_core::rng::SeedHierarchy;
use simlab_core::strategy::{BuyAndHold, MeanReversion, Strategy, TsMomentum};
use simlab_runner::RunSpec;

pub const DAY: i64 = 86_400;

/// Daily bars whose open and close both equal the given prices.
pub fn flat_bars(symbol: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(i as i64 * DAY, symbol, c, c * 1.01, c * 0.99, c, 1_000_000.0))
        .collect()
}

pub fn synthetic(symbol: &str, bars: usize, seed: u64) -> Vec<Bar> {
    SyntheticSeries::daily(symbol, bars).generate(&SeedHierarchy::new(seed))
}

pub fn buy_and_hold(quantity: f64) -> RunSpec {
    RunSpec::new(
        100_000.0,
        42,
        Strategy::BuyAndHold(BuyAndHold::new("SPY", quantity)),
    )
}

pub fn momentum() -> RunSpec {
    RunSpec::new(
        100_000.0,
        42,
        Strategy::TsMomentum(TsMomentum::new("SPY", 20, 0.01, 20)),
    )
}

pub fn mean_reversion() -> RunSpec {
    RunSpec::new(
        100_000.0,
        7,
        Strategy::MeanReversion(MeanReversion::new("SPY", 20, 1.5, 50.0)),
    )
}
