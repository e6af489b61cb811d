//! Seeded synthetic OHLCV series (geometric random walk).

use crate::domain::Bar;
use crate::rng::SeedHierarchy;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Parameters of a synthetic random-walk series for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSeries {
    pub symbol: String,
    pub start_timestamp: i64,
    pub step_seconds: i64,
    pub bars: usize,
    pub start_price: f64,
    /// Mean log return per bar.
    pub drift: f64,
    /// Standard deviation of log returns per bar.
    pub volatility: f64,
}

impl SyntheticSeries {
    /// Daily bars starting 2020-01-01 UTC at 100.0.
    pub fn daily(symbol: impl Into<String>, bars: usize) -> Self {
        Self {
            symbol: symbol.into(),
            start_timestamp: 1_577_836_800,
            step_seconds: 86_400,
            bars,
            start_price: 100.0,
            drift: 0.0003,
            volatility: 0.012,
        }
    }

    /// Generate bars from the seed's `synthetic:{symbol}` stream.
    pub fn generate(&self, seeds: &SeedHierarchy) -> Vec<Bar> {
        let mut rng = seeds.stream(&format!("synthetic:{}", self.symbol));
        self.generate_with(&mut rng)
    }

    pub fn generate_with(&self, rng: &mut StdRng) -> Vec<Bar> {
        let mut bars = Vec::with_capacity(self.bars);
        let mut prev_close = self.start_price;
        for i in 0..self.bars {
            let open = prev_close * (1.0 + 0.25 * self.volatility * standard_normal(rng)).max(0.5);
            let close = prev_close * (self.drift + self.volatility * standard_normal(rng)).exp();
            let wick_up = 1.0 + 0.5 * self.volatility * standard_normal(rng).abs();
            let wick_down = 1.0 - (0.5 * self.volatility * standard_normal(rng).abs()).min(0.5);
            let high = open.max(close) * wick_up;
            let low = open.min(close) * wick_down;
            let volume = (1_000_000.0 * (0.5 + rng.gen::<f64>())).round();
            bars.push(Bar {
                timestamp: self.start_timestamp + i as i64 * self.step_seconds,
                symbol: self.symbol.clone(),
                open,
                high,
                low,
                close,
                volume,
            });
            prev_close = close;
        }
        bars
    }
}

/// Box-Muller standard normal draw.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Merge several series into one tape ordered by timestamp, then symbol.
pub fn interleave(series: Vec<Vec<Bar>>) -> Vec<Bar> {
    let mut all: Vec<Bar> = series.into_iter().flatten().collect();
    all.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.symbol.cmp(&b.symbol)));
    all
}
