//! Channel breakout, long only, sized by average true range.

use crate::domain::{OrderRequest, Portfolio, Side};
use crate::engine::{require_positive, MarketView, ParameterError};
use serde::{Deserialize, Serialize};

use super::stats::average_true_range;
use super::{require_window, StrategyLogic};

fn default_lookback() -> usize {
    20
}
fn default_atr_period() -> usize {
    14
}
fn default_risk_fraction() -> f64 {
    0.01
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakout {
    pub symbol: String,
    /// Channel length, excluding the bar being evaluated.
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
    /// Fraction of equity risked per ATR of adverse move.
    #[serde(default = "default_risk_fraction")]
    pub risk_fraction: f64,
}

impl Breakout {
    pub fn new(symbol: impl Into<String>, lookback: usize, atr_period: usize, risk_fraction: f64) -> Self {
        Self {
            symbol: symbol.into(),
            lookback,
            atr_period,
            risk_fraction,
        }
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        require_window("lookback", self.lookback, 1)?;
        require_window("atr_period", self.atr_period, 1)?;
        require_positive("risk_fraction", self.risk_fraction)
    }

    fn window(&self) -> usize {
        self.lookback.max(self.atr_period) + 1
    }
}

impl StrategyLogic for Breakout {
    fn name(&self) -> &'static str {
        "breakout"
    }

    fn on_bar(&self, view: &MarketView<'_>, portfolio: &Portfolio) -> Vec<OrderRequest> {
        if view.symbol() != self.symbol {
            return vec![];
        }
        let bars = view.history(&self.symbol, self.window());
        if bars.len() < self.window() {
            return vec![];
        }
        let (last, prior) = match bars.split_last() {
            Some(split) => split,
            None => return vec![],
        };
        let channel = &prior[prior.len() - self.lookback..];
        let upper = channel.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let lower = channel.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

        let held = portfolio.quantity(&self.symbol);
        let is_long = portfolio.position(&self.symbol).is_some_and(|p| p.is_long());

        if is_long && last.close < lower {
            return vec![OrderRequest::market(&self.symbol, Side::Sell, held)];
        }
        if !is_long && last.close > upper {
            let Some(atr) = average_true_range(&bars, self.atr_period) else {
                return vec![];
            };
            if atr <= 0.0 {
                return vec![];
            }
            let quantity = (portfolio.equity() * self.risk_fraction / atr).floor();
            if quantity >= 1.0 {
                return vec![OrderRequest::market(&self.symbol, Side::Buy, quantity)];
            }
        }
        vec![]
    }
}
