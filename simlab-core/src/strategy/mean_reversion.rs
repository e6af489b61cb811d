//! Z-score mean reversion: fade moves beyond `num_std` deviations, exit at the mean.

use crate::domain::{OrderRequest, Portfolio, Side};
use crate::engine::{require_positive, MarketView, ParameterError};
use serde::{Deserialize, Serialize};

use super::stats::{mean, std_dev};
use super::{require_window, StrategyLogic};

fn default_lookback() -> usize {
    20
}
fn default_num_std() -> f64 {
    2.0
}
fn default_quantity() -> f64 {
    100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanReversion {
    pub symbol: String,
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    #[serde(default = "default_num_std")]
    pub num_std: f64,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
}

impl MeanReversion {
    pub fn new(symbol: impl Into<String>, lookback: usize, num_std: f64, quantity: f64) -> Self {
        Self {
            symbol: symbol.into(),
            lookback,
            num_std,
            quantity,
        }
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        require_window("lookback", self.lookback, 2)?;
        require_positive("num_std", self.num_std)?;
        require_positive("quantity", self.quantity)
    }

    fn z_score(closes: &[f64]) -> Option<f64> {
        let sd = std_dev(closes);
        if sd < 1e-12 {
            return None;
        }
        let last = *closes.last()?;
        Some((last - mean(closes)) / sd)
    }
}

impl StrategyLogic for MeanReversion {
    fn name(&self) -> &'static str {
        "mean_reversion"
    }

    fn on_bar(&self, view: &MarketView<'_>, portfolio: &Portfolio) -> Vec<OrderRequest> {
        if view.symbol() != self.symbol {
            return vec![];
        }
        let closes = view.closes(&self.symbol, self.lookback);
        if closes.len() < self.lookback {
            return vec![];
        }
        let Some(z) = Self::z_score(&closes) else {
            return vec![];
        };

        let held = portfolio.quantity(&self.symbol);
        let position = portfolio.position(&self.symbol);
        let is_long = position.is_some_and(|p| p.is_long());
        let is_short = position.is_some_and(|p| p.is_short());

        let order = if is_long && z >= 0.0 {
            OrderRequest::market(&self.symbol, Side::Sell, held)
        } else if is_short && z <= 0.0 {
            OrderRequest::market(&self.symbol, Side::Buy, -held)
        } else if !is_long && !is_short && z < -self.num_std {
            OrderRequest::market(&self.symbol, Side::Buy, self.quantity)
        } else if !is_long && !is_short && z > self.num_std {
            OrderRequest::market(&self.symbol, Side::Sell, self.quantity)
        } else {
            return vec![];
        };
        vec![order]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_score_sign_follows_last_price() {
        let z = MeanReversion::z_score(&[10.0, 10.0, 10.0, 13.0]).unwrap();
        assert!(z > 1.0);
        let z = MeanReversion::z_score(&[10.0, 10.0, 10.0, 7.0]).unwrap();
        assert!(z < -1.0);
    }

    #[test]
    fn constant_series_has_no_z() {
        assert_eq!(MeanReversion::z_score(&[5.0; 10]), None);
    }
}
