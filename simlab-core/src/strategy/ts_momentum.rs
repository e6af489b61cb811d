//! Time-series momentum with volatility-scaled sizing.
//!
//! Direction comes from the return over the last `lookback` closes (dead
//! band of ±1%). Size targets `vol_target` per-bar volatility, capped at
//! `max_leverage` × equity.

use crate::domain::{OrderRequest, Portfolio};
use crate::engine::{require_positive, MarketView, ParameterError};
use serde::{Deserialize, Serialize};

use super::stats::{simple_returns, std_dev};
use super::{require_window, StrategyLogic};

const MOMENTUM_DEAD_BAND: f64 = 0.01;
const MIN_ORDER_SIZE: f64 = 0.1;

fn default_lookback() -> usize {
    20
}
fn default_vol_target() -> f64 {
    0.01
}
fn default_vol_lookback() -> usize {
    20
}
fn default_max_leverage() -> f64 {
    1.0
}
fn default_rebalance_band() -> f64 {
    0.1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsMomentum {
    pub symbol: String,
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    /// Target per-bar volatility of the position.
    #[serde(default = "default_vol_target")]
    pub vol_target: f64,
    #[serde(default = "default_vol_lookback")]
    pub vol_lookback: usize,
    #[serde(default = "default_max_leverage")]
    pub max_leverage: f64,
    /// Skip rebalances smaller than this fraction of the target size.
    #[serde(default = "default_rebalance_band")]
    pub rebalance_band: f64,
}

impl TsMomentum {
    pub fn new(symbol: impl Into<String>, lookback: usize, vol_target: f64, vol_lookback: usize) -> Self {
        Self {
            symbol: symbol.into(),
            lookback,
            vol_target,
            vol_lookback,
            max_leverage: default_max_leverage(),
            rebalance_band: default_rebalance_band(),
        }
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        require_window("lookback", self.lookback, 2)?;
        require_window("vol_lookback", self.vol_lookback, 2)?;
        require_positive("vol_target", self.vol_target)?;
        require_positive("max_leverage", self.max_leverage)?;
        crate::engine::require_non_negative("rebalance_band", self.rebalance_band)
    }

    fn window(&self) -> usize {
        self.lookback.max(self.vol_lookback + 1)
    }

    /// Signed target quantity, `None` until enough history exists.
    fn target_quantity(&self, closes: &[f64], price: f64, equity: f64) -> Option<f64> {
        if closes.len() < self.window() || price <= 0.0 || equity <= 0.0 {
            return None;
        }
        let momentum_window = &closes[closes.len() - self.lookback..];
        let start = momentum_window[0];
        let end = momentum_window[momentum_window.len() - 1];
        let momentum = (end - start) / start;

        let signal = if momentum > MOMENTUM_DEAD_BAND {
            1.0
        } else if momentum < -MOMENTUM_DEAD_BAND {
            -1.0
        } else {
            return Some(0.0);
        };

        let vol_window = &closes[closes.len() - self.vol_lookback - 1..];
        let vol = std_dev(&simple_returns(vol_window));
        let scale = if vol > 1e-12 {
            (self.vol_target / vol).min(self.max_leverage)
        } else {
            self.max_leverage
        };
        Some(signal * equity * scale / price)
    }
}

impl StrategyLogic for TsMomentum {
    fn name(&self) -> &'static str {
        "ts_momentum"
    }

    fn on_bar(&self, view: &MarketView<'_>, portfolio: &Portfolio) -> Vec<OrderRequest> {
        if view.symbol() != self.symbol {
            return vec![];
        }
        let closes = view.closes(&self.symbol, self.window());
        let price = view.reference_price();
        let Some(target) = self.target_quantity(&closes, price, portfolio.equity()) else {
            return vec![];
        };

        let delta = target - portfolio.quantity(&self.symbol);
        let min_size = MIN_ORDER_SIZE.max(self.rebalance_band * target.abs());
        OrderRequest::for_delta(&self.symbol, delta, min_size)
            .into_iter()
            .collect()
    }
}
