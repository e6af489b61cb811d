//! Strategies: pure decision functions over a market view and a ledger snapshot.
//!
//! The set is closed: [`Strategy`] is a tagged enum built straight from the
//! run spec, dispatched through [`StrategyLogic`]. The driver is generic over
//! `StrategyLogic`, so tests can plug in deliberately flawed implementations
//! without opening the production set.

mod breakout;
mod buy_and_hold;
mod mean_reversion;
pub mod stats;
mod ts_momentum;

pub use breakout::Breakout;
pub use buy_and_hold::BuyAndHold;
pub use mean_reversion::MeanReversion;
pub use ts_momentum::TsMomentum;

use crate::domain::{OrderRequest, Portfolio};
use crate::engine::{MarketView, ParameterError};
use serde::{Deserialize, Serialize};

/// Fixed interface between the driver and a strategy.
///
/// `on_bar` takes `&self` and an immutable portfolio: a strategy cannot
/// mutate ledger state or carry hidden state between bars.
pub trait StrategyLogic {
    fn name(&self) -> &'static str;

    /// Orders to submit on the bar the view is positioned at.
    fn on_bar(&self, view: &MarketView<'_>, portfolio: &Portfolio) -> Vec<OrderRequest>;
}

impl<T: StrategyLogic + ?Sized> StrategyLogic for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn on_bar(&self, view: &MarketView<'_>, portfolio: &Portfolio) -> Vec<OrderRequest> {
        (**self).on_bar(view, portfolio)
    }
}

/// Every strategy the engine ships, selected by the `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Strategy {
    BuyAndHold(BuyAndHold),
    TsMomentum(TsMomentum),
    MeanReversion(MeanReversion),
    Breakout(Breakout),
}

impl Strategy {
    /// Instrument the strategy trades.
    pub fn symbol(&self) -> &str {
        match self {
            Strategy::BuyAndHold(s) => &s.symbol,
            Strategy::TsMomentum(s) => &s.symbol,
            Strategy::MeanReversion(s) => &s.symbol,
            Strategy::Breakout(s) => &s.symbol,
        }
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        match self {
            Strategy::BuyAndHold(s) => s.validate(),
            Strategy::TsMomentum(s) => s.validate(),
            Strategy::MeanReversion(s) => s.validate(),
            Strategy::Breakout(s) => s.validate(),
        }
    }
}

impl StrategyLogic for Strategy {
    fn name(&self) -> &'static str {
        match self {
            Strategy::BuyAndHold(s) => s.name(),
            Strategy::TsMomentum(s) => s.name(),
            Strategy::MeanReversion(s) => s.name(),
            Strategy::Breakout(s) => s.name(),
        }
    }

    fn on_bar(&self, view: &MarketView<'_>, portfolio: &Portfolio) -> Vec<OrderRequest> {
        match self {
            Strategy::BuyAndHold(s) => s.on_bar(view, portfolio),
            Strategy::TsMomentum(s) => s.on_bar(view, portfolio),
            Strategy::MeanReversion(s) => s.on_bar(view, portfolio),
            Strategy::Breakout(s) => s.on_bar(view, portfolio),
        }
    }
}

/// Validate a lookback-style window length.
pub(crate) fn require_window(name: &'static str, value: usize, min: usize) -> Result<(), ParameterError> {
    if value >= min {
        Ok(())
    } else {
        Err(ParameterError::new(name, "at least the minimum window", value as f64))
    }
}
