use crate::domain::{OrderRequest, Portfolio, Side};
use crate::engine::{require_positive, MarketView, ParameterError};
use serde::{Deserialize, Serialize};

use super::StrategyLogic;

/// Buys a fixed quantity on the first bar it sees while flat, then holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyAndHold {
    pub symbol: String,
    pub quantity: f64,
}

impl BuyAndHold {
    pub fn new(symbol: impl Into<String>, quantity: f64) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
        }
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        require_positive("quantity", self.quantity)
    }
}

impl StrategyLogic for BuyAndHold {
    fn name(&self) -> &'static str {
        "buy_and_hold"
    }

    fn on_bar(&self, view: &MarketView<'_>, portfolio: &Portfolio) -> Vec<OrderRequest> {
        if view.symbol() != self.symbol {
            return vec![];
        }
        let flat = portfolio.position(&self.symbol).map_or(true, |p| p.is_flat());
        if flat {
            vec![OrderRequest::market(&self.symbol, Side::Buy, self.quantity)]
        } else {
            vec![]
        }
    }
}
