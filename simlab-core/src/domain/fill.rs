//! Fill: the realized result of executing an order against a bar.

use super::bar::PriceReference;
use super::ids::OrderId;
use super::order::Side;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    /// Timestamp of the bar the order executed against.
    pub timestamp: i64,
    /// Timestamp of the newest bar the deciding strategy had read.
    pub decision_timestamp: i64,
    /// Phase of that bar the strategy had seen.
    pub decision_phase: PriceReference,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    /// Reference price adjusted by slippage.
    pub price: f64,
    pub commission: f64,
    /// Signed per-unit price adjustment applied to the reference price.
    pub slippage: f64,
    pub reference: PriceReference,
}

impl Fill {
    pub fn signed_quantity(&self) -> f64 {
        self.quantity * self.side.sign()
    }

    pub fn notional(&self) -> f64 {
        (self.quantity * self.price).abs()
    }

    /// Change in cash caused by this fill, commission included.
    pub fn cash_delta(&self) -> f64 {
        -self.signed_quantity() * self.price - self.commission
    }
}
