//! Orders: requests produced by a strategy and stamped by the driver.

use super::bar::PriceReference;
use super::ids::OrderId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

/// Order type. The simulator only executes market orders; anything else is
/// rejected with a recorded reason.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit { limit_price: f64 },
}

/// What a strategy asks for. Carries no id and no decision timestamp:
/// those are assigned by the driver so a strategy cannot forge them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    /// Always positive; direction lives in `side`.
    pub quantity: f64,
    pub order_type: OrderType,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, side: Side, quantity: f64) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            order_type: OrderType::Market,
        }
    }

    /// Market order moving a position by `delta` units (positive = buy).
    ///
    /// Returns `None` when `|delta|` does not exceed `min_size`.
    pub fn for_delta(symbol: &str, delta: f64, min_size: f64) -> Option<Self> {
        if !delta.is_finite() || delta.abs() <= min_size {
            return None;
        }
        let side = if delta > 0.0 { Side::Buy } else { Side::Sell };
        Some(Self::market(symbol, side, delta.abs()))
    }
}

/// An order submitted to the execution simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub order_type: OrderType,
    /// Timestamp of the newest bar the strategy read before issuing this order.
    pub decision_timestamp: i64,
    /// How much of that bar was known: only its open, or the full bar.
    pub decision_phase: PriceReference,
}

impl Order {
    pub fn from_request(
        request: OrderRequest,
        id: OrderId,
        decision_timestamp: i64,
        decision_phase: PriceReference,
    ) -> Self {
        Self {
            id,
            symbol: request.symbol,
            side: request.side,
            quantity: request.quantity,
            order_type: request.order_type,
            decision_timestamp,
            decision_phase,
        }
    }

    pub fn signed_quantity(&self) -> f64 {
        self.quantity * self.side.sign()
    }
}
