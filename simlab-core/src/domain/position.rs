//! Position: signed per-instrument quantity with volume-weighted average cost.

use serde::{Deserialize, Serialize};

/// Quantities with smaller magnitude are treated as flat.
pub const QTY_EPSILON: f64 = 1e-9;

/// A signed holding in one instrument.
///
/// The average cost is only meaningful while the position is open, so it is
/// exposed through [`Position::avg_cost`] as an `Option`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    symbol: String,
    quantity: f64,
    avg_cost: f64,
}

impl Position {
    pub fn flat(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: 0.0,
            avg_cost: 0.0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Signed quantity: positive long, negative short.
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Volume-weighted average cost, `None` while flat.
    pub fn avg_cost(&self) -> Option<f64> {
        if self.is_flat() {
            None
        } else {
            Some(self.avg_cost)
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity.abs() < QTY_EPSILON
    }

    pub fn is_long(&self) -> bool {
        self.quantity >= QTY_EPSILON
    }

    pub fn is_short(&self) -> bool {
        self.quantity <= -QTY_EPSILON
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self.avg_cost() {
            Some(avg) => self.quantity * (price - avg),
            None => 0.0,
        }
    }

    /// Apply a signed fill quantity at `price`. Returns the PnL realized on
    /// the closed portion (zero when the fill only adds to the position).
    ///
    /// A fill larger than an opposite-direction position closes it fully and
    /// opens the remainder at `price`.
    pub fn apply(&mut self, signed_qty: f64, price: f64) -> f64 {
        if signed_qty.abs() < QTY_EPSILON {
            return 0.0;
        }

        if self.is_flat() {
            self.quantity = signed_qty;
            self.avg_cost = price;
            return 0.0;
        }

        let direction = self.quantity.signum();
        if signed_qty.signum() == direction {
            let new_qty = self.quantity + signed_qty;
            self.avg_cost =
                (self.quantity.abs() * self.avg_cost + signed_qty.abs() * price) / new_qty.abs();
            self.quantity = new_qty;
            return 0.0;
        }

        let closed_qty = signed_qty.abs().min(self.quantity.abs());
        let realized = closed_qty * (price - self.avg_cost) * direction;
        let remaining = self.quantity + signed_qty;

        if remaining.abs() < QTY_EPSILON {
            self.quantity = 0.0;
            self.avg_cost = 0.0;
        } else if remaining.signum() == direction {
            // Partial close keeps the original cost basis.
            self.quantity = remaining;
        } else {
            self.quantity = remaining;
            self.avg_cost = price;
        }
        realized
    }
}
