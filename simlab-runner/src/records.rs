//! Record-level views of a run: one row per fill, one row per equity sample.
//!
//! These are the shapes written to `trades.csv` / `equity_curve.csv` and the
//! only inputs the verifier needs, so a run can be re-verified from files.

use serde::{Deserialize, Serialize};
use simlab_core::domain::{EquitySample, Fill, PriceReference, Side};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: i64,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
    pub slippage: f64,
    pub decision_timestamp: i64,
    /// Phase of the decision bar that was known; logs without the column
    /// are read as full-bar decisions.
    #[serde(default)]
    pub decision_phase: PriceReference,
    pub reference: PriceReference,
}

impl TradeRecord {
    pub fn signed_quantity(&self) -> f64 {
        self.side.sign() * self.quantity
    }

    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }

    /// Change in cash caused by this trade, commission included.
    pub fn cash_delta(&self) -> f64 {
        -self.signed_quantity() * self.price - self.commission
    }
}

impl From<&Fill> for TradeRecord {
    fn from(fill: &Fill) -> Self {
        Self {
            timestamp: fill.timestamp,
            symbol: fill.symbol.clone(),
            side: fill.side,
            quantity: fill.quantity,
            price: fill.price,
            commission: fill.commission,
            slippage: fill.slippage,
            decision_timestamp: fill.decision_timestamp,
            decision_phase: fill.decision_phase,
            reference: fill.reference,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityRecord {
    pub timestamp: i64,
    pub equity: f64,
    pub cash: f64,
    pub net_exposure: f64,
    pub gross_exposure: f64,
}

impl EquityRecord {
    /// Gross exposure over equity; infinite once equity is gone but exposure remains.
    pub fn leverage(&self) -> f64 {
        if self.equity > 0.0 {
            self.gross_exposure / self.equity
        } else if self.gross_exposure > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }
}

impl From<&EquitySample> for EquityRecord {
    fn from(sample: &EquitySample) -> Self {
        Self {
            timestamp: sample.timestamp,
            equity: sample.equity,
            cash: sample.cash,
            net_exposure: sample.net_exposure,
            gross_exposure: sample.gross_exposure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simlab_core::domain::OrderId;

    #[test]
    fn trade_record_copies_fill() {
        let fill = Fill {
            order_id: OrderId(3),
            timestamp: 86_400,
            decision_timestamp: 86_400,
            decision_phase: PriceReference::Close,
            symbol: "SPY".into(),
            side: Side::Sell,
            quantity: 10.0,
            price: 101.0,
            commission: 1.0,
            slippage: -0.05,
            reference: PriceReference::Close,
        };
        let record = TradeRecord::from(&fill);
        assert_eq!(record.signed_quantity(), -10.0);
        assert!((record.cash_delta() - fill.cash_delta()).abs() < 1e-12);
        assert!((record.notional() - 1010.0).abs() < 1e-12);
    }

    #[test]
    fn leverage_edge_cases() {
        let rec = |equity, gross| EquityRecord {
            timestamp: 0,
            equity,
            cash: 0.0,
            net_exposure: 0.0,
            gross_exposure: gross,
        };
        assert!((rec(100.0, 150.0).leverage() - 1.5).abs() < 1e-12);
        assert_eq!(rec(0.0, 0.0).leverage(), 0.0);
        assert!(rec(-5.0, 10.0).leverage().is_infinite());
    }
}
