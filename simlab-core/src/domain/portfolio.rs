//! Portfolio ledger: cash, positions, realized PnL and the equity curve.
//!
//! Strategies receive `&Portfolio`; every mutation goes through
//! [`Portfolio::apply_fill`], [`Portfolio::mark`] and [`Portfolio::record_equity`],
//! which only the driver holds a mutable borrow for.

use super::fill::Fill;
use super::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One equity observation, recorded at the end of every bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquitySample {
    pub timestamp: i64,
    pub equity: f64,
    pub cash: f64,
    /// Σ(quantity × mark); `equity == cash + net_exposure`.
    pub net_exposure: f64,
    pub gross_exposure: f64,
}

/// Mutable accounting state for a single run.
///
/// Positions and marks live in `BTreeMap`s so iteration (and therefore every
/// floating-point sum) happens in a fixed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    initial_cash: f64,
    cash: f64,
    positions: BTreeMap<String, Position>,
    marks: BTreeMap<String, f64>,
    realized_pnl: f64,
    total_commission: f64,
    equity_curve: Vec<EquitySample>,
}

impl Portfolio {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            cash: initial_cash,
            positions: BTreeMap::new(),
            marks: BTreeMap::new(),
            realized_pnl: 0.0,
            total_commission: 0.0,
            equity_curve: Vec::new(),
        }
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Signed quantity held in `symbol` (zero if never traded).
    pub fn quantity(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).map_or(0.0, Position::quantity)
    }

    /// Open (non-flat) positions in symbol order.
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values().filter(|p| !p.is_flat())
    }

    /// Last mark price seen for `symbol`.
    pub fn mark_price(&self, symbol: &str) -> Option<f64> {
        self.marks.get(symbol).copied()
    }

    pub fn equity_curve(&self) -> &[EquitySample] {
        &self.equity_curve
    }

    /// Apply a fill: update the position, debit/credit cash, accumulate
    /// realized PnL and commission. Returns the PnL realized by this fill.
    pub fn apply_fill(&mut self, fill: &Fill) -> f64 {
        let position = self
            .positions
            .entry(fill.symbol.clone())
            .or_insert_with(|| Position::flat(fill.symbol.clone()));
        let realized = position.apply(fill.signed_quantity(), fill.price);
        self.cash += fill.cash_delta();
        self.realized_pnl += realized;
        self.total_commission += fill.commission;
        realized
    }

    /// Record the latest observed price for `symbol`.
    pub fn mark(&mut self, symbol: &str, price: f64) {
        match self.marks.get_mut(symbol) {
            Some(p) => *p = price,
            None => {
                self.marks.insert(symbol.to_string(), price);
            }
        }
    }

    /// Price used to value a position: last mark, else its cost basis.
    fn valuation_price(&self, position: &Position) -> f64 {
        self.marks
            .get(position.symbol())
            .copied()
            .or_else(|| position.avg_cost())
            .unwrap_or(0.0)
    }

    /// Σ(quantity × mark) over open positions.
    pub fn positions_value(&self) -> f64 {
        self.open_positions()
            .map(|p| p.market_value(self.valuation_price(p)))
            .sum()
    }

    /// Σ|quantity × mark| over open positions.
    pub fn gross_exposure(&self) -> f64 {
        self.open_positions()
            .map(|p| p.market_value(self.valuation_price(p)).abs())
            .sum()
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.open_positions()
            .map(|p| p.unrealized_pnl(self.valuation_price(p)))
            .sum()
    }

    /// `cash + Σ(quantity × mark)`.
    pub fn equity(&self) -> f64 {
        self.cash + self.positions_value()
    }

    /// Gross exposure divided by equity. Infinite when equity is exhausted
    /// while positions remain open.
    pub fn leverage(&self) -> f64 {
        let gross = self.gross_exposure();
        let equity = self.equity();
        if gross == 0.0 {
            0.0
        } else if equity <= 0.0 {
            f64::INFINITY
        } else {
            gross / equity
        }
    }

    /// Append an equity sample for the bar at `timestamp`.
    ///
    /// In debug builds the equity identity is re-derived position by position
    /// and asserted against the ledger's own figure.
    pub fn record_equity(&mut self, timestamp: i64) -> EquitySample {
        let sample = EquitySample {
            timestamp,
            equity: self.equity(),
            cash: self.cash,
            net_exposure: self.positions_value(),
            gross_exposure: self.gross_exposure(),
        };

        #[cfg(debug_assertions)]
        {
            let mut expected = self.cash;
            for pos in self.positions.values() {
                if let Some(price) = self.marks.get(pos.symbol()) {
                    expected += pos.quantity() * price;
                } else if let Some(avg) = pos.avg_cost() {
                    expected += pos.quantity() * avg;
                }
            }
            let tolerance = 1e-9 * expected.abs().max(1.0);
            debug_assert!(
                (sample.equity - expected).abs() <= tolerance,
                "equity identity violated at {timestamp}: {} != {expected}",
                sample.equity
            );
        }

        self.equity_curve.push(sample);
        sample
    }

    /// Hand the equity curve over to the caller, leaving it empty.
    pub fn take_equity_curve(&mut self) -> Vec<EquitySample> {
        std::mem::take(&mut self.equity_curve)
    }
}
