//! Order-execution simulator: turns a bar's orders into fills or rejections.
//!
//! Every order yields exactly one outcome: a fill, a rejection, or (under a
//! partial-fill model) a fill plus a rejection recording the unfilled
//! remainder. Nothing is dropped without a reason.

use super::cost_model::CostModel;
use super::error::{require_positive, ParameterError};
use crate::domain::{Bar, Fill, Order, OrderId, OrderType, Portfolio, PriceReference, Side, QTY_EPSILON};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// How much of an order can execute on one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartialFillModel {
    /// Orders fill completely.
    #[default]
    None,
    /// Total filled quantity per bar is capped at a fraction of bar volume.
    VolumeCap { max_participation: f64 },
    /// Each order fills a seeded-random fraction in `[min_fraction, 1]`.
    Random { min_fraction: f64 },
}

fn default_true() -> bool {
    true
}

/// Execution settings. Fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Bar price every order fills against.
    #[serde(default)]
    pub fill_timing: PriceReference,
    /// Allow sells that take a position below zero.
    #[serde(default = "default_true")]
    pub allow_short: bool,
    /// Allow fills that leave cash negative after costs.
    #[serde(default = "default_true")]
    pub allow_margin: bool,
    #[serde(default)]
    pub partial_fills: PartialFillModel,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            fill_timing: PriceReference::Close,
            allow_short: true,
            allow_margin: true,
            partial_fills: PartialFillModel::None,
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> Result<(), ParameterError> {
        match self.partial_fills {
            PartialFillModel::None => Ok(()),
            PartialFillModel::VolumeCap { max_participation } => {
                require_positive("max_participation", max_participation)?;
                if max_participation > 1.0 {
                    return Err(ParameterError::new(
                        "max_participation",
                        "at most 1.0",
                        max_participation,
                    ));
                }
                Ok(())
            }
            PartialFillModel::Random { min_fraction } => {
                require_positive("min_fraction", min_fraction)?;
                if min_fraction > 1.0 {
                    return Err(ParameterError::new(
                        "min_fraction",
                        "at most 1.0",
                        min_fraction,
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Why an order (or part of one) did not execute.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    #[error("quantity {quantity} is not a positive finite number")]
    InvalidQuantity { quantity: f64 },
    #[error("only market orders are supported")]
    UnsupportedOrderType,
    #[error("order symbol does not match bar symbol {bar_symbol}")]
    SymbolMismatch { bar_symbol: String },
    #[error("shorting disallowed: holding {held}, asked to sell {requested}")]
    ShortingDisallowed { held: f64, requested: f64 },
    #[error("insufficient cash: need {required:.2}, have {available:.2}")]
    InsufficientCash { required: f64, available: f64 },
    #[error("no volume left on this bar")]
    ZeroLiquidity,
    #[error("{unfilled} units left unfilled")]
    PartialFillRemainder { unfilled: f64 },
}

/// A recorded rejection, tied back to its order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub order_id: OrderId,
    pub timestamp: i64,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub reason: RejectReason,
}

/// Outcome of executing one bar's orders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    pub fills: Vec<Fill>,
    pub rejections: Vec<Rejection>,
}

/// Working state while a bar's orders are processed in submission order.
struct BarBook {
    cash: f64,
    held: f64,
    volume_left: f64,
}

/// Market-order execution against a single bar.
///
/// The RNG is only drawn from under [`PartialFillModel::Random`]; it is
/// seeded by the driver so identical inputs produce identical fills.
#[derive(Debug, Clone)]
pub struct ExecutionSimulator {
    config: ExecutionConfig,
    cost_model: CostModel,
    rng: StdRng,
}

impl ExecutionSimulator {
    pub fn new(config: ExecutionConfig, cost_model: CostModel, rng: StdRng) -> Self {
        Self {
            config,
            cost_model,
            rng,
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    /// Execute `orders` against `bar`, validating each against the
    /// portfolio state left by the orders before it.
    pub fn execute(&mut self, orders: &[Order], bar: &Bar, portfolio: &Portfolio) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let volume_cap = match self.config.partial_fills {
            PartialFillModel::VolumeCap { max_participation } => bar.volume * max_participation,
            _ => f64::INFINITY,
        };
        let mut book = BarBook {
            cash: portfolio.cash(),
            held: portfolio.quantity(&bar.symbol),
            volume_left: volume_cap,
        };

        for order in orders {
            match self.fill_order(order, bar, &mut book) {
                Ok((fill, unfilled)) => {
                    if unfilled > QTY_EPSILON {
                        report.rejections.push(rejection(
                            order,
                            bar,
                            RejectReason::PartialFillRemainder { unfilled },
                        ));
                    }
                    report.fills.push(fill);
                }
                Err(reason) => {
                    debug!(
                        order = %order.id,
                        symbol = %order.symbol,
                        timestamp = bar.timestamp,
                        %reason,
                        "order rejected"
                    );
                    report.rejections.push(rejection(order, bar, reason));
                }
            }
        }
        report
    }

    fn fill_order(
        &mut self,
        order: &Order,
        bar: &Bar,
        book: &mut BarBook,
    ) -> Result<(Fill, f64), RejectReason> {
        if !order.quantity.is_finite() || order.quantity < QTY_EPSILON {
            return Err(RejectReason::InvalidQuantity {
                quantity: order.quantity,
            });
        }
        if !matches!(order.order_type, OrderType::Market) {
            return Err(RejectReason::UnsupportedOrderType);
        }
        if order.symbol != bar.symbol {
            return Err(RejectReason::SymbolMismatch {
                bar_symbol: bar.symbol.clone(),
            });
        }

        let quantity = self.executable_quantity(order.quantity, book)?;

        if order.side == Side::Sell && !self.config.allow_short && book.held - quantity < -QTY_EPSILON {
            return Err(RejectReason::ShortingDisallowed {
                held: book.held,
                requested: quantity,
            });
        }

        let reference = self.config.fill_timing;
        let reference_price = bar.price(reference);
        let slippage = self.cost_model.slippage(quantity, reference_price, order.side);
        let price = reference_price + slippage;
        let commission = self.cost_model.commission(quantity, price);
        let cash_delta = -quantity * order.side.sign() * price - commission;

        // Applies to both sides: a sell's costs can exceed its proceeds.
        if !self.config.allow_margin && book.cash + cash_delta < 0.0 {
            return Err(RejectReason::InsufficientCash {
                required: -cash_delta,
                available: book.cash,
            });
        }

        book.cash += cash_delta;
        book.held += quantity * order.side.sign();
        book.volume_left -= quantity;

        let fill = Fill {
            order_id: order.id,
            timestamp: bar.timestamp,
            decision_timestamp: order.decision_timestamp,
            decision_phase: order.decision_phase,
            symbol: order.symbol.clone(),
            side: order.side,
            quantity,
            price,
            commission,
            slippage,
            reference,
        };
        Ok((fill, order.quantity - quantity))
    }

    /// Quantity that can execute now under the partial-fill model.
    fn executable_quantity(&mut self, requested: f64, book: &BarBook) -> Result<f64, RejectReason> {
        match self.config.partial_fills {
            PartialFillModel::None => Ok(requested),
            PartialFillModel::VolumeCap { .. } => {
                if book.volume_left < QTY_EPSILON {
                    Err(RejectReason::ZeroLiquidity)
                } else {
                    Ok(requested.min(book.volume_left))
                }
            }
            PartialFillModel::Random { min_fraction } => {
                let fraction = if min_fraction >= 1.0 {
                    1.0
                } else {
                    self.rng.gen_range(min_fraction..=1.0)
                };
                Ok(requested * fraction)
            }
        }
    }
}

fn rejection(order: &Order, bar: &Bar, reason: RejectReason) -> Rejection {
    Rejection {
        order_id: order.id,
        timestamp: bar.timestamp,
        symbol: order.symbol.clone(),
        side: order.side,
        quantity: order.quantity,
        reason,
    }
}
