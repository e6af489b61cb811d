//! Cost model: commission and slippage.
//!
//! Pure functions of their arguments. Slippage is adverse and side-signed:
//! buyers pay above the reference price, sellers receive below it.

use super::error::{require_non_negative, ParameterError};
use crate::domain::{Side, QTY_EPSILON};
use serde::{Deserialize, Serialize};

fn default_per_unit() -> f64 {
    0.005
}

fn default_rate() -> f64 {
    0.001
}

fn default_minimum() -> f64 {
    1.0
}

/// Commission/slippage variants, selected by the `type` tag in a run spec.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CostModel {
    /// Frictionless baseline.
    #[default]
    Zero,
    /// `max(|q| × per_unit, minimum)`.
    FixedPerUnit {
        #[serde(default = "default_per_unit")]
        per_unit: f64,
        #[serde(default = "default_minimum")]
        minimum: f64,
        #[serde(default)]
        slippage_bps: f64,
    },
    /// `max(|q| × price × rate, minimum)`.
    Percentage {
        #[serde(default = "default_rate")]
        rate: f64,
        #[serde(default = "default_minimum")]
        minimum: f64,
        #[serde(default)]
        slippage_bps: f64,
    },
}

impl CostModel {
    pub fn fixed_per_unit(per_unit: f64, minimum: f64) -> Self {
        CostModel::FixedPerUnit {
            per_unit,
            minimum,
            slippage_bps: 0.0,
        }
    }

    pub fn percentage(rate: f64, minimum: f64) -> Self {
        CostModel::Percentage {
            rate,
            minimum,
            slippage_bps: 0.0,
        }
    }

    /// Same commission schedule with the given slippage. No-op for `Zero`.
    pub fn with_slippage_bps(mut self, bps: f64) -> Self {
        match &mut self {
            CostModel::Zero => {}
            CostModel::FixedPerUnit { slippage_bps, .. }
            | CostModel::Percentage { slippage_bps, .. } => *slippage_bps = bps,
        }
        self
    }

    pub fn name(&self) -> &'static str {
        match self {
            CostModel::Zero => "zero",
            CostModel::FixedPerUnit { .. } => "fixed_per_unit",
            CostModel::Percentage { .. } => "percentage",
        }
    }

    pub fn slippage_bps(&self) -> f64 {
        match self {
            CostModel::Zero => 0.0,
            CostModel::FixedPerUnit { slippage_bps, .. }
            | CostModel::Percentage { slippage_bps, .. } => *slippage_bps,
        }
    }

    /// Commission for trading `quantity` units at `price`. Never negative;
    /// zero for a zero-size trade.
    pub fn commission(&self, quantity: f64, price: f64) -> f64 {
        let qty = quantity.abs();
        if qty < QTY_EPSILON {
            return 0.0;
        }
        let amount = match *self {
            CostModel::Zero => 0.0,
            CostModel::FixedPerUnit {
                per_unit, minimum, ..
            } => (qty * per_unit).max(minimum),
            CostModel::Percentage { rate, minimum, .. } => (qty * price.abs() * rate).max(minimum),
        };
        amount.max(0.0)
    }

    /// Signed per-unit price adjustment for a trade of `quantity` at `price`.
    ///
    /// Proportional to price; the bps schedules here do not depend on size.
    pub fn slippage(&self, _quantity: f64, price: f64, side: Side) -> f64 {
        side.sign() * price * self.slippage_bps() / 10_000.0
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        match *self {
            CostModel::Zero => Ok(()),
            CostModel::FixedPerUnit {
                per_unit,
                minimum,
                slippage_bps,
            } => {
                require_non_negative("per_unit", per_unit)?;
                require_non_negative("minimum", minimum)?;
                validate_slippage(slippage_bps)
            }
            CostModel::Percentage {
                rate,
                minimum,
                slippage_bps,
            } => {
                require_non_negative("rate", rate)?;
                require_non_negative("minimum", minimum)?;
                validate_slippage(slippage_bps)
            }
        }
    }
}

fn validate_slippage(bps: f64) -> Result<(), ParameterError> {
    require_non_negative("slippage_bps", bps)?;
    if bps >= 10_000.0 {
        return Err(ParameterError::new(
            "slippage_bps",
            "below 10000",
            bps,
        ));
    }
    Ok(())
}
