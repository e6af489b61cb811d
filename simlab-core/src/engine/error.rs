//! Fatal engine errors and parameter validation errors.

use crate::domain::BarDefect;
use thiserror::Error;

/// Lifecycle of a [`BacktestDriver`](super::BacktestDriver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Ready,
    Running,
    Completed,
    Failed,
}

/// A parameter outside its allowed domain.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{name} must be {requirement} (got {value})")]
pub struct ParameterError {
    pub name: &'static str,
    pub requirement: &'static str,
    pub value: f64,
}

impl ParameterError {
    pub fn new(name: &'static str, requirement: &'static str, value: f64) -> Self {
        Self {
            name,
            requirement,
            value,
        }
    }
}

/// Check `value > 0` and finite.
pub fn require_positive(name: &'static str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::new(name, "positive and finite", value))
    }
}

/// Check `value >= 0` and finite.
pub fn require_non_negative(name: &'static str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ParameterError::new(name, "non-negative and finite", value))
    }
}

/// Fatal conditions. Any of these aborts the run; none is recovered.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("initial cash must be positive and finite, got {0}")]
    InvalidInitialCash(f64),

    #[error(
        "non-monotonic timestamp at bar {index} ({symbol}): {timestamp} precedes {previous}"
    )]
    NonMonotonicTimestamp {
        index: usize,
        symbol: String,
        previous: i64,
        timestamp: i64,
    },

    #[error("invalid bar at index {index} ({symbol} @ {timestamp}): {defect}")]
    InvalidBar {
        index: usize,
        symbol: String,
        timestamp: i64,
        defect: BarDefect,
    },

    #[error("driver cannot start from state {0:?}")]
    InvalidState(RunState),

    #[error("invalid parameter: {0}")]
    Parameter(#[from] ParameterError),
}

impl EngineError {
    /// Timestamp of the offending bar, when the error is tied to one.
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            EngineError::NonMonotonicTimestamp { timestamp, .. }
            | EngineError::InvalidBar { timestamp, .. } => Some(*timestamp),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_checks() {
        assert!(require_positive("lookback", 3.0).is_ok());
        assert!(require_positive("lookback", 0.0).is_err());
        assert!(require_positive("lookback", f64::NAN).is_err());
        assert!(require_non_negative("minimum", 0.0).is_ok());
        assert!(require_non_negative("minimum", -0.5).is_err());
    }

    #[test]
    fn fatal_error_reports_offending_bar() {
        let err = EngineError::NonMonotonicTimestamp {
            index: 4,
            symbol: "SPY".into(),
            previous: 200,
            timestamp: 100,
        };
        assert_eq!(err.timestamp(), Some(100));
        assert!(err.to_string().contains("bar 4"));
    }
}
