//! Bar: one OHLCV sample for one instrument at one timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which price of a bar an order fills against.
///
/// Ordered by when the price becomes known within a bar: `Open < Close`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceReference {
    Open,
    #[default]
    Close,
}

impl PriceReference {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceReference::Open => "open",
            PriceReference::Close => "close",
        }
    }
}

/// OHLCV bar. `timestamp` is unix seconds, UTC.
///
/// Immutable once produced by a sequencer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Reason a bar is unusable as simulation input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarDefect {
    #[error("price or volume is NaN or infinite")]
    NonFinite,
    #[error("price is zero or negative")]
    NonPositivePrice,
    #[error("volume is negative")]
    NegativeVolume,
    #[error("open/close outside the low..high range")]
    InvertedRange,
}

impl Bar {
    pub fn new(
        timestamp: i64,
        symbol: impl Into<String>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any OHLCV field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .any(|v| !v.is_finite())
    }

    /// Check `low <= {open, close} <= high`, positive prices and non-negative volume.
    pub fn validate(&self) -> Result<(), BarDefect> {
        if self.is_void() {
            return Err(BarDefect::NonFinite);
        }
        if self.low <= 0.0 || self.open <= 0.0 || self.close <= 0.0 || self.high <= 0.0 {
            return Err(BarDefect::NonPositivePrice);
        }
        if self.volume < 0.0 {
            return Err(BarDefect::NegativeVolume);
        }
        let in_range = |p: f64| self.low <= p && p <= self.high;
        if self.low > self.high || !in_range(self.open) || !in_range(self.close) {
            return Err(BarDefect::InvertedRange);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// The price an order fills against under the given reference.
    pub fn price(&self, reference: PriceReference) -> f64 {
        match reference {
            PriceReference::Open => self.open,
            PriceReference::Close => self.close,
        }
    }

    /// True range relative to a previous close (or high - low without one).
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        let hl = self.high - self.low;
        match prev_close {
            Some(pc) => hl.max((self.high - pc).abs()).max((self.low - pc).abs()),
            None => hl,
        }
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar::new(1_704_153_600, "SPY", 100.0, 105.0, 98.0, 103.0, 50_000.0)
    }

    #[test]
    fn bar_is_valid() {
        assert!(sample_bar().is_valid());
    }

    #[test]
    fn nan_close_is_non_finite() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert!(bar.is_void());
        assert_eq!(bar.validate(), Err(BarDefect::NonFinite));
    }

    #[test]
    fn negative_price_rejected() {
        let mut bar = sample_bar();
        bar.low = -1.0;
        assert_eq!(bar.validate(), Err(BarDefect::NonPositivePrice));
    }

    #[test]
    fn close_above_high_rejected() {
        let mut bar = sample_bar();
        bar.close = 106.0;
        assert_eq!(bar.validate(), Err(BarDefect::InvertedRange));
    }

    #[test]
    fn negative_volume_rejected() {
        let mut bar = sample_bar();
        bar.volume = -5.0;
        assert_eq!(bar.validate(), Err(BarDefect::NegativeVolume));
    }

    #[test]
    fn reference_price_selects_field() {
        let bar = sample_bar();
        assert_eq!(bar.price(PriceReference::Open), 100.0);
        assert_eq!(bar.price(PriceReference::Close), 103.0);
    }

    #[test]
    fn true_range_uses_previous_close_gap() {
        let bar = sample_bar();
        assert!((bar.true_range(None) - 7.0).abs() < 1e-12);
        assert!((bar.true_range(Some(90.0)) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn datetime_is_utc() {
        let dt = sample_bar().datetime().unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-02T00:00:00+00:00");
    }
}
