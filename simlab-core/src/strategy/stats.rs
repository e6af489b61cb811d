//! Small numeric helpers shared by strategies.

use crate::domain::Bar;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Simple returns between consecutive prices.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Simple average of the last `period` true ranges.
///
/// Needs `period + 1` bars so every true range has a previous close.
pub fn average_true_range(bars: &[&Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let tail = &bars[bars.len() - period - 1..];
    let sum: f64 = tail
        .windows(2)
        .map(|w| w[1].true_range(Some(w[0].close)))
        .sum();
    Some(sum / period as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v) - 5.0).abs() < 1e-12);
        assert!((std_dev(&v) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn returns_of_prices() {
        let r = simple_returns(&[100.0, 110.0, 99.0]);
        assert!((r[0] - 0.1).abs() < 1e-12);
        assert!((r[1] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn atr_needs_period_plus_one_bars() {
        let bars: Vec<Bar> = (0..4)
            .map(|i| Bar::new(i, "X", 10.0, 11.0, 9.0, 10.0, 1.0))
            .collect();
        let refs: Vec<&Bar> = bars.iter().collect();
        assert_eq!(average_true_range(&refs, 3), Some(2.0));
        assert_eq!(average_true_range(&refs, 4), None);
    }
}
