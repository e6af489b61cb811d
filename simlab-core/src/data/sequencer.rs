//! Market data sequencer: ordered bar delivery with a rewindable cursor.

use crate::domain::Bar;

/// Supplies bars to the driver one at a time.
///
/// Implementations deliver bars in the order they were given. They do not
/// repair disorder: the driver checks timestamps and fails the run if they
/// ever decrease.
pub trait MarketDataSequencer {
    /// Next bar, or `None` once exhausted.
    fn next_bar(&mut self) -> Option<Bar>;

    /// Rewind to the first bar.
    fn reset(&mut self);

    /// Bars left before exhaustion, when known.
    fn remaining(&self) -> Option<usize> {
        None
    }
}

/// In-memory sequencer over a vector of bars.
#[derive(Debug, Clone, Default)]
pub struct VecSequencer {
    bars: Vec<Bar>,
    cursor: usize,
}

impl VecSequencer {
    /// Deliver `bars` exactly as given.
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars, cursor: 0 }
    }

    /// Stable-sort by timestamp first. Bars sharing a timestamp keep their
    /// relative order.
    pub fn from_unsorted(mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        Self::new(bars)
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Sequencer over the first `n` bars (all of them if `n` exceeds the length).
    pub fn truncated(&self, n: usize) -> Self {
        Self::new(self.bars[..n.min(self.bars.len())].to_vec())
    }
}

impl MarketDataSequencer for VecSequencer {
    fn next_bar(&mut self) -> Option<Bar> {
        let bar = self.bars.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(bar)
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.bars.len() - self.cursor)
    }
}

impl<S: MarketDataSequencer + ?Sized> MarketDataSequencer for &mut S {
    fn next_bar(&mut self) -> Option<Bar> {
        (**self).next_bar()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn remaining(&self) -> Option<usize> {
        (**self).remaining()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, symbol: &str) -> Bar {
        Bar::new(ts, symbol, 10.0, 11.0, 9.0, 10.0, 100.0)
    }

    #[test]
    fn delivers_in_order_then_exhausts() {
        let mut seq = VecSequencer::new(vec![bar(1, "A"), bar(2, "A")]);
        assert_eq!(seq.remaining(), Some(2));
        assert_eq!(seq.next_bar().unwrap().timestamp, 1);
        assert_eq!(seq.next_bar().unwrap().timestamp, 2);
        assert!(seq.next_bar().is_none());
        assert!(seq.next_bar().is_none());
    }

    #[test]
    fn reset_rewinds() {
        let mut seq = VecSequencer::new(vec![bar(1, "A"), bar(2, "A")]);
        seq.next_bar();
        seq.next_bar();
        seq.reset();
        assert_eq!(seq.next_bar().unwrap().timestamp, 1);
    }

    #[test]
    fn from_unsorted_is_stable() {
        let seq = VecSequencer::from_unsorted(vec![bar(2, "B"), bar(1, "A"), bar(2, "A")]);
        let order: Vec<(i64, &str)> = seq
            .bars()
            .iter()
            .map(|b| (b.timestamp, b.symbol.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "A"), (2, "B"), (2, "A")]);
    }

    #[test]
    fn truncated_keeps_prefix() {
        let seq = VecSequencer::new(vec![bar(1, "A"), bar(2, "A"), bar(3, "A")]);
        assert_eq!(seq.truncated(2).len(), 2);
        assert_eq!(seq.truncated(10).len(), 3);
    }
}
