//! Market view: the strategy's window onto the bar tape.
//!
//! A view exposes every bar up to a visibility horizon and remembers the
//! newest information it handed out, as a bar timestamp plus the phase of
//! that bar (only its open, or the full bar). The driver stamps each order
//! with that pair, which is what the temporal-leakage check later compares
//! against the fill's timestamp and price reference.

use crate::domain::{Bar, PriceReference};
use std::cell::Cell;
use std::collections::HashMap;
use std::ops::Index;

/// Bars admitted so far, indexed by symbol for history lookups.
#[derive(Debug, Clone, Default)]
pub struct Tape {
    bars: Vec<Bar>,
    by_symbol: HashMap<String, Vec<usize>>,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bar: Bar) {
        let index = self.bars.len();
        match self.by_symbol.get_mut(&bar.symbol) {
            Some(positions) => positions.push(index),
            None => {
                self.by_symbol.insert(bar.symbol.clone(), vec![index]);
            }
        }
        self.bars.push(bar);
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Tape positions of `symbol`'s bars, ascending.
    fn positions(&self, symbol: &str) -> &[usize] {
        self.by_symbol
            .get(symbol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First position sharing the timestamp of the bar at `index`.
    fn group_start(&self, index: usize) -> usize {
        let ts = self.bars[index].timestamp;
        let mut start = index;
        while start > 0 && self.bars[start - 1].timestamp == ts {
            start -= 1;
        }
        start
    }
}

impl From<Vec<Bar>> for Tape {
    fn from(bars: Vec<Bar>) -> Self {
        let mut tape = Tape::new();
        for bar in bars {
            tape.push(bar);
        }
        tape
    }
}

impl Index<usize> for Tape {
    type Output = Bar;

    fn index(&self, index: usize) -> &Bar {
        &self.bars[index]
    }
}

pub struct MarketView<'a> {
    tape: &'a Tape,
    current: usize,
    /// Exclusive upper bound on readable full bars.
    horizon: usize,
    timing: PriceReference,
    newest_read: Cell<Option<(usize, PriceReference)>>,
}

impl<'a> MarketView<'a> {
    /// View of `tape` positioned at `current`.
    ///
    /// With close timing the current bar is fully visible. With open timing
    /// only its open is (through [`MarketView::reference_price`]); full bars
    /// end before the first bar sharing the current timestamp. `leak` widens
    /// the horizon past that point.
    pub fn new(tape: &'a Tape, current: usize, timing: PriceReference, leak: usize) -> Self {
        let base = match timing {
            PriceReference::Close => current + 1,
            PriceReference::Open => tape.group_start(current),
        };
        let horizon = (base + leak).min(tape.len());
        Self {
            tape,
            current,
            horizon,
            timing,
            newest_read: Cell::new(None),
        }
    }

    fn touch(&self, index: usize, phase: PriceReference) {
        let read = (index, phase);
        let newest = match self.newest_read.get() {
            Some(prev) => prev.max(read),
            None => read,
        };
        self.newest_read.set(Some(newest));
    }

    fn current_bar(&self) -> &'a Bar {
        &self.tape[self.current]
    }

    /// Timestamp of the bar being processed.
    pub fn now(&self) -> i64 {
        self.current_bar().timestamp
    }

    /// Symbol of the bar being processed.
    pub fn symbol(&self) -> &'a str {
        &self.current_bar().symbol
    }

    pub fn fill_timing(&self) -> PriceReference {
        self.timing
    }

    /// The price orders on this bar will fill against (before slippage).
    pub fn reference_price(&self) -> f64 {
        self.touch(self.current, self.timing);
        self.current_bar().price(self.timing)
    }

    /// Visible tape positions of `symbol`, ascending.
    fn visible(&self, symbol: &str) -> &'a [usize] {
        let positions = self.tape.positions(symbol);
        let end = positions.partition_point(|&i| i < self.horizon);
        &positions[..end]
    }

    /// Newest visible bar for `symbol`.
    pub fn latest(&self, symbol: &str) -> Option<&'a Bar> {
        let &index = self.visible(symbol).last()?;
        self.touch(index, PriceReference::Close);
        Some(&self.tape[index])
    }

    /// Up to `n` most recent visible bars for `symbol`, oldest first.
    pub fn history(&self, symbol: &str, n: usize) -> Vec<&'a Bar> {
        let visible = self.visible(symbol);
        let window = &visible[visible.len().saturating_sub(n)..];
        if let Some(&index) = window.last() {
            self.touch(index, PriceReference::Close);
        }
        window.iter().map(|&i| &self.tape[i]).collect()
    }

    /// Closes of [`MarketView::history`].
    pub fn closes(&self, symbol: &str, n: usize) -> Vec<f64> {
        self.history(symbol, n).iter().map(|b| b.close).collect()
    }

    /// Timestamp and phase of the newest information read through this
    /// view. Falls back to the current bar's fill phase when nothing was read.
    pub fn decision_point(&self) -> (i64, PriceReference) {
        match self.newest_read.get() {
            Some((index, phase)) => (self.tape[index].timestamp, phase),
            None => (self.now(), self.timing),
        }
    }

    pub fn decision_timestamp(&self) -> i64 {
        self.decision_point().0
    }
}
