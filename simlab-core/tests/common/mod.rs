//! Shared fixtures for core integration tests.

#![allow(dead_code)]

use simlab_core::domain::{Bar, OrderRequest, Portfolio};
use simlab_core::engine::MarketView;
use simlab_core::strategy::StrategyLogic;
use std::collections::BTreeMap;

pub const DAY: i64 = 86_400;

/// Daily bars for one symbol whose open/close equal the given prices.
pub fn flat_bars(symbol: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(i as i64 * DAY, symbol, c, c * 1.01, c * 0.99, c, 1_000_000.0))
        .collect()
}

/// Replays a fixed order script keyed by bar index, without reading any data.
pub struct Scripted {
    pub script: BTreeMap<usize, Vec<OrderRequest>>,
}

impl Scripted {
    pub fn new(script: impl IntoIterator<Item = (usize, Vec<OrderRequest>)>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl StrategyLogic for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn on_bar(&self, view: &MarketView<'_>, _portfolio: &Portfolio) -> Vec<OrderRequest> {
        let index = (view.now() / DAY) as usize;
        self.script.get(&index).cloned().unwrap_or_default()
    }
}
