//! Backtest driver: the bar loop and its state machine.
//!
//! `READY → RUNNING → {COMPLETED, FAILED}`. Each bar: admit (fail fast on
//! disorder or bad prices) → strategy decides against the current ledger →
//! simulator fills → ledger applies fills → mark and record equity.

use super::cost_model::CostModel;
use super::error::{EngineError, RunState};
use super::execution::{ExecutionConfig, ExecutionSimulator, Rejection};
use super::fault::FaultProfile;
use super::view::{MarketView, Tape};
use crate::data::MarketDataSequencer;
use crate::domain::{Bar, EquitySample, Fill, IdGen, Order, Portfolio, PriceReference};
use crate::rng::SeedHierarchy;
use crate::strategy::StrategyLogic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Everything the driver needs besides data and a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub initial_cash: f64,
    pub seed: u64,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub cost_model: CostModel,
    #[serde(default)]
    pub fault: FaultProfile,
}

impl DriverConfig {
    pub fn new(initial_cash: f64, seed: u64) -> Self {
        Self {
            initial_cash,
            seed,
            execution: ExecutionConfig::default(),
            cost_model: CostModel::default(),
            fault: FaultProfile::disabled(),
        }
    }

    pub fn with_cost_model(mut self, cost_model: CostModel) -> Self {
        self.cost_model = cost_model;
        self
    }

    pub fn with_execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_fault(mut self, fault: FaultProfile) -> Self {
        self.fault = fault;
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(EngineError::InvalidInitialCash(self.initial_cash));
        }
        self.cost_model.validate()?;
        self.execution.validate()?;
        Ok(())
    }
}

/// First and last timestamp at which a symbol traded in the tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSpan {
    pub first: i64,
    pub last: i64,
    pub bars: usize,
}

/// Raw output of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub initial_cash: f64,
    pub fill_timing: PriceReference,
    pub fills: Vec<Fill>,
    pub rejections: Vec<Rejection>,
    pub equity_curve: Vec<EquitySample>,
    /// Final ledger state.
    pub portfolio: Portfolio,
    pub bars_processed: usize,
    pub symbol_spans: BTreeMap<String, SymbolSpan>,
}

pub struct BacktestDriver<Q, L> {
    config: DriverConfig,
    state: RunState,
    sequencer: Q,
    strategy: L,
    simulator: ExecutionSimulator,
    portfolio: Portfolio,
    tape: Tape,
    ids: IdGen,
    fills: Vec<Fill>,
    rejections: Vec<Rejection>,
    spans: BTreeMap<String, SymbolSpan>,
}

impl<Q: MarketDataSequencer, L: StrategyLogic> BacktestDriver<Q, L> {
    /// Build a driver in the `Ready` state. Invalid configuration (including
    /// non-positive initial cash) is fatal here, before any bar is read.
    pub fn new(config: DriverConfig, sequencer: Q, strategy: L) -> Result<Self, EngineError> {
        config.validate()?;
        let seeds = SeedHierarchy::new(config.seed);
        let simulator =
            ExecutionSimulator::new(config.execution, config.cost_model.clone(), seeds.stream("execution"));
        Ok(Self {
            portfolio: Portfolio::new(config.initial_cash),
            config,
            state: RunState::Ready,
            sequencer,
            strategy,
            simulator,
            tape: Tape::new(),
            ids: IdGen::default(),
            fills: Vec::new(),
            rejections: Vec::new(),
            spans: BTreeMap::new(),
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Current ledger (read-only).
    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Run until the sequencer is exhausted or a fatal error occurs.
    ///
    /// Only callable from `Ready`; a driver is single-use.
    pub fn run(&mut self) -> Result<RunOutput, EngineError> {
        if self.state != RunState::Ready {
            return Err(EngineError::InvalidState(self.state));
        }
        self.state = RunState::Running;
        info!(
            strategy = self.strategy.name(),
            seed = self.config.seed,
            initial_cash = self.config.initial_cash,
            fill_timing = self.config.execution.fill_timing.as_str(),
            "backtest started"
        );
        if self.config.fault.is_enabled() {
            warn!(
                leak_future_bars = self.config.fault.leak_future_bars,
                "fault injection enabled"
            );
        }

        match self.run_loop() {
            Ok(bars) => {
                self.state = RunState::Completed;
                info!(
                    bars,
                    fills = self.fills.len(),
                    rejections = self.rejections.len(),
                    final_equity = self.portfolio.equity(),
                    "backtest completed"
                );
                Ok(self.output(bars))
            }
            Err(e) => {
                self.state = RunState::Failed;
                error!(error = %e, "backtest failed");
                Err(e)
            }
        }
    }

    fn run_loop(&mut self) -> Result<usize, EngineError> {
        let lookahead = self.config.fault.leak_future_bars;
        let mut cursor = 0;
        loop {
            self.fill_tape(cursor + 1 + lookahead)?;
            if cursor >= self.tape.len() {
                return Ok(cursor);
            }
            self.process_bar(cursor);
            cursor += 1;
        }
    }

    /// Pull bars until the tape holds `len` of them or the source runs dry.
    fn fill_tape(&mut self, len: usize) -> Result<(), EngineError> {
        while self.tape.len() < len {
            match self.sequencer.next_bar() {
                Some(bar) => self.admit(bar)?,
                None => break,
            }
        }
        Ok(())
    }

    fn admit(&mut self, bar: Bar) -> Result<(), EngineError> {
        let index = self.tape.len();
        if let Err(defect) = bar.validate() {
            return Err(EngineError::InvalidBar {
                index,
                symbol: bar.symbol,
                timestamp: bar.timestamp,
                defect,
            });
        }
        if let Some(prev) = self.tape.last() {
            if bar.timestamp < prev.timestamp {
                return Err(EngineError::NonMonotonicTimestamp {
                    index,
                    symbol: bar.symbol,
                    previous: prev.timestamp,
                    timestamp: bar.timestamp,
                });
            }
        }
        self.tape.push(bar);
        Ok(())
    }

    fn process_bar(&mut self, cursor: usize) {
        let timing = self.config.execution.fill_timing;
        let lookahead = self.config.fault.leak_future_bars;

        let orders: Vec<Order> = {
            let view = MarketView::new(&self.tape, cursor, timing, lookahead);
            let requests = self.strategy.on_bar(&view, &self.portfolio);
            let (decided_at, phase) = view.decision_point();
            requests
                .into_iter()
                .map(|r| Order::from_request(r, self.ids.next_order_id(), decided_at, phase))
                .collect()
        };

        let bar = &self.tape[cursor];
        let report = self.simulator.execute(&orders, bar, &self.portfolio);
        for fill in &report.fills {
            let realized = self.portfolio.apply_fill(fill);
            debug!(
                order = %fill.order_id,
                symbol = %fill.symbol,
                side = fill.side.as_str(),
                quantity = fill.quantity,
                price = fill.price,
                realized,
                "fill applied"
            );
        }
        self.portfolio.mark(&bar.symbol, bar.close);
        self.portfolio.record_equity(bar.timestamp);

        self.spans
            .entry(bar.symbol.clone())
            .and_modify(|s| {
                s.last = bar.timestamp;
                s.bars += 1;
            })
            .or_insert(SymbolSpan {
                first: bar.timestamp,
                last: bar.timestamp,
                bars: 1,
            });

        self.fills.extend(report.fills);
        self.rejections.extend(report.rejections);
    }

    fn output(&mut self, bars_processed: usize) -> RunOutput {
        RunOutput {
            initial_cash: self.config.initial_cash,
            fill_timing: self.config.execution.fill_timing,
            fills: std::mem::take(&mut self.fills),
            rejections: std::mem::take(&mut self.rejections),
            equity_curve: self.portfolio.equity_curve().to_vec(),
            portfolio: self.portfolio.clone(),
            bars_processed,
            symbol_spans: std::mem::take(&mut self.spans),
        }
    }
}
