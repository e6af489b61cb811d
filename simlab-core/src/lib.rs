//! SimLab Core: deterministic event-driven backtesting engine.
//!
//! This crate contains:
//! - Domain types (bars, orders, fills, positions, the portfolio ledger)
//! - Market data sequencing, Parquet/CSV loading, synthetic series
//! - Cost model and order-execution simulator
//! - Strategies behind a fixed `StrategyLogic` interface
//! - The backtest driver state machine
//! - Seed hierarchy and run fingerprinting

pub mod data;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod rng;
pub mod strategy;
