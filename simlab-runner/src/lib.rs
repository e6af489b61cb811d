//! SimLab Runner: run specs, summary metrics, verification, artifacts.
//!
//! This crate builds on `simlab-core` to provide:
//! - Run specifications loaded from JSON or TOML
//! - Single, batch (rayon) and replay execution
//! - Summary statistics with frequency-aware annualization
//! - The post-run verification suite and truncation replay
//! - CSV/JSON artifacts that can be re-verified from disk

pub mod config;
pub mod metrics;
pub mod records;
pub mod reporting;
pub mod result;
pub mod runner;
pub mod verify;

pub use config::{ConfigError, PolicyLimits, RunSpec, VerificationConfig};
pub use metrics::{SamplingFrequency, SummaryStats};
pub use records::{EquityRecord, TradeRecord};
pub use reporting::{ArtifactManager, ArtifactPaths, LoadedRun, RunManifest};
pub use result::{BacktestResult, SCHEMA_VERSION};
pub use runner::{load_market_data, replay, run_backtest, run_batch, ReplayOutcome, RunError};
pub use verify::{
    Coverage, Finding, RuleId, Severity, VerificationInput, VerificationReport, Verifier,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn run_spec_is_send_sync() {
        assert_send::<RunSpec>();
        assert_sync::<RunSpec>();
    }

    #[test]
    fn run_error_is_send() {
        assert_send::<RunError>();
    }

    #[test]
    fn verifier_is_send_sync() {
        assert_send::<Verifier>();
        assert_sync::<Verifier>();
    }
}
