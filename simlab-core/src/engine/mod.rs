//! Engine: cost model, execution simulator, market view, driver.

pub mod cost_model;
pub mod driver;
pub mod error;
pub mod execution;
pub mod fault;
pub mod view;

pub use cost_model::CostModel;
pub use driver::{BacktestDriver, DriverConfig, RunOutput, SymbolSpan};
pub use error::{require_non_negative, require_positive, EngineError, ParameterError, RunState};
pub use execution::{
    ExecutionConfig, ExecutionReport, ExecutionSimulator, PartialFillModel, RejectReason, Rejection,
};
pub use fault::FaultProfile;
pub use view::{MarketView, Tape};
