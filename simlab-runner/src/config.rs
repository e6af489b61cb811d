//! Run specification: everything needed to reproduce a backtest.
//!
//! Loaded from JSON or TOML (chosen by file extension). Strategy and cost
//! model are internally tagged enums; the remaining sections are optional.

use serde::{Deserialize, Serialize};
use simlab_core::engine::{
    CostModel, DriverConfig, EngineError, ExecutionConfig, FaultProfile, ParameterError,
};
use simlab_core::strategy::Strategy;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON run spec: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML run spec: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported run spec extension '{0}' (expected .json or .toml)")]
    UnsupportedExtension(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("strategy: {0}")]
    Strategy(ParameterError),

    #[error("policy: {0}")]
    Policy(ParameterError),

    #[error("verification: {0}")]
    Verification(ParameterError),
}

fn default_max_drawdown() -> Option<f64> {
    Some(0.25)
}

fn default_max_leverage() -> Option<f64> {
    Some(2.0)
}

/// Externally configured risk limits checked after the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyLimits {
    /// Maximum drawdown as a positive fraction of the running peak.
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown: Option<f64>,
    /// Maximum gross exposure / equity.
    #[serde(default = "default_max_leverage")]
    pub max_leverage: Option<f64>,
    /// Maximum traded notional / average equity.
    #[serde(default)]
    pub max_turnover: Option<f64>,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self {
            max_drawdown: default_max_drawdown(),
            max_leverage: default_max_leverage(),
            max_turnover: None,
        }
    }
}

impl PolicyLimits {
    pub fn unlimited() -> Self {
        Self {
            max_drawdown: None,
            max_leverage: None,
            max_turnover: None,
        }
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        let limits = [
            ("max_drawdown", self.max_drawdown),
            ("max_leverage", self.max_leverage),
            ("max_turnover", self.max_turnover),
        ];
        for (name, limit) in limits {
            if let Some(v) = limit {
                simlab_core::engine::require_positive(name, v)?;
            }
        }
        Ok(())
    }
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_implausible_sharpe() -> f64 {
    10.0
}

fn default_truncation_cuts() -> usize {
    8
}

fn default_true() -> bool {
    true
}

/// Knobs for the verification suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Relative tolerance for recomputed metrics (absolute below 1.0).
    #[serde(default = "default_tolerance")]
    pub metric_tolerance: f64,
    /// |Sharpe| above this is flagged as implausible.
    #[serde(default = "default_implausible_sharpe")]
    pub implausible_sharpe: f64,
    /// Re-run on truncated prefixes and compare fills.
    #[serde(default = "default_true")]
    pub truncation_replay: bool,
    #[serde(default = "default_truncation_cuts")]
    pub truncation_cuts: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            metric_tolerance: default_tolerance(),
            implausible_sharpe: default_implausible_sharpe(),
            truncation_replay: true,
            truncation_cuts: default_truncation_cuts(),
        }
    }
}

impl VerificationConfig {
    pub fn validate(&self) -> Result<(), ParameterError> {
        simlab_core::engine::require_positive("metric_tolerance", self.metric_tolerance)?;
        simlab_core::engine::require_positive("implausible_sharpe", self.implausible_sharpe)
    }
}

/// Serializable description of a single backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    pub initial_cash: f64,
    pub seed: u64,
    pub strategy: Strategy,
    #[serde(default)]
    pub cost_model: CostModel,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub policy: PolicyLimits,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub fault: FaultProfile,
    /// Symbols the strategy was meant to select from. Empty disables the
    /// survivorship check.
    #[serde(default)]
    pub universe: Vec<String>,
}

impl RunSpec {
    pub fn new(initial_cash: f64, seed: u64, strategy: Strategy) -> Self {
        Self {
            initial_cash,
            seed,
            strategy,
            cost_model: CostModel::default(),
            execution: ExecutionConfig::default(),
            policy: PolicyLimits::default(),
            verification: VerificationConfig::default(),
            fault: FaultProfile::disabled(),
            universe: Vec::new(),
        }
    }

    /// Parse a spec from a `.json` or `.toml` file and validate it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let spec = match extension.as_str() {
            "json" => Self::from_json(&text)?,
            "toml" => Self::from_toml(&text)?,
            other => return Err(ConfigError::UnsupportedExtension(other.to_string())),
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.driver_config().validate()?;
        self.strategy.validate().map_err(ConfigError::Strategy)?;
        self.policy.validate().map_err(ConfigError::Policy)?;
        self.verification
            .validate()
            .map_err(ConfigError::Verification)?;
        Ok(())
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            initial_cash: self.initial_cash,
            seed: self.seed,
            execution: self.execution,
            cost_model: self.cost_model.clone(),
            fault: self.fault,
        }
    }

    /// BLAKE3 hash of the canonical JSON form.
    pub fn spec_hash(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
