//! Post-run verification suite.
//!
//! Consumes record-level outputs (summary, trade log, equity curve) and
//! produces an ordered report of findings. Every rule yields zero or one
//! entry; a rule that cannot run for lack of data yields an `info` entry.
//! The verifier never fails: malformed inputs become findings.

mod checks;
pub mod truncation;
mod report;

pub use truncation::{truncation_replay, Divergence, TruncationOutcome};
pub use report::{Finding, RuleId, Severity, VerificationReport};

use crate::config::{PolicyLimits, VerificationConfig};
use crate::metrics::SummaryStats;
use crate::records::{EquityRecord, TradeRecord};
use serde::{Deserialize, Serialize};
use simlab_core::engine::SymbolSpan;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Which symbols the run was meant to cover and which it actually saw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub universe: Vec<String>,
    pub spans: BTreeMap<String, SymbolSpan>,
}

/// Everything the verifier looks at. All pieces are optional or may be empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerificationInput<'a> {
    pub summary: Option<&'a SummaryStats>,
    pub trades: &'a [TradeRecord],
    pub equity: &'a [EquityRecord],
    pub coverage: Option<&'a Coverage>,
    pub truncation: Option<&'a TruncationOutcome>,
    /// Artifacts that existed but could not be parsed.
    pub load_errors: &'a [String],
}

#[derive(Debug, Clone, Default)]
pub struct Verifier {
    policy: PolicyLimits,
    config: VerificationConfig,
}

impl Verifier {
    pub fn new(policy: PolicyLimits, config: VerificationConfig) -> Self {
        Self { policy, config }
    }

    pub fn policy(&self) -> &PolicyLimits {
        &self.policy
    }

    pub fn verify(&self, input: &VerificationInput<'_>) -> VerificationReport {
        let tol = self.config.metric_tolerance;
        let recomputed = checks::Recomputed::from_equity(input.equity, input.trades);

        let findings: Vec<Finding> = [
            checks::missing_data(input),
            checks::temporal_leakage(input.trades),
            checks::chronological_order(input.trades, input.equity),
            checks::fill_reference_consistency(input.trades, input.summary),
            checks::equity_identity(input.equity, tol),
            checks::cash_reconciliation(input.summary, input.trades, input.equity, tol),
            checks::negative_equity(input.equity),
            checks::summary_consistency(input.summary, input.trades, input.equity, tol),
            checks::sharpe_recomputation(input.summary, &recomputed, tol),
            checks::drawdown_recomputation(input.summary, &recomputed, tol),
            checks::max_drawdown_limit(&recomputed, self.policy.max_drawdown),
            checks::max_leverage_limit(&recomputed, self.policy.max_leverage),
            checks::max_turnover_limit(&recomputed, self.policy.max_turnover),
            checks::implausible_sharpe(&recomputed, self.config.implausible_sharpe),
            checks::survivorship_bias(input.coverage, input.trades),
            input.truncation.and_then(checks::truncation_divergence),
        ]
        .into_iter()
        .flatten()
        .collect();

        for f in &findings {
            if f.severity.is_blocking() {
                warn!(rule = ?f.rule_id, severity = ?f.severity, "{}", f.message);
            } else {
                debug!(rule = ?f.rule_id, severity = ?f.severity, "{}", f.message);
            }
        }

        let report = VerificationReport::from_findings(findings);
        info!(
            passed = report.passed,
            findings = report.findings.len(),
            "verification complete"
        );
        report
    }
}
