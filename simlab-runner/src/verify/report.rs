//! Verification report types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Results are invalid
    Critical,
    /// Results are unreliable
    High,
    /// Results may be optimistic
    Medium,
    Low,
    /// A check could not run
    Info,
}

impl Severity {
    /// Whether an entry of this severity fails the report.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    MissingData,
    TemporalLeakage,
    ChronologicalOrder,
    FillReferenceConsistency,
    EquityIdentity,
    CashReconciliation,
    NegativeEquity,
    SummaryConsistency,
    SharpeRecomputation,
    DrawdownRecomputation,
    MaxDrawdownLimit,
    MaxLeverageLimit,
    MaxTurnoverLimit,
    ImplausibleSharpe,
    SurvivorshipBias,
    TruncationDivergence,
}

/// One verification entry: which rule, how bad, and the numbers behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: RuleId,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub evidence: BTreeMap<String, Value>,
}

impl Finding {
    pub fn new(rule_id: RuleId, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule_id,
            severity,
            message: message.into(),
            evidence: BTreeMap::new(),
        }
    }

    /// Attach a piece of evidence. Non-finite floats serialize as null.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.evidence.insert(key.to_string(), value.into());
        self
    }

    /// Entry recording that a check was skipped.
    pub fn skipped(rule_id: RuleId, reason: impl Into<String>) -> Self {
        Self::new(rule_id, Severity::Info, reason)
    }
}

/// Ordered list of findings, built once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub passed: bool,
    pub findings: Vec<Finding>,
}

impl VerificationReport {
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        let passed = !findings.iter().any(|f| f.severity.is_blocking());
        Self { passed, findings }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn finding(&self, rule_id: RuleId) -> Option<&Finding> {
        self.findings.iter().find(|f| f.rule_id == rule_id)
    }

    /// Findings that are not informational.
    pub fn issues(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity != Severity::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passed_only_without_critical_or_high() {
        let ok = VerificationReport::from_findings(vec![
            Finding::new(RuleId::ImplausibleSharpe, Severity::Medium, "suspicious"),
            Finding::skipped(RuleId::SharpeRecomputation, "too few samples"),
        ]);
        assert!(ok.passed);
        assert_eq!(ok.issues().count(), 1);

        let bad = VerificationReport::from_findings(vec![Finding::new(
            RuleId::MaxDrawdownLimit,
            Severity::High,
            "breach",
        )]);
        assert!(!bad.passed);
        assert_eq!(bad.count(Severity::High), 1);
    }

    #[test]
    fn serializes_with_snake_case_rule_ids() {
        let f = Finding::new(RuleId::TemporalLeakage, Severity::Critical, "leak")
            .with("count", 3)
            .with("lead_seconds", 86_400);
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["rule_id"], "temporal_leakage");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["evidence"]["count"], 3);
    }

    #[test]
    fn non_finite_evidence_becomes_null() {
        let f = Finding::new(RuleId::MaxLeverageLimit, Severity::High, "x")
            .with("observed", f64::INFINITY);
        assert!(f.evidence["observed"].is_null());
    }
}
