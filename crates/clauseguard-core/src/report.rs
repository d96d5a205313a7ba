//! Report types assembled by the pipeline coordinator.

use serde::{Deserialize, Serialize};

use crate::rule::Severity;
use crate::verdict::{CandidateMatch, Compliance, FinalVerdict};

/// Risk assessment derived from the final verdict and matched-rule tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub clause_id: String,
    pub severity: Severity,
    pub category: String,
    /// Severity base plus an uncertainty component, capped at 1.0.
    pub score: f32,
    pub impact: String,
    pub mitigation: String,
}

/// Statistical outlier signal, independent of the semantic verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyScore {
    pub clause_id: String,
    /// Isolation score in [0, 1]; higher is more anomalous.
    pub score: f32,
    pub is_outlier: bool,
}

/// All per-clause signals merged into one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClauseResult {
    pub clause_id: String,
    pub verdict: FinalVerdict,
    pub risk: RiskAssessment,
    pub anomaly: AnomalyScore,
    pub candidates: Vec<CandidateMatch>,
    /// Diagnostic text for degraded clauses: provider failures, anomaly
    /// flags, disabled detectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Verdict counts across a document. Always sums to the clause count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictTotals {
    pub compliant: usize,
    pub non_compliant: usize,
    pub undetermined: usize,
}

impl VerdictTotals {
    pub fn record(&mut self, compliance: Compliance) {
        match compliance {
            Compliance::Compliant => self.compliant += 1,
            Compliance::NonCompliant => self.non_compliant += 1,
            Compliance::Undetermined => self.undetermined += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.compliant + self.non_compliant + self.undetermined
    }
}

/// Clause counts per risk severity level, for the report header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub none: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::None => self.none += 1,
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
        }
    }

    /// Clauses at medium severity or above.
    pub fn elevated(&self) -> usize {
        self.medium + self.high
    }
}

/// Complete per-document output of the pipeline, immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub document_id: String,
    pub clauses: Vec<ClauseResult>,
    pub totals: VerdictTotals,
    /// Share of compliant clauses under the configured score policy.
    pub overall_score: f32,
    pub severity_counts: SeverityCounts,
    pub anomaly_count: usize,
    /// ISO 8601 timestamp string.
    pub generated_at: String,
    pub elapsed_ms: u64,
}
