//! Core types for the clauseguard compliance pipeline.

pub mod clause;
pub mod config;
pub mod report;
pub mod rule;
pub mod verdict;

pub use clause::{Clause, ClauseMetadata, Document};
pub use config::{
    AnomalyConfig, BackoffConfig, OrchestratorConfig, PipelineConfig, RetrievalConfig, ScorePolicy,
};
pub use report::{
    AnomalyScore, ClauseResult, ComplianceReport, RiskAssessment, SeverityCounts, VerdictTotals,
};
pub use rule::{RegulationRule, RuleMetadata, Severity};
pub use verdict::{CandidateMatch, Compliance, FinalVerdict, ProviderVerdict};
