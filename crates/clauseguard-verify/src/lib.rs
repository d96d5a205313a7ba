//! Verdict orchestration, aggregation, risk explanation, and anomaly scoring.

mod aggregate;
mod anomaly;
mod orchestrator;
mod risk;

pub use aggregate::VerdictAggregator;
pub use anomaly::{AnomalyDetector, IsolationModel, ModelError};
pub use orchestrator::{Orchestrator, VerifyOutcome};
pub use risk::{RiskExplainer, RuleContext};
