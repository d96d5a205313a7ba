//! Pipeline configuration with serde defaults throughout.
//!
//! Every field has a default so a partial (or empty) JSON config file is
//! valid. Provider API keys never live here; they come from the
//! environment at the CLI edge.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exponential backoff parameters for transient provider failures:
/// `delay = min(initial_delay_ms * multiplier^n, max_delay_ms)` plus up to
/// `jitter_ms` of random jitter, where `n` counts prior failed attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

fn default_initial_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    15_000
}
fn default_multiplier() -> f64 {
    2.0
}
fn default_jitter_ms() -> u64 {
    250
}

/// Candidate retrieval parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum candidates returned per clause.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum cosine similarity for a rule to count as a candidate.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_min_score() -> f32 {
    0.35
}

/// Provider orchestration policy: retries, timeouts, and the stop
/// condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Attempts per provider before failing over (transient errors only).
    #[serde(default = "default_max_attempts")]
    pub max_attempts_per_provider: u32,
    /// Stop consulting further providers once this many verdicts succeed.
    #[serde(default = "default_min_verdicts")]
    pub min_verdicts: usize,
    /// Hard timeout on a single provider call.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
    /// Budget for all provider work on one clause.
    #[serde(default = "default_clause_timeout_ms")]
    pub clause_timeout_ms: u64,
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl OrchestratorConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn clause_timeout(&self) -> Duration {
        Duration::from_millis(self.clause_timeout_ms)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts_per_provider: default_max_attempts(),
            min_verdicts: default_min_verdicts(),
            provider_timeout_ms: default_provider_timeout_ms(),
            clause_timeout_ms: default_clause_timeout_ms(),
            backoff: BackoffConfig::default(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_min_verdicts() -> usize {
    2
}
fn default_provider_timeout_ms() -> u64 {
    30_000
}
fn default_clause_timeout_ms() -> u64 {
    90_000
}

/// Anomaly detector decision threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Clauses scoring at or above this are flagged as outliers.
    #[serde(default = "default_anomaly_threshold")]
    pub threshold: f32,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            threshold: default_anomaly_threshold(),
        }
    }
}

fn default_anomaly_threshold() -> f32 {
    0.6
}

/// How undetermined verdicts factor into the document score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePolicy {
    /// compliant / (compliant + non_compliant). Undetermined clauses are
    /// unresolved, not violations.
    #[default]
    ExcludeUndetermined,
    /// compliant / total. Strict regimes treat unresolved as failing.
    CountAsNonCompliant,
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub anomaly: AnomalyConfig,
    /// Clauses processed concurrently, bounded by external rate limits.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub score_policy: ScorePolicy,
    /// Document deadline; in-flight provider calls finish, new attempts
    /// stop. `None` means no deadline.
    #[serde(default)]
    pub document_deadline_ms: Option<u64>,
}

impl PipelineConfig {
    pub fn document_deadline(&self) -> Option<Duration> {
        self.document_deadline_ms.map(Duration::from_millis)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retrieval: RetrievalConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            anomaly: AnomalyConfig::default(),
            workers: default_workers(),
            score_policy: ScorePolicy::default(),
            document_deadline_ms: None,
        }
    }
}

fn default_workers() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.orchestrator.min_verdicts, 2);
        assert_eq!(config.orchestrator.backoff.multiplier, 2.0);
        assert_eq!(config.anomaly.threshold, 0.6);
        assert_eq!(config.workers, 4);
        assert_eq!(config.score_policy, ScorePolicy::ExcludeUndetermined);
        assert!(config.document_deadline_ms.is_none());
    }

    #[test]
    fn default_matches_empty_json() {
        let parsed: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, PipelineConfig::default());
    }

    #[test]
    fn partial_json_overrides_one_field() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"orchestrator": {"min_verdicts": 1}}"#).unwrap();
        assert_eq!(config.orchestrator.min_verdicts, 1);
        // Sibling fields keep their defaults.
        assert_eq!(config.orchestrator.max_attempts_per_provider, 3);
        assert_eq!(config.retrieval.top_k, 5);
    }

    #[test]
    fn score_policy_round_trips() {
        let json = serde_json::to_string(&ScorePolicy::CountAsNonCompliant).unwrap();
        assert_eq!(json, r#""count_as_non_compliant""#);
        let parsed: ScorePolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ScorePolicy::CountAsNonCompliant);
    }

    #[test]
    fn timeouts_convert_to_durations() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.provider_timeout(), Duration::from_secs(30));
        assert_eq!(config.clause_timeout(), Duration::from_secs(90));
    }
}
