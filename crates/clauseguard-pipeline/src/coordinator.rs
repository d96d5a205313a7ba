//! Per-document pipeline driver.
//!
//! Fans clauses out to a bounded worker pool; each worker runs
//! retrieval, provider verification, aggregation, risk assessment, and
//! anomaly scoring for one clause. Results land in a write-once slot per
//! clause position so report order always matches input order.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use clauseguard_core::{
    AnomalyScore, CandidateMatch, Clause, ClauseResult, Compliance, ComplianceReport,
    FinalVerdict, PipelineConfig, ScorePolicy, SeverityCounts, VerdictTotals,
};
use clauseguard_index::RegulationIndex;
use clauseguard_providers::{CandidateRule, VerdictProvider, VerdictRequest};
use clauseguard_verify::{
    AnomalyDetector, Orchestrator, RiskExplainer, RuleContext, VerdictAggregator,
};
use futures::{stream, StreamExt};
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::PipelineError;

/// Drives the full pipeline for one document at a time.
///
/// Construction is the only fallible step (the retrieval index must
/// load); processing always yields a complete report.
pub struct Coordinator {
    pub(crate) index: Arc<RegulationIndex>,
    pub(crate) providers: Vec<Arc<dyn VerdictProvider>>,
    orchestrator: Orchestrator,
    aggregator: VerdictAggregator,
    explainer: RiskExplainer,
    detector: AnomalyDetector,
    config: PipelineConfig,
}

impl Coordinator {
    /// Load the regulation corpus and assemble a pipeline around it.
    pub fn from_corpus(
        corpus: &Path,
        providers: Vec<Arc<dyn VerdictProvider>>,
        detector: AnomalyDetector,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let index = RegulationIndex::load(corpus)?;
        Ok(Self::new(index, providers, detector, config))
    }

    pub fn new(
        index: RegulationIndex,
        providers: Vec<Arc<dyn VerdictProvider>>,
        detector: AnomalyDetector,
        config: PipelineConfig,
    ) -> Self {
        let mut aggregator = VerdictAggregator::new();
        for provider in &providers {
            aggregator = aggregator.with_weight(provider.id(), provider.trust_weight());
        }
        Self {
            index: Arc::new(index),
            orchestrator: Orchestrator::new(config.orchestrator.clone()),
            aggregator,
            explainer: RiskExplainer::new(),
            detector,
            providers,
            config,
        }
    }

    /// Verify every clause and assemble the document report.
    ///
    /// Every input clause appears exactly once in the output, in input
    /// order, even when all of its providers fail.
    pub async fn process(&self, document_id: &str, clauses: Vec<Clause>) -> ComplianceReport {
        let started = Instant::now();
        let deadline = self.config.document_deadline().map(|d| started + d);
        let total = clauses.len();
        info!(document = document_id, clauses = total, "processing document");

        let clause_ids: Vec<String> = clauses.iter().map(|c| c.id.clone()).collect();
        let workers = self.config.workers.max(1);
        let mut slots: Vec<Option<ClauseResult>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);

        {
            let mut results = stream::iter(clauses.into_iter().enumerate())
                .map(|(idx, clause)| async move {
                    (idx, self.process_clause(clause, deadline).await)
                })
                .buffer_unordered(workers);

            while let Some((idx, result)) = results.next().await {
                let slot = &mut slots[idx];
                debug_assert!(slot.is_none(), "clause slot {idx} written twice");
                if slot.is_some() {
                    error!(slot = idx, "clause slot written twice; keeping first result");
                    continue;
                }
                *slot = Some(result);
            }
        }

        let mut clause_results = Vec::with_capacity(total);
        let mut totals = VerdictTotals::default();
        let mut severity_counts = SeverityCounts::default();
        let mut anomaly_count = 0usize;
        for (idx, slot) in slots.into_iter().enumerate() {
            let result = slot.unwrap_or_else(|| {
                debug_assert!(false, "clause slot {idx} empty after processing");
                error!(slot = idx, "clause slot empty after processing");
                self.missing_result(&clause_ids[idx])
            });
            totals.record(result.verdict.compliant);
            severity_counts.record(result.risk.severity);
            if result.anomaly.is_outlier {
                anomaly_count += 1;
            }
            clause_results.push(result);
        }

        let score = document_score(&totals, self.config.score_policy);
        let report = ComplianceReport {
            document_id: document_id.to_string(),
            clauses: clause_results,
            totals,
            overall_score: score,
            severity_counts,
            anomaly_count,
            generated_at: Utc::now().to_rfc3339(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            document = document_id,
            compliant = totals.compliant,
            non_compliant = totals.non_compliant,
            undetermined = totals.undetermined,
            score,
            elapsed_ms = report.elapsed_ms,
            "document processed"
        );
        report
    }

    async fn process_clause(&self, clause: Clause, deadline: Option<Instant>) -> ClauseResult {
        let candidates = self.index.retrieve(
            &clause.id,
            &clause.embedding,
            self.config.retrieval.top_k,
            self.config.retrieval.min_score,
        );
        debug!(clause = %clause.id, candidates = candidates.len(), "retrieved candidates");

        let request = self.build_request(&clause, &candidates);
        let outcome = self
            .orchestrator
            .verify(&request, &self.providers, deadline)
            .await;
        let verdict = self.aggregator.aggregate(&clause.id, &outcome.verdicts);

        let contexts = self.rule_contexts(&candidates);
        let risk = self.explainer.explain(&verdict, &contexts);
        let anomaly = self.detector.score(&clause);
        let note = self.build_note(&outcome.notes, &anomaly);

        ClauseResult {
            clause_id: clause.id,
            verdict,
            risk,
            anomaly,
            candidates,
            note,
        }
    }

    fn build_request(&self, clause: &Clause, candidates: &[CandidateMatch]) -> VerdictRequest {
        let candidates = candidates
            .iter()
            .filter_map(|m| {
                self.index.rule(&m.rule_id).map(|rule| CandidateRule {
                    rule_id: rule.id.clone(),
                    text: rule.text.clone(),
                    score: m.score,
                })
            })
            .collect();
        VerdictRequest {
            clause_id: clause.id.clone(),
            clause_text: clause.text.clone(),
            candidates,
        }
    }

    /// Resolve matches to the severity/category view the risk explainer
    /// works from.
    fn rule_contexts(&self, candidates: &[CandidateMatch]) -> Vec<RuleContext> {
        candidates
            .iter()
            .filter_map(|m| {
                self.index.rule(&m.rule_id).map(|rule| RuleContext {
                    rule_id: rule.id.clone(),
                    score: m.score,
                    severity: rule.severity_tag,
                    category: rule.metadata.category.clone(),
                })
            })
            .collect()
    }

    /// Provider failure notes, the anomaly flag, and detector
    /// degradation, folded into one diagnostic line.
    fn build_note(&self, provider_notes: &[String], anomaly: &AnomalyScore) -> Option<String> {
        let mut parts: Vec<String> = provider_notes.to_vec();
        if anomaly.is_outlier {
            parts.push(format!("anomalous (score {:.3})", anomaly.score));
        }
        if !self.detector.is_enabled() {
            parts.push("anomaly model unavailable".to_string());
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }

    /// Stand-in for a clause whose slot never got a result. Only
    /// reachable through a coordinator bug; keeps the report complete.
    fn missing_result(&self, clause_id: &str) -> ClauseResult {
        let verdict = FinalVerdict {
            clause_id: clause_id.to_string(),
            compliant: Compliance::Undetermined,
            confidence: 0.0,
            contributing_providers: Vec::new(),
            rationale: "clause processing did not complete".to_string(),
        };
        let risk = self.explainer.explain(&verdict, &[]);
        ClauseResult {
            clause_id: clause_id.to_string(),
            verdict,
            risk,
            anomaly: AnomalyScore {
                clause_id: clause_id.to_string(),
                score: 0.0,
                is_outlier: false,
            },
            candidates: Vec::new(),
            note: Some("result missing".to_string()),
        }
    }
}

/// Share of compliant clauses under the configured policy; 0.0 when the
/// denominator is empty.
fn document_score(totals: &VerdictTotals, policy: ScorePolicy) -> f32 {
    let denominator = match policy {
        ScorePolicy::ExcludeUndetermined => totals.compliant + totals.non_compliant,
        ScorePolicy::CountAsNonCompliant => totals.total(),
    };
    if denominator == 0 {
        return 0.0;
    }
    totals.compliant as f32 / denominator as f32
}

#[cfg(test)]
mod tests {
    use clauseguard_core::{
        BackoffConfig, ClauseMetadata, OrchestratorConfig, RegulationRule, RetrievalConfig,
        RuleMetadata, Severity,
    };
    use clauseguard_providers::{verdict_reply, ScriptStep, ScriptedProvider};
    use clauseguard_verify::IsolationModel;

    use super::*;

    fn rule(id: &str, embedding: Vec<f32>, severity: Severity, category: Option<&str>) -> RegulationRule {
        RegulationRule {
            id: id.into(),
            text: format!("rule {id}"),
            embedding,
            severity_tag: severity,
            metadata: RuleMetadata {
                source_doc: None,
                provision: None,
                category: category.map(|c| c.to_string()),
            },
        }
    }

    fn clause(id: &str, embedding: Vec<f32>) -> Clause {
        Clause {
            id: id.into(),
            text: format!("clause {id}"),
            embedding,
            metadata: ClauseMetadata::default(),
        }
    }

    fn quick_config() -> PipelineConfig {
        PipelineConfig {
            retrieval: RetrievalConfig {
                top_k: 5,
                min_score: 0.5,
            },
            orchestrator: OrchestratorConfig {
                min_verdicts: 1,
                backoff: BackoffConfig {
                    initial_delay_ms: 1,
                    max_delay_ms: 2,
                    multiplier: 2.0,
                    jitter_ms: 0,
                },
                ..OrchestratorConfig::default()
            },
            ..PipelineConfig::default()
        }
    }

    fn coordinator(
        rules: Vec<RegulationRule>,
        providers: Vec<Arc<dyn VerdictProvider>>,
        detector: AnomalyDetector,
        config: PipelineConfig,
    ) -> Coordinator {
        let index = RegulationIndex::from_rules(rules).unwrap();
        Coordinator::new(index, providers, detector, config)
    }

    #[tokio::test]
    async fn report_covers_every_clause_in_input_order() {
        let provider = Arc::new(ScriptedProvider::fixed("mock", Compliance::Compliant, 0.9));
        let pipeline = coordinator(
            vec![rule("r-1", vec![1.0, 0.0], Severity::Low, None)],
            vec![provider],
            AnomalyDetector::disabled(),
            quick_config(),
        );

        let clauses = vec![
            clause("c-1", vec![0.0, 1.0]),
            clause("c-2", vec![0.0, 1.0]),
            clause("c-3", vec![0.0, 1.0]),
        ];
        let report = pipeline.process("doc-1", clauses).await;

        let ids: Vec<&str> = report.clauses.iter().map(|c| c.clause_id.as_str()).collect();
        assert_eq!(ids, vec!["c-1", "c-2", "c-3"]);
        assert_eq!(report.totals.total(), 3);
        assert_eq!(report.totals.compliant, 3);
        assert_eq!(report.overall_score, 1.0);
        assert_eq!(report.severity_counts.none, 3);
        assert!(chrono::DateTime::parse_from_rfc3339(&report.generated_at).is_ok());
        // Disabled detector is called out on every clause.
        for result in &report.clauses {
            assert_eq!(result.note.as_deref(), Some("anomaly model unavailable"));
        }
    }

    #[tokio::test]
    async fn all_providers_failing_downgrades_to_undetermined() {
        let provider = Arc::new(ScriptedProvider::with_script(
            "a",
            vec![ScriptStep::FatalFailure("invalid api key".into())],
        ));
        let pipeline = coordinator(
            vec![rule("r-1", vec![1.0], Severity::Low, None)],
            vec![provider],
            AnomalyDetector::disabled(),
            quick_config(),
        );

        let report = pipeline.process("doc-1", vec![clause("c-1", vec![1.0])]).await;

        assert_eq!(report.totals.undetermined, 1);
        let result = &report.clauses[0];
        assert_eq!(result.verdict.compliant, Compliance::Undetermined);
        assert_eq!(result.verdict.confidence, 0.0);
        assert!(result.verdict.contributing_providers.is_empty());
        let note = result.note.as_deref().unwrap();
        assert!(note.contains("a: invalid api key"), "note: {note}");
        assert!(note.contains("anomaly model unavailable"), "note: {note}");
    }

    #[tokio::test]
    async fn disclosure_clause_matches_rule_and_both_providers_agree() {
        let mut config = quick_config();
        config.retrieval.min_score = 0.7;
        config.orchestrator.min_verdicts = 2;
        let g = Arc::new(ScriptedProvider::fixed("g", Compliance::Compliant, 0.9));
        let m = Arc::new(ScriptedProvider::fixed("m", Compliance::Compliant, 0.9));
        let pipeline = coordinator(
            vec![rule(
                "reg-disclosure-1",
                vec![1.0, 0.0, 0.0, 0.0],
                Severity::Medium,
                Some("disclosure"),
            )],
            vec![g, m],
            AnomalyDetector::disabled(),
            config,
        );

        let disclosure = Clause {
            id: "c-disclosure".into(),
            text: "Bank may disclose borrower information to RBI and credit agencies".into(),
            embedding: vec![0.9, 0.3, 0.1, 0.2],
            metadata: ClauseMetadata::default(),
        };
        let report = pipeline.process("doc-1", vec![disclosure]).await;

        let result = &report.clauses[0];
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].rule_id, "reg-disclosure-1");
        assert!(result.candidates[0].score >= 0.7, "score {}", result.candidates[0].score);
        assert_eq!(result.verdict.compliant, Compliance::Compliant);
        assert!((result.verdict.confidence - 0.9).abs() < 1e-6);
        assert_eq!(result.verdict.contributing_providers, vec!["g", "m"]);
    }

    #[tokio::test]
    async fn empty_candidates_still_reach_providers() {
        let provider = Arc::new(ScriptedProvider::fixed("mock", Compliance::Compliant, 0.8));
        let pipeline = coordinator(
            vec![rule("r-1", vec![1.0, 0.0], Severity::Low, None)],
            vec![provider.clone()],
            AnomalyDetector::disabled(),
            quick_config(),
        );

        // Orthogonal to every rule: no candidate clears min_score.
        let report = pipeline
            .process("doc-1", vec![clause("c-1", vec![0.0, 1.0])])
            .await;

        let result = &report.clauses[0];
        assert!(result.candidates.is_empty());
        assert_eq!(result.verdict.compliant, Compliance::Compliant);
        assert_eq!(provider.calls(), 1, "provider must be consulted without candidates");
    }

    #[tokio::test]
    async fn hung_provider_fails_over_to_second() {
        let mut config = quick_config();
        config.orchestrator.provider_timeout_ms = 20;
        config.orchestrator.max_attempts_per_provider = 1;
        let a = Arc::new(ScriptedProvider::with_script("a", vec![ScriptStep::Hang]));
        let b = Arc::new(ScriptedProvider::fixed("b", Compliance::Compliant, 0.85));
        let pipeline = coordinator(
            vec![rule("r-1", vec![1.0], Severity::Low, None)],
            vec![a, b],
            AnomalyDetector::disabled(),
            config,
        );

        let report = pipeline.process("doc-1", vec![clause("c-1", vec![1.0])]).await;

        let result = &report.clauses[0];
        assert_eq!(result.verdict.contributing_providers, vec!["b"]);
        let note = result.note.as_deref().unwrap();
        assert!(note.contains("a: "), "note: {note}");
        assert!(note.contains("timed out"), "note: {note}");
    }

    #[tokio::test]
    async fn score_policies_diverge_on_mixed_document() {
        // One provider scripted per clause; workers = 1 keeps clause
        // order deterministic so the script lines up.
        let mixed_script = || {
            vec![
                ScriptStep::Reply(verdict_reply(Compliance::Compliant, 0.9, "ok", &[])),
                ScriptStep::Reply(verdict_reply(Compliance::NonCompliant, 0.8, "bad", &[])),
                ScriptStep::Reply(verdict_reply(Compliance::Undetermined, 0.5, "unclear", &[])),
            ]
        };
        let clauses = || {
            vec![
                clause("c-1", vec![1.0]),
                clause("c-2", vec![1.0]),
                clause("c-3", vec![1.0]),
            ]
        };
        let rules = || vec![rule("r-1", vec![1.0], Severity::Low, None)];

        let mut config = quick_config();
        config.workers = 1;
        let lenient = coordinator(
            rules(),
            vec![Arc::new(ScriptedProvider::with_script("p", mixed_script()))],
            AnomalyDetector::disabled(),
            config.clone(),
        );
        let report = lenient.process("doc-1", clauses()).await;
        assert_eq!(report.totals.compliant, 1);
        assert_eq!(report.totals.non_compliant, 1);
        assert_eq!(report.totals.undetermined, 1);
        assert!((report.overall_score - 0.5).abs() < 1e-6);

        config.score_policy = ScorePolicy::CountAsNonCompliant;
        let strict = coordinator(
            rules(),
            vec![Arc::new(ScriptedProvider::with_script("p", mixed_script()))],
            AnomalyDetector::disabled(),
            config,
        );
        let report = strict.process("doc-1", clauses()).await;
        assert!((report.overall_score - 1.0 / 3.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn expired_document_deadline_marks_clauses_undetermined() {
        let provider = Arc::new(ScriptedProvider::fixed("mock", Compliance::Compliant, 0.9));
        let mut config = quick_config();
        config.document_deadline_ms = Some(0);
        let pipeline = coordinator(
            vec![rule("r-1", vec![1.0], Severity::Low, None)],
            vec![provider.clone()],
            AnomalyDetector::disabled(),
            config,
        );

        let report = pipeline
            .process("doc-1", vec![clause("c-1", vec![1.0]), clause("c-2", vec![1.0])])
            .await;

        assert_eq!(report.totals.undetermined, 2);
        assert_eq!(provider.calls(), 0, "no provider attempt may start past the deadline");
        for result in &report.clauses {
            assert!(result
                .note
                .as_deref()
                .unwrap()
                .contains("skipped (deadline passed)"));
        }
    }

    #[tokio::test]
    async fn anomalies_and_severities_roll_up() {
        // Single split the test clauses always fall left of: path length
        // 1 scores ~0.863 against c(16).
        let model = IsolationModel::from_json(
            r#"{
                "sample_size": 16,
                "embedding_dim": 2,
                "trees": [{"nodes": [
                    {"feature": 0, "threshold": 2.0, "left": 1, "right": 2},
                    {"size": 1},
                    {"size": 1}
                ]}]
            }"#,
        )
        .unwrap();
        let provider = Arc::new(ScriptedProvider::fixed("p", Compliance::NonCompliant, 0.8));
        let pipeline = coordinator(
            vec![rule("r-1", vec![1.0, 0.0], Severity::High, Some("disclosure"))],
            vec![provider],
            AnomalyDetector::new(model, 0.6),
            quick_config(),
        );

        let report = pipeline
            .process(
                "doc-1",
                vec![clause("c-1", vec![1.0, 0.0]), clause("c-2", vec![1.0, 0.0])],
            )
            .await;

        assert_eq!(report.severity_counts.high, 2);
        assert_eq!(report.severity_counts.elevated(), 2);
        assert_eq!(report.anomaly_count, 2);
        for result in &report.clauses {
            assert_eq!(result.risk.severity, Severity::High);
            assert_eq!(result.risk.category, "disclosure");
            assert!(result.anomaly.is_outlier);
            assert!(result
                .note
                .as_deref()
                .unwrap()
                .contains("anomalous (score 0.863)"));
        }
    }

    #[tokio::test]
    async fn identical_runs_yield_identical_clause_results() {
        let run = || async {
            let provider = Arc::new(ScriptedProvider::fixed("p", Compliance::Compliant, 0.9));
            let pipeline = coordinator(
                vec![rule("r-1", vec![1.0, 0.0], Severity::Medium, Some("consent"))],
                vec![provider],
                AnomalyDetector::disabled(),
                quick_config(),
            );
            let report = pipeline
                .process("doc-1", vec![clause("c-1", vec![0.9, 0.1])])
                .await;
            serde_json::to_string(&report.clauses[0]).unwrap()
        };

        assert_eq!(run().await, run().await);
    }

    #[tokio::test]
    async fn empty_document_yields_empty_report() {
        let provider = Arc::new(ScriptedProvider::fixed("p", Compliance::Compliant, 0.9));
        let pipeline = coordinator(
            vec![rule("r-1", vec![1.0], Severity::Low, None)],
            vec![provider],
            AnomalyDetector::disabled(),
            quick_config(),
        );
        let report = pipeline.process("doc-1", vec![]).await;
        assert!(report.clauses.is_empty());
        assert_eq!(report.totals.total(), 0);
        assert_eq!(report.overall_score, 0.0);
    }

    #[test]
    fn undetermined_only_document_scores_zero() {
        // ExcludeUndetermined leaves an empty denominator here.
        let totals = VerdictTotals {
            compliant: 0,
            non_compliant: 0,
            undetermined: 3,
        };
        assert_eq!(document_score(&totals, ScorePolicy::ExcludeUndetermined), 0.0);
        assert_eq!(document_score(&totals, ScorePolicy::CountAsNonCompliant), 0.0);
    }
}
