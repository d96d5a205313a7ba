//! Scripted provider replaying canned replies and failures.
//!
//! Doubles as the offline backend (`--offline` smoke runs) and the
//! deterministic test double for orchestrator and pipeline behaviour.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use clauseguard_core::Compliance;

use crate::provider::{ProviderError, VerdictProvider, VerdictRequest};

/// One step of a script: what the next `send` call does.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Return this raw reply text.
    Reply(String),
    /// Fail with a retryable error.
    TransientFailure(String),
    /// Fail with a non-retryable error.
    FatalFailure(String),
    /// Never answer; exercises the caller's timeout handling.
    Hang,
}

struct ScriptState {
    steps: Vec<ScriptStep>,
    cursor: usize,
    calls: usize,
}

/// Provider that replays a fixed script.
///
/// Steps are consumed in order; once exhausted, the last step repeats so
/// a one-step script behaves as a constant provider. An empty script
/// always fails.
pub struct ScriptedProvider {
    id: String,
    trust_weight: f32,
    state: Mutex<ScriptState>,
}

impl ScriptedProvider {
    pub fn with_script(id: impl Into<String>, steps: Vec<ScriptStep>) -> Self {
        Self {
            id: id.into(),
            trust_weight: 1.0,
            state: Mutex::new(ScriptState {
                steps,
                cursor: 0,
                calls: 0,
            }),
        }
    }

    /// A provider that always returns the same verdict.
    pub fn fixed(id: impl Into<String>, compliant: Compliance, confidence: f32) -> Self {
        Self::with_script(
            id,
            vec![ScriptStep::Reply(verdict_reply(
                compliant,
                confidence,
                "scripted verdict",
                &[],
            ))],
        )
    }

    pub fn with_trust_weight(mut self, weight: f32) -> Self {
        self.trust_weight = weight;
        self
    }

    /// Number of `send` calls so far.
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).calls
    }
}

/// Render a reply in the shared verdict JSON schema.
pub fn verdict_reply(
    compliant: Compliance,
    confidence: f32,
    rationale: &str,
    matched_rule_ids: &[&str],
) -> String {
    let compliant_value = match compliant {
        Compliance::Compliant => serde_json::Value::Bool(true),
        Compliance::NonCompliant => serde_json::Value::Bool(false),
        Compliance::Undetermined => serde_json::Value::String("undetermined".into()),
    };
    serde_json::json!({
        "compliant": compliant_value,
        "confidence": confidence,
        "rationale": rationale,
        "matched_rule_ids": matched_rule_ids,
    })
    .to_string()
}

#[async_trait]
impl VerdictProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn trust_weight(&self) -> f32 {
        self.trust_weight
    }

    async fn send(&self, _request: &VerdictRequest) -> Result<String, ProviderError> {
        // The guard must drop before any await below.
        let step = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.calls += 1;
            let idx = state.cursor;
            let step = state.steps.get(idx).cloned();
            if idx + 1 < state.steps.len() {
                state.cursor = idx + 1;
            }
            step
        };

        match step {
            None => Err(ProviderError::Fatal {
                reason: "empty script".into(),
            }),
            Some(ScriptStep::Reply(text)) => Ok(text),
            Some(ScriptStep::TransientFailure(reason)) => {
                Err(ProviderError::Transient { reason })
            }
            Some(ScriptStep::FatalFailure(reason)) => Err(ProviderError::Fatal { reason }),
            Some(ScriptStep::Hang) => {
                tokio::time::sleep(Duration::from_secs(86_400)).await;
                Err(ProviderError::Transient {
                    reason: "hang elapsed".into(),
                })
            }
        }
    }
}
