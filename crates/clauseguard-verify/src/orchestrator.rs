//! Provider engagement with retry, backoff, timeout, and failover.

use std::sync::Arc;
use std::time::Duration;

use clauseguard_core::{OrchestratorConfig, ProviderVerdict};
use clauseguard_providers::{VerdictProvider, VerdictRequest};
use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, warn};

/// What one clause's round of provider calls produced.
#[derive(Debug)]
pub struct VerifyOutcome {
    pub verdicts: Vec<ProviderVerdict>,
    /// Human-readable per-provider failure notes, `"{provider}: {reason}"`.
    pub notes: Vec<String>,
}

/// Where a single provider engagement stands.
enum AttemptState {
    /// Ready for attempt number `attempt` (zero-based).
    Pending {
        attempt: u32,
        last_error: Option<String>,
    },
    Success(ProviderVerdict),
    Exhausted { reason: String },
}

/// Runs providers in order until enough verdicts are collected.
///
/// Each provider gets up to `max_attempts_per_provider` tries with
/// exponential backoff between them; transient failures and timeouts
/// retry, fatal and parse failures move straight to the next provider.
pub struct Orchestrator {
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { config }
    }

    /// Collect verdicts for one clause, stopping once `min_verdicts`
    /// providers have answered or every provider has been tried.
    ///
    /// `deadline` bounds the whole document; once it passes, remaining
    /// providers are skipped rather than started.
    pub async fn verify(
        &self,
        request: &VerdictRequest,
        providers: &[Arc<dyn VerdictProvider>],
        deadline: Option<Instant>,
    ) -> VerifyOutcome {
        let clause_deadline = self.clause_deadline(deadline);
        let needed = self.config.min_verdicts.max(1);
        let mut verdicts = Vec::new();
        let mut notes = Vec::new();

        for provider in providers {
            if verdicts.len() >= needed {
                break;
            }
            if Instant::now() >= clause_deadline {
                notes.push(format!("{}: skipped (deadline passed)", provider.id()));
                continue;
            }
            match self
                .engage(provider.as_ref(), request, clause_deadline)
                .await
            {
                Ok(verdict) => verdicts.push(verdict),
                Err(reason) => notes.push(format!("{}: {reason}", provider.id())),
            }
        }

        if verdicts.len() < needed {
            warn!(
                clause = %request.clause_id,
                got = verdicts.len(),
                needed,
                "fewer verdicts than requested"
            );
        }
        VerifyOutcome { verdicts, notes }
    }

    /// Drive one provider through its retry state machine.
    async fn engage(
        &self,
        provider: &dyn VerdictProvider,
        request: &VerdictRequest,
        deadline: Instant,
    ) -> Result<ProviderVerdict, String> {
        let mut state = AttemptState::Pending {
            attempt: 0,
            last_error: None,
        };
        loop {
            state = match state {
                AttemptState::Pending {
                    attempt,
                    last_error,
                } => {
                    if attempt >= self.config.max_attempts_per_provider {
                        let detail = last_error.unwrap_or_else(|| "no attempts made".into());
                        AttemptState::Exhausted {
                            reason: format!("gave up after {attempt} attempts ({detail})"),
                        }
                    } else {
                        if attempt > 0 {
                            tokio::time::sleep(self.backoff_delay(attempt - 1)).await;
                        }
                        if Instant::now() >= deadline {
                            AttemptState::Exhausted {
                                reason: "deadline passed before attempt".into(),
                            }
                        } else {
                            self.attempt_once(provider, request, attempt).await
                        }
                    }
                }
                AttemptState::Success(verdict) => return Ok(verdict),
                AttemptState::Exhausted { reason } => return Err(reason),
            };
        }
    }

    async fn attempt_once(
        &self,
        provider: &dyn VerdictProvider,
        request: &VerdictRequest,
        attempt: u32,
    ) -> AttemptState {
        debug!(
            provider = provider.id(),
            clause = %request.clause_id,
            attempt = attempt + 1,
            "requesting verdict"
        );
        let reply =
            tokio::time::timeout(self.config.provider_timeout(), provider.send(request)).await;
        match reply {
            Err(_elapsed) => AttemptState::Pending {
                attempt: attempt + 1,
                last_error: Some(format!(
                    "timed out after {}ms",
                    self.config.provider_timeout_ms
                )),
            },
            Ok(Err(err)) if err.is_transient() => {
                warn!(
                    provider = provider.id(),
                    clause = %request.clause_id,
                    error = %err,
                    "transient provider failure"
                );
                AttemptState::Pending {
                    attempt: attempt + 1,
                    last_error: Some(err.to_string()),
                }
            }
            Ok(Err(err)) => AttemptState::Exhausted {
                reason: err.to_string(),
            },
            Ok(Ok(raw)) => match provider.parse(request, &raw) {
                Ok(verdict) => AttemptState::Success(verdict),
                Err(err) => AttemptState::Exhausted {
                    reason: err.to_string(),
                },
            },
        }
    }

    /// Delay before retry number `retry` (zero-based), with jitter.
    fn backoff_delay(&self, retry: u32) -> Duration {
        let backoff = &self.config.backoff;
        let base = backoff.initial_delay_ms as f64 * backoff.multiplier.powi(retry as i32);
        let capped = base.min(backoff.max_delay_ms as f64) as u64;
        let jitter = if backoff.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=backoff.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(capped + jitter)
    }

    /// The earlier of the per-clause budget and the document deadline.
    fn clause_deadline(&self, document_deadline: Option<Instant>) -> Instant {
        let clause = Instant::now() + self.config.clause_timeout();
        match document_deadline {
            Some(doc) if doc < clause => doc,
            _ => clause,
        }
    }
}
