//! The provider capability: send a verdict request, parse the raw reply.
//!
//! The orchestrator treats every backend through this one interface;
//! adding a provider means implementing the trait, not branching on a
//! provider name.

use std::fmt;

use async_trait::async_trait;
use clauseguard_core::ProviderVerdict;
use thiserror::Error;

/// Error classes drive orchestration policy: `Transient` is retried with
/// backoff, `Fatal` and `Parse` fail over to the next provider
/// immediately.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transient provider failure: {reason}")]
    Transient { reason: String },

    #[error("provider failure: {reason}")]
    Fatal { reason: String },

    #[error("unparseable verdict: {reason}")]
    Parse { reason: String },
}

impl ProviderError {
    /// Classify a transport error. Connect and timeout failures are worth
    /// retrying; anything else in the transport layer is not.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::Transient {
                reason: err.to_string(),
            }
        } else {
            Self::Fatal {
                reason: err.to_string(),
            }
        }
    }

    /// Classify a non-success HTTP status. Rate limits and server errors
    /// are retryable; client errors (bad request, auth) are not.
    pub fn from_status(status: u16, body: String) -> Self {
        let reason = format!("status {status}: {body}");
        if status == 429 || status >= 500 {
            Self::Transient { reason }
        } else {
            Self::Fatal { reason }
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Short class name for diagnostic notes.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Transient { .. } => "transient",
            Self::Fatal { .. } => "fatal",
            Self::Parse { .. } => "parse",
        }
    }
}

/// What a provider is asked to judge: one clause plus its retrieved
/// candidate rules, texts already resolved by the caller.
#[derive(Debug, Clone)]
pub struct VerdictRequest {
    pub clause_id: String,
    pub clause_text: String,
    pub candidates: Vec<CandidateRule>,
}

/// A candidate rule with its text resolved for prompting.
#[derive(Debug, Clone)]
pub struct CandidateRule {
    pub rule_id: String,
    pub text: String,
    pub score: f32,
}

/// An LLM backend able to render compliance verdicts.
///
/// `send` returns the raw model reply text; `parse` turns it into a
/// [`ProviderVerdict`]. The default `parse` expects the shared JSON
/// verdict schema (see [`crate::parse`]); a backend whose reply envelope
/// differs unwraps it in `send` and keeps the default.
#[async_trait]
pub trait VerdictProvider: Send + Sync {
    /// Stable identifier used in reports, weights, and failover order.
    fn id(&self) -> &str;

    /// Relative trust weight for confidence aggregation.
    fn trust_weight(&self) -> f32 {
        1.0
    }

    async fn send(&self, request: &VerdictRequest) -> Result<String, ProviderError>;

    fn parse(
        &self,
        request: &VerdictRequest,
        raw: &str,
    ) -> Result<ProviderVerdict, ProviderError> {
        crate::parse::parse_verdict(self.id(), request, raw)
    }

    /// Cheap reachability probe for health checks. Backends without a
    /// remote dependency are always reachable.
    async fn reachable(&self) -> bool {
        true
    }
}

impl fmt::Debug for dyn VerdictProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerdictProvider")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(ProviderError::from_status(429, String::new()).is_transient());
        assert!(ProviderError::from_status(500, String::new()).is_transient());
        assert!(ProviderError::from_status(503, String::new()).is_transient());
        assert!(!ProviderError::from_status(400, String::new()).is_transient());
        assert!(!ProviderError::from_status(401, String::new()).is_transient());
        assert!(!ProviderError::from_status(404, String::new()).is_transient());
    }

    #[test]
    fn error_class_names() {
        let transient = ProviderError::Transient {
            reason: "x".into(),
        };
        let parse = ProviderError::Parse { reason: "x".into() };
        assert_eq!(transient.class(), "transient");
        assert_eq!(parse.class(), "parse");
        assert!(!parse.is_transient());
    }
}
