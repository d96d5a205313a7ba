//! Verdict types flowing from retrieval through providers to aggregation.

use serde::{Deserialize, Serialize};

/// Three-valued compliance decision.
///
/// `Undetermined` is a real outcome, not an error: it covers provider
/// exhaustion, split votes, and models declining to judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compliance {
    Compliant,
    NonCompliant,
    Undetermined,
}

impl Compliance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::NonCompliant => "non_compliant",
            Self::Undetermined => "undetermined",
        }
    }
}

/// A candidate rule returned by similarity retrieval for one clause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub clause_id: String,
    pub rule_id: String,
    /// Cosine similarity clamped to [0, 1].
    pub score: f32,
    /// Position in the ranked result list, 0 is the best match.
    pub rank: usize,
}

/// One provider's parsed verdict for a clause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderVerdict {
    pub clause_id: String,
    pub provider_id: String,
    pub compliant: Compliance,
    /// Self-reported confidence in [0, 1].
    pub confidence: f32,
    pub rationale: String,
    /// Candidate rule ids the provider cited, filtered to real candidates.
    #[serde(default)]
    pub matched_rule_ids: Vec<String>,
}

/// The reconciled verdict for a clause. Only aggregation creates these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalVerdict {
    pub clause_id: String,
    pub compliant: Compliance,
    /// Trust-weighted mean of contributing confidences, in [0, 1].
    pub confidence: f32,
    /// Providers whose verdict matched the final decision.
    pub contributing_providers: Vec<String>,
    pub rationale: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compliance_serialises_snake_case() {
        assert_eq!(
            serde_json::to_string(&Compliance::NonCompliant).unwrap(),
            r#""non_compliant""#
        );
        let parsed: Compliance = serde_json::from_str(r#""undetermined""#).unwrap();
        assert_eq!(parsed, Compliance::Undetermined);
    }

    #[test]
    fn provider_verdict_matched_ids_default_empty() {
        let json = r#"{
            "clause_id": "c-1",
            "provider_id": "gemini",
            "compliant": "compliant",
            "confidence": 0.8,
            "rationale": "matches the disclosure permission"
        }"#;
        let verdict: ProviderVerdict = serde_json::from_str(json).unwrap();
        assert!(verdict.matched_rule_ids.is_empty());
        assert_eq!(verdict.compliant, Compliance::Compliant);
    }
}
