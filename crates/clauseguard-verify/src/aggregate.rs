//! Majority vote across provider verdicts with trust-weighted confidence.

use std::collections::HashMap;

use clauseguard_core::{Compliance, FinalVerdict, ProviderVerdict};
use tracing::debug;

/// Rationale when providers split evenly with no undetermined votes.
const SPLIT_RATIONALE: &str = "providers split; verdict undetermined";
const NO_VERDICTS_RATIONALE: &str = "no provider verdicts";

/// Combines per-provider verdicts into one [`FinalVerdict`].
///
/// The vote is unweighted; trust weights only shape the confidence of
/// the winning side. Ties resolve to undetermined.
#[derive(Debug, Default, Clone)]
pub struct VerdictAggregator {
    trust_weights: HashMap<String, f32>,
}

impl VerdictAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trust weight for one provider. Unlisted providers weigh 1.0.
    pub fn with_weight(mut self, provider_id: impl Into<String>, weight: f32) -> Self {
        self.trust_weights
            .insert(provider_id.into(), weight.max(0.0));
        self
    }

    pub fn aggregate(&self, clause_id: &str, verdicts: &[ProviderVerdict]) -> FinalVerdict {
        if verdicts.is_empty() {
            return FinalVerdict {
                clause_id: clause_id.to_string(),
                compliant: Compliance::Undetermined,
                confidence: 0.0,
                contributing_providers: Vec::new(),
                rationale: NO_VERDICTS_RATIONALE.to_string(),
            };
        }

        let winner = majority(verdicts);
        let contributors: Vec<&ProviderVerdict> =
            verdicts.iter().filter(|v| v.compliant == winner).collect();

        if contributors.is_empty() {
            // Even split with no undetermined votes to carry the tie.
            return FinalVerdict {
                clause_id: clause_id.to_string(),
                compliant: Compliance::Undetermined,
                confidence: 0.0,
                contributing_providers: Vec::new(),
                rationale: SPLIT_RATIONALE.to_string(),
            };
        }

        let mut weighted = 0.0f32;
        let mut total_weight = 0.0f32;
        for verdict in &contributors {
            let weight = self.weight_of(&verdict.provider_id);
            weighted += weight * verdict.confidence;
            total_weight += weight;
        }
        let confidence = if total_weight > 0.0 {
            (weighted / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        };

        debug!(
            clause = clause_id,
            verdict = winner.as_str(),
            contributors = contributors.len(),
            "aggregated verdicts"
        );
        FinalVerdict {
            clause_id: clause_id.to_string(),
            compliant: winner,
            confidence,
            contributing_providers: contributors
                .iter()
                .map(|v| v.provider_id.clone())
                .collect(),
            rationale: join_rationales(&contributors),
        }
    }

    fn weight_of(&self, provider_id: &str) -> f32 {
        self.trust_weights.get(provider_id).copied().unwrap_or(1.0)
    }
}

/// Plurality winner, or undetermined when the top count is shared.
fn majority(verdicts: &[ProviderVerdict]) -> Compliance {
    let mut counts = [
        (Compliance::Compliant, 0usize),
        (Compliance::NonCompliant, 0),
        (Compliance::Undetermined, 0),
    ];
    for verdict in verdicts {
        for entry in counts.iter_mut() {
            if entry.0 == verdict.compliant {
                entry.1 += 1;
            }
        }
    }
    let top = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let winners: Vec<Compliance> = counts
        .iter()
        .filter(|(_, n)| *n == top && top > 0)
        .map(|(c, _)| *c)
        .collect();
    match winners.as_slice() {
        [single] => *single,
        _ => Compliance::Undetermined,
    }
}

/// Contributor rationales, deduplicated in order, joined with `" | "`.
fn join_rationales(contributors: &[&ProviderVerdict]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for verdict in contributors {
        let rationale = verdict.rationale.trim();
        if rationale.is_empty() || seen.contains(&rationale) {
            continue;
        }
        seen.push(rationale);
    }
    seen.join(" | ")
}
