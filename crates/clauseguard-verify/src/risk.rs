//! Deterministic risk assessment from a final verdict and matched rules.

use clauseguard_core::{Compliance, FinalVerdict, RiskAssessment, Severity};
use tracing::debug;

const GENERAL_CATEGORY: &str = "general";

/// A matched rule as the explainer sees it: the retrieval score plus the
/// rule's severity tag and category, resolved from the index by the caller.
#[derive(Debug, Clone)]
pub struct RuleContext {
    pub rule_id: String,
    pub score: f32,
    pub severity: Severity,
    pub category: Option<String>,
}

/// Maps a verdict and its matched-rule context to severity, category,
/// numeric score, and impact/mitigation text. Pure function of its inputs;
/// any provider-authored rationale stays on the verdict.
#[derive(Debug, Default, Clone, Copy)]
pub struct RiskExplainer;

impl RiskExplainer {
    pub fn new() -> Self {
        Self
    }

    pub fn explain(&self, verdict: &FinalVerdict, matches: &[RuleContext]) -> RiskAssessment {
        let peak = matches
            .iter()
            .map(|m| m.severity)
            .max()
            .unwrap_or(Severity::None);

        // A compliant clause that touched a high-severity rule is not
        // risk-free; it gets flagged for human review.
        let flagged_for_review =
            verdict.compliant == Compliance::Compliant && peak == Severity::High;

        let severity = match verdict.compliant {
            Compliance::NonCompliant if matches.is_empty() => Severity::Medium,
            Compliance::NonCompliant => peak,
            Compliance::Undetermined => Severity::Low,
            Compliance::Compliant if flagged_for_review => Severity::Low,
            Compliance::Compliant => Severity::None,
        };

        let category = dominant_category(matches);
        let score = (severity_base(severity) + 0.15 * (1.0 - verdict.confidence.clamp(0.0, 1.0)))
            .min(1.0);

        debug!(
            clause = %verdict.clause_id,
            severity = severity.as_str(),
            category = %category,
            "assessed risk"
        );
        RiskAssessment {
            clause_id: verdict.clause_id.clone(),
            severity,
            mitigation: mitigation_text(verdict.compliant, flagged_for_review, &category),
            impact: impact_text(severity).to_string(),
            category,
            score,
        }
    }
}

/// Category of the highest-severity matched rule that carries one, ties
/// broken by rule id. `"general"` when no matched rule is categorized.
fn dominant_category(matches: &[RuleContext]) -> String {
    matches
        .iter()
        .filter(|m| m.category.is_some())
        .min_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.rule_id.cmp(&b.rule_id)))
        .and_then(|m| m.category.clone())
        .unwrap_or_else(|| GENERAL_CATEGORY.to_string())
}

fn severity_base(severity: Severity) -> f32 {
    match severity {
        Severity::None => 0.0,
        Severity::Low => 0.3,
        Severity::Medium => 0.6,
        Severity::High => 0.85,
    }
}

fn impact_text(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "Material regulatory exposure; remediation required before execution.",
        Severity::Medium => "Potential regulatory exposure; the clause should be amended.",
        Severity::Low => "Limited exposure; warrants counsel attention.",
        Severity::None => "No regulatory exposure identified.",
    }
}

fn mitigation_text(compliant: Compliance, flagged_for_review: bool, category: &str) -> String {
    match compliant {
        Compliance::Compliant if flagged_for_review => {
            "Schedule counsel review against the matched high-severity provisions.".to_string()
        }
        Compliance::Compliant => "No action required.".to_string(),
        Compliance::Undetermined => {
            "Obtain a manual compliance determination for this clause.".to_string()
        }
        Compliance::NonCompliant => {
            format!("Align the clause with the cited {category} provisions and re-verify.")
        }
    }
}
