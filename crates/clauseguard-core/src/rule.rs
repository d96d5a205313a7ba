//! Regulation rule types for the retrieval corpus.
//!
//! The corpus is built and embedded outside the pipeline; rules are
//! read-only once loaded.

use serde::{Deserialize, Serialize};

/// Severity tag attached to a rule at corpus build time.
///
/// Ordered so escalation across several matched rules is a plain `max`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// A regulatory rule from the prebuilt corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulationRule {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub severity_tag: Severity,
    #[serde(default)]
    pub metadata: RuleMetadata,
}

/// Provenance and classification attached at corpus build time.
/// `category` drives risk mitigation templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleMetadata {
    #[serde(default)]
    pub source_doc: Option<String>,
    #[serde(default)]
    pub provision: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_escalation_order() {
        assert!(Severity::None < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert_eq!(
            [Severity::Low, Severity::High, Severity::Medium]
                .into_iter()
                .max(),
            Some(Severity::High)
        );
    }

    #[test]
    fn severity_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), r#""high""#);
        let parsed: Severity = serde_json::from_str(r#""medium""#).unwrap();
        assert_eq!(parsed, Severity::Medium);
    }

    #[test]
    fn rule_parses_with_defaults() {
        let json = r#"{
            "id": "rbi-disclosure-12",
            "text": "A bank may disclose borrower information to the regulator.",
            "embedding": [1.0, 0.0]
        }"#;
        let rule: RegulationRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.severity_tag, Severity::None);
        assert!(rule.metadata.category.is_none());
    }

    #[test]
    fn rule_parses_full_metadata() {
        let json = r#"{
            "id": "rbi-disclosure-12",
            "text": "...",
            "embedding": [],
            "severity_tag": "high",
            "metadata": {
                "source_doc": "RBI Master Direction 2016",
                "provision": "s.12(1)",
                "category": "disclosure"
            }
        }"#;
        let rule: RegulationRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.severity_tag, Severity::High);
        assert_eq!(rule.metadata.category.as_deref(), Some("disclosure"));
        assert_eq!(rule.metadata.provision.as_deref(), Some("s.12(1)"));
    }
}
