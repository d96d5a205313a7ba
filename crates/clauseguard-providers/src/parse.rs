//! Shared verdict reply parsing.
//!
//! Models wrap JSON in markdown fences and surrounding prose often enough
//! that stripping those is part of the contract rather than a workaround.

use clauseguard_core::{Compliance, ProviderVerdict};
use serde::Deserialize;

use crate::provider::{ProviderError, VerdictRequest};

#[derive(Deserialize)]
struct RawVerdict {
    compliant: serde_json::Value,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    rationale: String,
    #[serde(default)]
    matched_rule_ids: Vec<String>,
}

/// Extract the JSON object from a raw model reply, tolerating ```json
/// fences and leading/trailing prose.
pub fn extract_json(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            return Some(after[..end].trim());
        }
    }
    // No fence: take the outermost braces.
    let open = trimmed.find('{')?;
    let close = trimmed.rfind('}')?;
    (open < close).then(|| trimmed[open..=close].trim())
}

/// Parse a raw reply into a [`ProviderVerdict`] against the request's
/// candidate set.
///
/// `compliant` accepts JSON `true`/`false` or the string
/// `"undetermined"`; confidence is clamped to [0, 1]; matched rule ids
/// not present in the candidates are dropped.
pub fn parse_verdict(
    provider_id: &str,
    request: &VerdictRequest,
    raw: &str,
) -> Result<ProviderVerdict, ProviderError> {
    let json = extract_json(raw).ok_or_else(|| ProviderError::Parse {
        reason: "no JSON object in reply".into(),
    })?;
    let parsed: RawVerdict = serde_json::from_str(json).map_err(|e| ProviderError::Parse {
        reason: e.to_string(),
    })?;

    let compliant = match &parsed.compliant {
        serde_json::Value::Bool(true) => Compliance::Compliant,
        serde_json::Value::Bool(false) => Compliance::NonCompliant,
        serde_json::Value::String(s) if s.eq_ignore_ascii_case("undetermined") => {
            Compliance::Undetermined
        }
        other => {
            return Err(ProviderError::Parse {
                reason: format!("unrecognised compliant value: {other}"),
            });
        }
    };

    let matched_rule_ids = parsed
        .matched_rule_ids
        .into_iter()
        .filter(|id| request.candidates.iter().any(|c| &c.rule_id == id))
        .collect();

    Ok(ProviderVerdict {
        clause_id: request.clause_id.clone(),
        provider_id: provider_id.to_string(),
        compliant,
        confidence: parsed.confidence.clamp(0.0, 1.0),
        rationale: parsed.rationale,
        matched_rule_ids,
    })
}

#[cfg(test)]
mod tests {
    use crate::provider::CandidateRule;

    use super::*;

    fn request() -> VerdictRequest {
        VerdictRequest {
            clause_id: "c-1".into(),
            clause_text: "clause".into(),
            candidates: vec![CandidateRule {
                rule_id: "r-1".into(),
                text: "rule".into(),
                score: 0.8,
            }],
        }
    }

    #[test]
    fn parses_bare_json() {
        let raw = r#"{"compliant": true, "confidence": 0.9, "rationale": "permitted by r-1", "matched_rule_ids": ["r-1"]}"#;
        let verdict = parse_verdict("gemini", &request(), raw).unwrap();
        assert_eq!(verdict.compliant, Compliance::Compliant);
        assert_eq!(verdict.confidence, 0.9);
        assert_eq!(verdict.matched_rule_ids, vec!["r-1".to_string()]);
        assert_eq!(verdict.provider_id, "gemini");
        assert_eq!(verdict.clause_id, "c-1");
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "Here is my analysis:\n```json\n{\"compliant\": false, \"confidence\": 0.7, \"rationale\": \"violates r-1\"}\n```\nLet me know if you need more.";
        let verdict = parse_verdict("mistral", &request(), raw).unwrap();
        assert_eq!(verdict.compliant, Compliance::NonCompliant);
        assert_eq!(verdict.rationale, "violates r-1");
    }

    #[test]
    fn parses_prose_wrapped_braces() {
        let raw = r#"Sure. {"compliant": "undetermined", "confidence": 0.4, "rationale": "insufficient context"} Hope that helps."#;
        let verdict = parse_verdict("gemini", &request(), raw).unwrap();
        assert_eq!(verdict.compliant, Compliance::Undetermined);
    }

    #[test]
    fn clamps_out_of_range_confidence() {
        let raw = r#"{"compliant": true, "confidence": 1.7, "rationale": ""}"#;
        let verdict = parse_verdict("gemini", &request(), raw).unwrap();
        assert_eq!(verdict.confidence, 1.0);

        let raw = r#"{"compliant": true, "confidence": -0.3, "rationale": ""}"#;
        let verdict = parse_verdict("gemini", &request(), raw).unwrap();
        assert_eq!(verdict.confidence, 0.0);
    }

    #[test]
    fn drops_unknown_matched_rule_ids() {
        let raw = r#"{"compliant": true, "confidence": 0.8, "rationale": "", "matched_rule_ids": ["r-1", "r-invented"]}"#;
        let verdict = parse_verdict("gemini", &request(), raw).unwrap();
        assert_eq!(verdict.matched_rule_ids, vec!["r-1".to_string()]);
    }

    #[test]
    fn rejects_reply_without_json() {
        let err = parse_verdict("gemini", &request(), "I cannot judge this clause.").unwrap_err();
        assert!(matches!(err, ProviderError::Parse { .. }));
    }

    #[test]
    fn rejects_unknown_compliant_value() {
        let raw = r#"{"compliant": "maybe", "confidence": 0.5, "rationale": ""}"#;
        let err = parse_verdict("gemini", &request(), raw).unwrap_err();
        assert!(matches!(err, ProviderError::Parse { .. }));
    }

    #[test]
    fn missing_optional_fields_default() {
        let raw = r#"{"compliant": false}"#;
        let verdict = parse_verdict("gemini", &request(), raw).unwrap();
        assert_eq!(verdict.confidence, 0.0);
        assert!(verdict.rationale.is_empty());
        assert!(verdict.matched_rule_ids.is_empty());
    }
}
