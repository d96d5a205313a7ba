//! Verdict prompt construction shared by the HTTP providers.

use crate::provider::VerdictRequest;

pub const SYSTEM_PROMPT: &str = "You are a regulatory compliance analyst. Judge whether the \
     clause complies with the cited regulations. Respond with JSON only.";

/// Render the user prompt: clause text plus numbered candidate rules and
/// the required reply schema.
///
/// With no candidates the model is told to judge on general regulatory
/// principles; verification still happens.
pub fn build_prompt(request: &VerdictRequest) -> String {
    let mut prompt = String::new();
    prompt.push_str("Clause under review:\n");
    prompt.push_str(&request.clause_text);
    prompt.push_str("\n\n");

    if request.candidates.is_empty() {
        prompt.push_str(
            "No specific regulation matched this clause; judge it on general \
             regulatory principles.\n\n",
        );
    } else {
        prompt.push_str("Relevant regulations:\n");
        for (i, candidate) in request.candidates.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. [{}] {}\n",
                i + 1,
                candidate.rule_id,
                candidate.text
            ));
        }
        prompt.push('\n');
    }

    prompt.push_str(
        "Return ONLY valid JSON: {\"compliant\": true|false|\"undetermined\", \
         \"confidence\": 0.0-1.0, \"rationale\": \"...\", \"matched_rule_ids\": [\"...\"]}",
    );
    prompt
}
