//! Gemini verdict provider over the `generateContent` REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::prompt;
use crate::provider::{ProviderError, VerdictProvider, VerdictRequest};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Verdict provider backed by Google's Gemini `generateContent` endpoint.
///
/// The API takes the whole conversation as `contents`; system guidance is
/// prepended to the single user turn.
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    trust_weight: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ReplyCandidate>,
}

#[derive(Deserialize)]
struct ReplyCandidate {
    content: ReplyContent,
}

#[derive(Deserialize)]
struct ReplyContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
struct ReplyPart {
    #[serde(default)]
    text: String,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string(), api_key)
    }

    /// Point the provider at a different host, e.g. a local stub.
    pub fn with_base_url(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key,
            trust_weight: 1.0,
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn with_trust_weight(mut self, weight: f32) -> Self {
        self.trust_weight = weight;
        self
    }
}

#[async_trait]
impl VerdictProvider for GeminiProvider {
    fn id(&self) -> &str {
        "gemini"
    }

    fn trust_weight(&self) -> f32 {
        self.trust_weight
    }

    async fn send(&self, request: &VerdictRequest) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let text = format!(
            "{}\n{}",
            prompt::SYSTEM_PROMPT,
            prompt::build_prompt(request)
        );
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &text }],
            }],
        };

        debug!(clause = %request.clause_id, model = %self.model, "requesting gemini verdict");
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let parsed: GenerateResponse = resp.json().await.map_err(|e| ProviderError::Parse {
            reason: e.to_string(),
        })?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| ProviderError::Parse {
                reason: "empty gemini reply".into(),
            })
    }

    async fn reachable(&self) -> bool {
        let url = format!("{}/v1beta/models?key={}", self.base_url, self.api_key);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trims_trailing_slash() {
        let provider =
            GeminiProvider::with_base_url("http://localhost:9000/".into(), "key".into());
        assert_eq!(provider.base_url, "http://localhost:9000");
        assert_eq!(provider.id(), "gemini");
    }

    #[test]
    fn reply_envelope_deserialises() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"compliant\": true}"}], "role": "model"}}
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.candidates[0].content.parts[0].text,
            r#"{"compliant": true}"#
        );
    }

    #[test]
    fn empty_envelope_deserialises_to_no_candidates() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }
}
