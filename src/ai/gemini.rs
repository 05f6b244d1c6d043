//! Gemini `generateContent` client

use super::prompt::{classify_prompt, explain_prompt, parse_judgement};
use super::{AiJudgement, FallbackError, VerdictOracle};
use crate::config::AiConfig;
use crate::models::{ProviderResult, Verdict};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Gemini REST client implementing [`VerdictOracle`]
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
    timeout_ms: u64,
    max_evidence_sources: usize,
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> Result<Self, FallbackError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FallbackError::RequestFailed(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout_ms: config.timeout_ms,
            max_evidence_sources: config.max_evidence_sources,
        })
    }

    /// Send one prompt and return the concatenated candidate text
    async fn generate(&self, prompt: &str, operation: &str) -> Result<String, FallbackError> {
        let api_key = self
            .api_key
            .as_ref()
            .filter(|k| !k.expose_secret().trim().is_empty())
            .ok_or(FallbackError::MissingApiKey)?;

        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        debug!(model = %self.model, operation, "Sending Gemini request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FallbackError::Timeout(self.timeout_ms)
                } else {
                    FallbackError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_http_error(status, &body);
            match &err {
                FallbackError::InvalidKey(_) => {
                    error!(operation, "Gemini rejected the API key; update GEMINI_API_KEY")
                }
                FallbackError::QuotaExceeded(_) => {
                    warn!(operation, remaining_limit = 0, "Gemini quota exhausted")
                }
                other => error!(operation, "Gemini request failed: {}", other),
            }
            return Err(err);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| FallbackError::Malformed(format!("unreadable response: {}", e)))?;

        let usage = parsed.usage_metadata.unwrap_or_default();
        debug!(
            operation,
            prompt_tokens = usage.prompt_token_count,
            candidates_tokens = usage.candidates_token_count,
            total_tokens = usage.total_token_count,
            "Gemini usage"
        );

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(FallbackError::Malformed("Gemini returned no text".to_string()));
        }
        Ok(text.to_string())
    }
}

/// Map a non-success HTTP answer onto a fallback error
fn classify_http_error(status: StatusCode, body: &str) -> FallbackError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.chars().take(200).collect(), String::new()),
    };
    let lower = format!("{} {}", message, api_status).to_lowercase();

    if status == StatusCode::TOO_MANY_REQUESTS
        || lower.contains("quota")
        || lower.contains("exhausted")
    {
        FallbackError::QuotaExceeded(message)
    } else if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || (lower.contains("api key") && (lower.contains("invalid") || lower.contains("not valid")))
    {
        FallbackError::InvalidKey(message)
    } else {
        FallbackError::UpstreamError(format!("HTTP {}: {}", status.as_u16(), message))
    }
}

#[async_trait]
impl VerdictOracle for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn classify(
        &self,
        claim: &str,
        evidence: &[ProviderResult],
    ) -> Result<AiJudgement, FallbackError> {
        let prompt = classify_prompt(claim, evidence, self.max_evidence_sources);
        let text = self.generate(&prompt, "classify").await?;
        parse_judgement(&text)
    }

    async fn explain(
        &self,
        claim: &str,
        verdict: Verdict,
        evidence: &[ProviderResult],
    ) -> Result<String, FallbackError> {
        let prompt = explain_prompt(claim, verdict, evidence, self.max_evidence_sources);
        self.generate(&prompt, "explain").await
    }
}
