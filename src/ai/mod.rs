//! Generative-AI collaborator
//!
//! The verdict pipeline talks to the AI through [`VerdictOracle`]. The shipped
//! implementation is [`GeminiClient`]; [`AiFallbackClassifier`] wraps any oracle
//! with a timeout, a circuit breaker and failure accounting.

pub mod circuit_breaker;
pub mod fallback;
pub mod gemini;
pub mod prompt;

pub use circuit_breaker::{BreakerState, CircuitBreaker, CircuitBreakerConfig};
pub use fallback::AiFallbackClassifier;
pub use gemini::GeminiClient;

use crate::models::{ProviderResult, Verdict};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// AI collaborator failures. All of them degrade to the provisional verdict.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FallbackError {
    #[error("AI fallback is disabled")]
    Disabled,

    #[error("AI API key not configured")]
    MissingApiKey,

    #[error("AI API key is invalid: {0}")]
    InvalidKey(String),

    #[error("AI quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("AI request timed out after {0} ms")]
    Timeout(u64),

    #[error("Circuit breaker is open: {0}")]
    CircuitOpen(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Malformed AI output: {0}")]
    Malformed(String),
}

impl FallbackError {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::MissingApiKey => "missing_key",
            Self::InvalidKey(_) => "invalid_key",
            Self::QuotaExceeded(_) => "quota",
            Self::Timeout(_) => "timeout",
            Self::CircuitOpen(_) => "circuit_open",
            Self::RequestFailed(_) => "request_failed",
            Self::UpstreamError(_) => "upstream_error",
            Self::Malformed(_) => "malformed",
        }
    }

    /// Whether the failure says something about the health of the AI service.
    /// Configuration gaps and an open breaker do not count against it.
    pub fn counts_against_service(&self) -> bool {
        !matches!(self, Self::Disabled | Self::MissingApiKey | Self::CircuitOpen(_))
    }
}

/// Verdict produced by the AI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiJudgement {
    pub verdict: Verdict,
    pub confidence: f32,
    pub explanation: String,
}

#[async_trait]
pub trait VerdictOracle: Send + Sync {
    /// Model identifier, for logs
    fn model(&self) -> &str;

    /// Judge the claim from the evidence, or from general knowledge when
    /// `evidence` is empty
    async fn classify(
        &self,
        claim: &str,
        evidence: &[ProviderResult],
    ) -> Result<AiJudgement, FallbackError>;

    /// Explain an already settled verdict from the evidence
    async fn explain(
        &self,
        claim: &str,
        verdict: Verdict,
        evidence: &[ProviderResult],
    ) -> Result<String, FallbackError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(FallbackError::Timeout(8000).kind(), "timeout");
        assert_eq!(FallbackError::QuotaExceeded("429".into()).kind(), "quota");
        assert_eq!(
            FallbackError::Timeout(8000).to_string(),
            "AI request timed out after 8000 ms"
        );
    }

    #[test]
    fn test_service_health_accounting() {
        assert!(FallbackError::Timeout(10).counts_against_service());
        assert!(FallbackError::Malformed("not json".into()).counts_against_service());
        assert!(!FallbackError::MissingApiKey.counts_against_service());
        assert!(!FallbackError::CircuitOpen("classify".into()).counts_against_service());
    }
}
