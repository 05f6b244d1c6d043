//! Timeout-bounded, breaker-guarded access to a [`VerdictOracle`]

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use super::{AiJudgement, FallbackError, VerdictOracle};
use crate::config::AiConfig;
use crate::metrics::METRICS;
use crate::models::{ProviderResult, Verdict};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const CLASSIFY: &str = "classify";
const EXPLAIN: &str = "explain";

pub struct AiFallbackClassifier {
    oracle: Arc<dyn VerdictOracle>,
    enabled: bool,
    timeout: Duration,
    breaker: CircuitBreaker,
}

impl AiFallbackClassifier {
    pub fn new(oracle: Arc<dyn VerdictOracle>, config: &AiConfig) -> Self {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: config.circuit_breaker_failures.max(1),
            reset_timeout: config.breaker_reset_timeout(),
        });

        Self {
            oracle,
            enabled: config.enabled,
            timeout: config.timeout(),
            breaker,
        }
    }

    /// Ask the AI for a verdict when provider consensus is weak or absent
    pub async fn classify_with_ai(
        &self,
        claim: &str,
        sources: &[ProviderResult],
    ) -> Result<AiJudgement, FallbackError> {
        let judgement = self
            .guarded(CLASSIFY, self.oracle.classify(claim, sources))
            .await?;
        info!(
            model = self.oracle.model(),
            verdict = %judgement.verdict,
            confidence = judgement.confidence,
            "AI classified claim"
        );
        Ok(judgement)
    }

    /// Ask the AI to explain a verdict the providers already settled
    pub async fn explain(
        &self,
        claim: &str,
        verdict: Verdict,
        sources: &[ProviderResult],
    ) -> Result<String, FallbackError> {
        self.guarded(EXPLAIN, self.oracle.explain(claim, verdict, sources))
            .await
    }

    async fn guarded<T, F>(&self, operation: &str, call: F) -> Result<T, FallbackError>
    where
        F: Future<Output = Result<T, FallbackError>>,
    {
        let outcome = self.run(operation, call).await;

        match &outcome {
            Ok(_) => {
                self.breaker.mark_success(operation);
                METRICS.record_ai(operation, "success");
            }
            Err(e) => {
                if e.counts_against_service() {
                    self.breaker.mark_failure(operation);
                } else if !matches!(e, FallbackError::Disabled | FallbackError::CircuitOpen(_)) {
                    self.breaker.release_trial(operation);
                }
                METRICS.record_ai(operation, e.kind());
                warn!(
                    model = self.oracle.model(),
                    operation,
                    kind = e.kind(),
                    "AI fallback unavailable: {}",
                    e
                );
            }
        }

        outcome
    }

    async fn run<T, F>(&self, operation: &str, call: F) -> Result<T, FallbackError>
    where
        F: Future<Output = Result<T, FallbackError>>,
    {
        if !self.enabled {
            return Err(FallbackError::Disabled);
        }
        if self.breaker.is_open(operation) {
            return Err(FallbackError::CircuitOpen(operation.to_string()));
        }

        let timer = METRICS
            .ai_request_duration
            .with_label_values(&[operation])
            .start_timer();
        let result = tokio::time::timeout(self.timeout, call).await;
        timer.observe_duration();

        match result {
            Ok(inner) => inner,
            Err(_) => Err(FallbackError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}
