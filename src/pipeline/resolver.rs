//! Verdict resolver
//!
//! Runs the stages in fixed order for one claim:
//! similarity filter, rating normalizer, majority aggregator, then the AI
//! fallback (or AI explanation) and the explanation composer. Only a bad
//! threshold can fail a resolution; every collaborator failure degrades to the
//! provisional majority result.

use super::aggregator::{aggregate, tally};
use super::embedder::{build_embedder, Embedder};
use super::explanation::compose;
use super::normalizer::RatingNormalizer;
use super::similarity::SimilarityFilter;
use crate::ai::{AiFallbackClassifier, GeminiClient, VerdictOracle};
use crate::config::{validate_threshold, Config};
use crate::error::Result;
use crate::metrics::METRICS;
use crate::models::{AggregatedResult, ProviderResult, VerdictSource};
use std::sync::Arc;
use tracing::{debug, info};

pub struct VerdictResolver {
    filter: SimilarityFilter,
    normalizer: RatingNormalizer,
    fallback: AiFallbackClassifier,
    default_threshold: f32,
}

impl VerdictResolver {
    pub fn new(
        filter: SimilarityFilter,
        normalizer: RatingNormalizer,
        fallback: AiFallbackClassifier,
        default_threshold: f32,
    ) -> Result<Self> {
        validate_threshold(default_threshold)?;
        Ok(Self {
            filter,
            normalizer,
            fallback,
            default_threshold,
        })
    }

    /// Build the production pipeline: configured embedder, keyword
    /// normalizer and Gemini-backed fallback
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = build_embedder(&config.similarity)?;
        let oracle: Arc<dyn VerdictOracle> = Arc::new(GeminiClient::new(&config.ai)?);
        Self::with_oracle(config, embedder, oracle)
    }

    /// Build from config with caller-supplied collaborators
    pub fn with_oracle(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        oracle: Arc<dyn VerdictOracle>,
    ) -> Result<Self> {
        Self::new(
            SimilarityFilter::new(embedder),
            RatingNormalizer::new(&config.classification),
            AiFallbackClassifier::new(oracle, &config.ai),
            config.similarity.threshold,
        )
    }

    pub fn default_threshold(&self) -> f32 {
        self.default_threshold
    }

    /// Keep the candidates similar to `claim` and rate them, without voting.
    ///
    /// `threshold` overrides the configured similarity threshold for this call.
    pub async fn screen(
        &self,
        claim: &str,
        candidates: &[ProviderResult],
        threshold: Option<f32>,
    ) -> Result<Vec<ProviderResult>> {
        let threshold = threshold.unwrap_or(self.default_threshold);
        validate_threshold(threshold)?;

        let kept = self.filter.filter(claim, candidates, threshold).await?;
        Ok(self.normalizer.normalize_all(kept))
    }

    /// Resolve one claim against the provider candidates.
    ///
    /// `threshold` overrides the configured similarity threshold for this call.
    pub async fn resolve(
        &self,
        claim: &str,
        candidates: &[ProviderResult],
        threshold: Option<f32>,
    ) -> Result<AggregatedResult> {
        let rated = self.screen(claim, candidates, threshold).await?;
        let provisional = aggregate(&rated);

        debug!(
            verdict = %provisional.verdict,
            confidence = provisional.confidence,
            needs_fallback = provisional.needs_fallback,
            sources = rated.len(),
            "Provisional verdict"
        );

        let (verdict, confidence, explanation, verdict_source) = if provisional.needs_fallback {
            match self.fallback.classify_with_ai(claim, &rated).await {
                Ok(judgement) => (
                    judgement.verdict,
                    judgement.confidence,
                    compose(judgement.verdict, &rated, Some(&judgement.explanation)),
                    VerdictSource::Ai,
                ),
                Err(_) => (
                    provisional.verdict,
                    provisional.confidence,
                    compose(provisional.verdict, &rated, None),
                    VerdictSource::Majority,
                ),
            }
        } else {
            let ai_explanation = self
                .fallback
                .explain(claim, provisional.verdict, &rated)
                .await
                .ok();
            (
                provisional.verdict,
                provisional.confidence,
                compose(provisional.verdict, &rated, ai_explanation.as_deref()),
                VerdictSource::Majority,
            )
        };

        METRICS.record_verdict(verdict.as_str(), verdict_source.as_str());
        info!(
            verdict = %verdict,
            confidence,
            source = verdict_source.as_str(),
            "Claim resolved"
        );

        let votes = tally(&rated);
        Ok(AggregatedResult::new(
            claim.to_string(),
            verdict,
            confidence,
            explanation,
            rated,
            verdict_source,
            votes,
        ))
    }
}

