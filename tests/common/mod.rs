//! Shared test doubles

#![allow(dead_code)]

use async_trait::async_trait;
use factscreen::ai::{AiFallbackClassifier, AiJudgement, FallbackError, VerdictOracle};
use factscreen::config::AiConfig;
use factscreen::models::{ProviderResult, SourceApi, Verdict};
use factscreen::pipeline::embedder::{Embedder, EmbeddingError};
use factscreen::pipeline::{RatingNormalizer, SimilarityFilter, VerdictResolver};
use factscreen::providers::{ClaimSource, FetchError, SearchQuery};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Embeds the first text (the query) as [1, 0] and every other text so that
/// its cosine against the query equals the scripted score. Unscripted texts
/// score 0.
pub struct ScriptedEmbedder {
    scores: HashMap<String, f32>,
}

impl ScriptedEmbedder {
    pub fn new(scores: &[(&str, f32)]) -> Self {
        Self {
            scores: scores.iter().map(|(t, s)| (t.to_string(), *s)).collect(),
        }
    }
}

#[async_trait]
impl Embedder for ScriptedEmbedder {
    fn model_id(&self) -> &str {
        "scripted-v1"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                if i == 0 {
                    return vec![1.0, 0.0];
                }
                let score = self.scores.get(text).copied().unwrap_or(0.0);
                vec![score, (1.0 - score * score).max(0.0).sqrt()]
            })
            .collect())
    }
}

/// Oracle with a canned classification and call counters
pub struct StubOracle {
    pub classify_answer: Result<AiJudgement, FallbackError>,
    pub explain_answer: Result<String, FallbackError>,
    pub delay: Duration,
    pub classify_calls: AtomicUsize,
    pub explain_calls: AtomicUsize,
    pub last_evidence: Mutex<Vec<ProviderResult>>,
}

impl StubOracle {
    pub fn answering(verdict: Verdict, confidence: f32, explanation: &str) -> Self {
        Self::with(Ok(AiJudgement {
            verdict,
            confidence,
            explanation: explanation.to_string(),
        }))
    }

    pub fn failing(error: FallbackError) -> Self {
        Self {
            explain_answer: Err(error.clone()),
            ..Self::with(Err(error))
        }
    }

    pub fn with(classify_answer: Result<AiJudgement, FallbackError>) -> Self {
        Self {
            classify_answer,
            explain_answer: Ok("Providers agree on this rating.".to_string()),
            delay: Duration::ZERO,
            classify_calls: AtomicUsize::new(0),
            explain_calls: AtomicUsize::new(0),
            last_evidence: Mutex::new(Vec::new()),
        }
    }

    pub fn classify_count(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    pub fn explain_count(&self) -> usize {
        self.explain_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerdictOracle for StubOracle {
    fn model(&self) -> &str {
        "stub"
    }

    async fn classify(
        &self,
        _claim: &str,
        evidence: &[ProviderResult],
    ) -> Result<AiJudgement, FallbackError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_evidence.lock().unwrap() = evidence.to_vec();
        tokio::time::sleep(self.delay).await;
        self.classify_answer.clone()
    }

    async fn explain(
        &self,
        _claim: &str,
        _verdict: Verdict,
        _evidence: &[ProviderResult],
    ) -> Result<String, FallbackError> {
        self.explain_calls.fetch_add(1, Ordering::SeqCst);
        self.explain_answer.clone()
    }
}

pub fn ai_config() -> AiConfig {
    AiConfig {
        timeout_ms: 100,
        ..AiConfig::default()
    }
}

pub fn resolver(embedder: impl Embedder + 'static, oracle: Arc<StubOracle>) -> VerdictResolver {
    VerdictResolver::new(
        SimilarityFilter::new(Arc::new(embedder)),
        RatingNormalizer::default(),
        AiFallbackClassifier::new(oracle, &ai_config()),
        0.75,
    )
    .unwrap()
}

pub fn candidate(api: SourceApi, text: &str, rating: &str, publisher: &str) -> ProviderResult {
    ProviderResult::new(api, text)
        .with_raw_rating(rating)
        .with_publisher(publisher)
}

/// What a [`StubSource`] was last asked for
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeenQuery {
    pub text: String,
    pub page_url: Option<String>,
    pub language_code: Option<String>,
    pub page_size: Option<usize>,
}

/// Claim source returning fixed records
pub struct StubSource {
    pub api: SourceApi,
    pub results: Vec<ProviderResult>,
    pub calls: AtomicUsize,
    pub last_query: Mutex<Option<SeenQuery>>,
}

impl StubSource {
    pub fn new(api: SourceApi, results: Vec<ProviderResult>) -> Self {
        Self {
            api,
            results,
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn last_query(&self) -> Option<SeenQuery> {
        self.last_query.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClaimSource for StubSource {
    fn source_api(&self) -> SourceApi {
        self.api
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn search(&self, query: &SearchQuery<'_>) -> Result<Vec<ProviderResult>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(SeenQuery {
            text: query.text.to_string(),
            page_url: query.page_url.map(String::from),
            language_code: query.language_code.map(String::from),
            page_size: query.page_size,
        });
        Ok(self.results.clone())
    }
}
