//! Embedding models used by the similarity filter

use crate::config::{SimilarityConfig, HASHED_TRIGRAM_MODEL};
use crate::error::{Error, Result};
use crate::metrics::METRICS;
use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

/// Embedding errors
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Text embedding model. Same model and text always give the same vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the model, including its version
    fn model_id(&self) -> &str;

    /// Embed a batch of texts, one vector per input in input order
    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Cosine similarity of two vectors; 0.0 when either is all zeros or the
/// widths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Local feature-hashing model: lowercased word unigrams plus padded
/// character trigrams, hashed with FNV-1a into a fixed-width signed vector
/// and L2-normalized.
pub struct HashedTrigramEmbedder {
    dimensions: usize,
}

impl HashedTrigramEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();

        for word in lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            self.add_feature(&mut vector, word.as_bytes(), 1.0);

            let padded: Vec<char> = std::iter::once(' ')
                .chain(word.chars())
                .chain(std::iter::once(' '))
                .collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.add_feature(&mut vector, trigram.as_bytes(), 0.5);
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }

    fn add_feature(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let index = (hash % self.dimensions as u64) as usize;
        let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        vector[index] += sign * weight;
    }
}

impl Default for HashedTrigramEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashedTrigramEmbedder {
    fn model_id(&self) -> &str {
        HASHED_TRIGRAM_MODEL
    }

    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// OpenAI-compatible `/embeddings` client
pub struct HttpEmbedder {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpEmbedder {
    pub fn new(config: &SimilarityConfig) -> Result<Self> {
        let base_url = config
            .embedding_url
            .clone()
            .ok_or_else(|| Error::configuration("similarity.embedding_url is required"))?;

        let http = Client::builder()
            .timeout(config.embedding_timeout())
            .build()
            .map_err(|e| Error::Internal(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.embedding_model.clone(),
            api_key: config.embedding_api_key.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        debug!("Requesting {} embeddings from {}", texts.len(), self.model);

        let mut req = self.http.post(&url).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key.expose_secret());
        }

        let response = req
            .send()
            .await
            .map_err(|e| EmbeddingError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::UpstreamError(format!("Status {}: {}", status, body)));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Bounded TTL cache in front of another embedder
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Cache<String, Arc<Vec<f32>>>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, config: &SimilarityConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_max_entries)
            .time_to_live(config.cache_ttl())
            .build();
        Self { inner, cache }
    }

    fn cache_key(&self, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.inner.model_id().as_bytes());
        hasher.update(b"|");
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
        let keys: Vec<String> = texts.iter().map(|t| self.cache_key(t)).collect();
        let mut slots: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut missing = Vec::new();

        for (i, key) in keys.iter().enumerate() {
            match self.cache.get(key).await {
                Some(hit) => {
                    METRICS.record_embedding_cache(true);
                    slots.push(Some(hit.as_ref().clone()));
                }
                None => {
                    METRICS.record_embedding_cache(false);
                    slots.push(None);
                    missing.push(i);
                }
            }
        }

        if !missing.is_empty() {
            let batch: Vec<String> = missing.iter().map(|i| texts[*i].clone()).collect();
            let fresh = self.inner.embed(&batch).await?;
            if fresh.len() != batch.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    fresh.len()
                )));
            }
            for (i, vector) in missing.into_iter().zip(fresh) {
                self.cache.insert(keys[i].clone(), Arc::new(vector.clone())).await;
                slots[i] = Some(vector);
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

/// Build the configured embedding model behind the cache
pub fn build_embedder(config: &SimilarityConfig) -> Result<Arc<dyn Embedder>> {
    let inner: Arc<dyn Embedder> = if config.uses_local_model() {
        Arc::new(HashedTrigramEmbedder::new(config.dimensions))
    } else {
        Arc::new(HttpEmbedder::new(config)?)
    };
    Ok(Arc::new(CachedEmbedder::new(inner, config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[0.8, 0.6]) - 0.8).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_hashed_embedding_is_deterministic() {
        let embedder = HashedTrigramEmbedder::default();
        let a = embedder.embed_one("Vaccines cause autism");
        let b = embedder.embed_one("Vaccines cause autism");
        assert_eq!(a, b);
        assert_eq!(a.len(), 256);
    }

    #[test]
    fn test_hashed_embedding_similarity_ranks_paraphrase_higher() {
        let embedder = HashedTrigramEmbedder::default();
        let query = embedder.embed_one("The Eiffel Tower is in Paris");
        let close = embedder.embed_one("the eiffel tower is located in paris");
        let far = embedder.embed_one("Drinking bleach cures covid");

        let close_score = cosine_similarity(&query, &close);
        let far_score = cosine_similarity(&query, &far);
        assert!(close_score > 0.7, "close score {}", close_score);
        assert!(close_score > far_score);
    }

    #[test]
    fn test_empty_text_embeds_to_zero_vector() {
        let embedder = HashedTrigramEmbedder::new(16);
        let vector = embedder.embed_one("   ");
        assert!(vector.iter().all(|v| *v == 0.0));
    }

    struct CountingEmbedder {
        calls: AtomicUsize,
        inner: HashedTrigramEmbedder,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn model_id(&self) -> &str {
            "counting"
        }

        async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(texts.len(), Ordering::SeqCst);
            self.inner.embed(texts).await
        }
    }

    #[test]
    fn test_cached_embedder_reuses_vectors() {
        let counting = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
            inner: HashedTrigramEmbedder::new(32),
        });
        let cached = CachedEmbedder::new(counting.clone(), &SimilarityConfig::default());

        let first = tokio_test::block_on(cached.embed(&["a claim".to_string(), "another".to_string()])).unwrap();
        let second = tokio_test::block_on(cached.embed(&["another".to_string(), "third".to_string()])).unwrap();

        assert_eq!(counting.calls.load(Ordering::SeqCst), 3);
        assert_eq!(first[1], second[0]);
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn test_http_embedder_requires_url() {
        let config = SimilarityConfig {
            embedding_model: "text-embedding-3-small".to_string(),
            ..Default::default()
        };
        assert!(matches!(HttpEmbedder::new(&config), Err(Error::Configuration(_))));
    }
}
