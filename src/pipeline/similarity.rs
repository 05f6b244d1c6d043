//! Similarity filter
//!
//! Drops provider candidates whose claim text is not semantically close to
//! the query. Kept candidates stay in provider order.

use super::embedder::{cosine_similarity, Embedder};
use crate::config::validate_threshold;
use crate::error::Result;
use crate::metrics::METRICS;
use crate::models::ProviderResult;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct SimilarityFilter {
    embedder: Arc<dyn Embedder>,
}

impl SimilarityFilter {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    /// Score every candidate against `query` and keep those at or above
    /// `threshold`.
    ///
    /// The input slice is left untouched; kept candidates are returned as new
    /// records carrying their score. An invalid threshold is rejected before
    /// anything is embedded. If the embedding model fails the filter keeps
    /// nothing, which the aggregator treats as empty evidence.
    pub async fn filter(
        &self,
        query: &str,
        candidates: &[ProviderResult],
        threshold: f32,
    ) -> Result<Vec<ProviderResult>> {
        validate_threshold(threshold)?;

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut texts = Vec::with_capacity(candidates.len() + 1);
        texts.push(query.to_string());
        texts.extend(candidates.iter().map(|c| c.claim_text.clone()));

        let embeddings = match self.embedder.embed(&texts).await {
            Ok(embeddings) if embeddings.len() == texts.len() => embeddings,
            Ok(embeddings) => {
                warn!(
                    model = self.embedder.model_id(),
                    "Embedding model returned {} vectors for {} texts; dropping all candidates",
                    embeddings.len(),
                    texts.len()
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!(
                    model = self.embedder.model_id(),
                    "Embedding failed, dropping all candidates: {}", e
                );
                return Ok(Vec::new());
            }
        };

        let (query_vector, candidate_vectors) = match embeddings.split_first() {
            Some(split) => split,
            None => return Ok(Vec::new()),
        };

        let kept: Vec<ProviderResult> = candidates
            .iter()
            .zip(candidate_vectors)
            .filter_map(|(candidate, vector)| {
                let score = cosine_similarity(query_vector, vector).clamp(0.0, 1.0);
                if score >= threshold {
                    Some(candidate.clone().scored(score))
                } else {
                    None
                }
            })
            .collect();

        let dropped = candidates.len() - kept.len();
        METRICS.record_similarity(kept.len(), dropped);
        debug!(
            "Similarity filter kept {} of {} candidates at threshold {}",
            kept.len(),
            candidates.len(),
            threshold
        );

        Ok(kept)
    }
}
