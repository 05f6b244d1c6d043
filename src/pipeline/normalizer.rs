//! Rating normalizer
//!
//! Maps free-text provider ratings ("Pants on Fire!", "Mostly True",
//! "Partly false") onto the three-way [`NormalizedRating`] scale by keyword
//! matching. Keywords match whole words after lowercasing and splitting on
//! anything that is not alphanumeric, so "incorrect" never matches "correct".
//! When a rating hits both vocabularies the false/misleading reading wins.

use crate::config::ClassificationConfig;
use crate::models::{NormalizedRating, ProviderResult};

/// Keyword-based rating normalizer
#[derive(Debug, Clone)]
pub struct RatingNormalizer {
    true_phrases: Vec<Vec<String>>,
    false_phrases: Vec<Vec<String>>,
}

impl RatingNormalizer {
    pub fn new(config: &ClassificationConfig) -> Self {
        Self {
            true_phrases: compile(&config.true_keywords),
            false_phrases: compile(&config.false_keywords),
        }
    }

    /// Normalize one raw rating. Total: absent or unrecognised input is `Unknown`.
    pub fn normalize(&self, raw_rating: Option<&str>) -> NormalizedRating {
        let tokens = match raw_rating {
            Some(raw) => tokenize(raw),
            None => return NormalizedRating::Unknown,
        };
        if tokens.is_empty() {
            return NormalizedRating::Unknown;
        }

        if self.false_phrases.iter().any(|p| contains_phrase(&tokens, p)) {
            NormalizedRating::FalseOrMisleading
        } else if self.true_phrases.iter().any(|p| contains_phrase(&tokens, p)) {
            NormalizedRating::True
        } else {
            NormalizedRating::Unknown
        }
    }

    /// Rate every source from its `raw_rating`
    pub fn normalize_all(&self, sources: Vec<ProviderResult>) -> Vec<ProviderResult> {
        sources
            .into_iter()
            .map(|source| {
                let rating = self.normalize(source.raw_rating.as_deref());
                source.rated(rating)
            })
            .collect()
    }
}

impl Default for RatingNormalizer {
    fn default() -> Self {
        Self::new(&ClassificationConfig::default())
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn compile(keywords: &[String]) -> Vec<Vec<String>> {
    keywords
        .iter()
        .map(|k| tokenize(k))
        .filter(|phrase| !phrase.is_empty())
        .collect()
}

fn contains_phrase(tokens: &[String], phrase: &[String]) -> bool {
    tokens.windows(phrase.len()).any(|window| window == phrase)
}
