//! Data models shared by the fetch layer, the verdict pipeline and the API

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fact-check provider a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceApi {
    #[serde(rename = "google_factcheck")]
    Google,
    #[serde(rename = "rapidapi_fact_checker")]
    RapidApi,
    #[serde(rename = "claimbuster")]
    ClaimBuster,
}

impl SourceApi {
    /// Fixed merge order for provider results
    pub const ALL: [SourceApi; 3] = [SourceApi::Google, SourceApi::RapidApi, SourceApi::ClaimBuster];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google_factcheck",
            Self::RapidApi => "rapidapi_fact_checker",
            Self::ClaimBuster => "claimbuster",
        }
    }

    /// Human-readable provider name used in explanations
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Google => "Google Fact Check",
            Self::RapidApi => "RapidAPI Fact Checker",
            Self::ClaimBuster => "ClaimBuster",
        }
    }
}

impl fmt::Display for SourceApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider rating mapped onto the common three-way scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NormalizedRating {
    True,
    FalseOrMisleading,
    Unknown,
}

impl NormalizedRating {
    /// Bucket order used when two buckets hold the same number of sources.
    /// Earlier wins.
    pub const PRECEDENCE: [NormalizedRating; 3] = [
        NormalizedRating::FalseOrMisleading,
        NormalizedRating::True,
        NormalizedRating::Unknown,
    ];

    /// Category wording used in explanations
    pub fn label(&self) -> &'static str {
        match self {
            Self::True => "true",
            Self::FalseOrMisleading => "false or misleading",
            Self::Unknown => "unverified",
        }
    }
}

/// Final three-way classification exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    True,
    Misleading,
    Unknown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::True => "true",
            Self::Misleading => "misleading",
            Self::Unknown => "unknown",
        }
    }
}

impl From<NormalizedRating> for Verdict {
    fn from(rating: NormalizedRating) -> Self {
        match rating {
            NormalizedRating::True => Verdict::True,
            NormalizedRating::FalseOrMisleading => Verdict::Misleading,
            NormalizedRating::Unknown => Verdict::Unknown,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path produced the final verdict and confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictSource {
    Majority,
    Ai,
}

impl VerdictSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Majority => "majority",
            Self::Ai => "ai",
        }
    }
}

/// One fact-check record from one provider
///
/// `similarity_score` and `normalized_rating` start unset and are filled in by
/// the similarity filter and the rating normalizer, in that order. Both setters
/// consume the record so a stage hands back a new value instead of touching a
/// record the caller still holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResult {
    pub claim_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimant: Option<String>,
    pub source_api: SourceApi,
    pub raw_rating: Option<String>,
    pub review_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    similarity_score: Option<f32>,
    normalized_rating: Option<NormalizedRating>,
}

impl ProviderResult {
    pub fn new(source_api: SourceApi, claim_text: impl Into<String>) -> Self {
        Self {
            claim_text: claim_text.into(),
            claimant: None,
            source_api,
            raw_rating: None,
            review_link: None,
            publisher: None,
            similarity_score: None,
            normalized_rating: None,
        }
    }

    pub fn with_claimant(mut self, claimant: impl Into<String>) -> Self {
        self.claimant = Some(claimant.into());
        self
    }

    pub fn with_raw_rating(mut self, rating: impl Into<String>) -> Self {
        self.raw_rating = Some(rating.into());
        self
    }

    pub fn with_review_link(mut self, link: impl Into<String>) -> Self {
        self.review_link = Some(link.into());
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    /// Attach the similarity score. Scores are clamped to [0, 1].
    pub fn scored(mut self, score: f32) -> Self {
        debug_assert!(self.similarity_score.is_none(), "similarity scored twice");
        self.similarity_score = Some(if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) });
        self
    }

    /// Attach the normalized rating
    pub fn rated(mut self, rating: NormalizedRating) -> Self {
        debug_assert!(self.normalized_rating.is_none(), "rating normalized twice");
        self.normalized_rating = Some(rating);
        self
    }

    pub fn similarity_score(&self) -> Option<f32> {
        self.similarity_score
    }

    pub fn normalized_rating(&self) -> Option<NormalizedRating> {
        self.normalized_rating
    }

    /// Rating used for bucketing. An unrated record counts as unknown.
    pub fn bucket(&self) -> NormalizedRating {
        self.normalized_rating.unwrap_or(NormalizedRating::Unknown)
    }

    /// Name to cite in explanations: the publisher when known, else the provider
    pub fn cited_name(&self) -> &str {
        self.publisher
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| self.source_api.display_name())
    }
}

/// Final answer for one claim
///
/// Built once by the resolver and never mutated afterwards; fields are exposed
/// through accessors only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResult {
    claim_text: String,
    verdict: Verdict,
    confidence: f32,
    explanation: String,
    sources: Vec<ProviderResult>,
    used_ai_fallback: bool,
    verdict_source: VerdictSource,
    votes: IndexMap<NormalizedRating, usize>,
    providers_checked: Vec<SourceApi>,
    checked_at: DateTime<Utc>,
}

impl AggregatedResult {
    pub(crate) fn new(
        claim_text: String,
        verdict: Verdict,
        confidence: f32,
        explanation: String,
        sources: Vec<ProviderResult>,
        verdict_source: VerdictSource,
        votes: IndexMap<NormalizedRating, usize>,
    ) -> Self {
        let mut providers_checked = Vec::new();
        for source in &sources {
            if !providers_checked.contains(&source.source_api) {
                providers_checked.push(source.source_api);
            }
        }

        Self {
            claim_text,
            verdict,
            confidence: confidence.clamp(0.0, 1.0),
            explanation,
            sources,
            used_ai_fallback: verdict_source == VerdictSource::Ai,
            verdict_source,
            votes,
            providers_checked,
            checked_at: Utc::now(),
        }
    }

    pub fn claim_text(&self) -> &str {
        &self.claim_text
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn sources(&self) -> &[ProviderResult] {
        &self.sources
    }

    pub fn used_ai_fallback(&self) -> bool {
        self.used_ai_fallback
    }

    pub fn verdict_source(&self) -> VerdictSource {
        self.verdict_source
    }

    pub fn votes(&self) -> &IndexMap<NormalizedRating, usize> {
        &self.votes
    }

    pub fn providers_checked(&self) -> &[SourceApi] {
        &self.providers_checked
    }

    pub fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }
}
