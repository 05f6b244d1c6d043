//! Verdict pipeline: similarity filter, rating normalizer, majority
//! aggregator, explanation composer and the resolver that drives them

pub mod aggregator;
pub mod embedder;
pub mod explanation;
pub mod normalizer;
pub mod resolver;
pub mod similarity;

pub use aggregator::{aggregate, tally, Provisional};
pub use embedder::{build_embedder, CachedEmbedder, Embedder, HashedTrigramEmbedder, HttpEmbedder};
pub use explanation::compose;
pub use normalizer::RatingNormalizer;
pub use resolver::VerdictResolver;
pub use similarity::SimilarityFilter;
