//! FactScreen: fact-check verdict aggregation
//!
//! A claim is searched across fact-check providers, the matches are filtered
//! by semantic similarity, their ratings normalized and majority-voted, and a
//! generative model is consulted when the vote is weak.

pub mod ai;
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod providers;

pub use config::Config;
pub use error::{Error, Result};
pub use models::{AggregatedResult, NormalizedRating, ProviderResult, SourceApi, Verdict, VerdictSource};
pub use pipeline::VerdictResolver;
