//! Error types for the verdict pipeline
//!
//! Only [`Error::Configuration`] and [`Error::Validation`] are ever surfaced to
//! a caller as a failed request. Provider and AI failures are recovered inside
//! the pipeline and show up as a lower-confidence result instead.

use crate::ai::FallbackError;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid threshold, missing model identifier or unreadable config
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request payload rejected before the pipeline ran
    #[error("Validation error: {0}")]
    Validation(String),

    /// The generative-AI collaborator could not produce a judgement
    #[error("AI fallback unavailable: {0}")]
    FallbackUnavailable(#[from] FallbackError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Self::Configuration(e.to_string())
    }
}
