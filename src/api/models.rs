//! Request and response bodies for the HTTP API

use crate::models::{AggregatedResult, NormalizedRating, ProviderResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// POST /api/v1/verify
///
/// Exactly one of `text` or `url` must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    /// Overrides the configured similarity threshold for this request
    #[serde(default)]
    pub similarity_threshold: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub request_id: Uuid,
    pub result: AggregatedResult,
}

/// Largest `page_size` a claim search accepts
pub const MAX_PAGE_SIZE: usize = 50;

fn default_language_code() -> String {
    "en".to_string()
}

fn default_page_size() -> usize {
    10
}

/// POST /api/v1/claims/search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimSearchRequest {
    pub query: String,

    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// Records kept per provider, 1 to [`MAX_PAGE_SIZE`]
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimsListResponse {
    pub claims: Vec<ProviderResult>,
    pub total_count: usize,
    pub query: String,
}

/// POST /api/v1/claims/filtered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredClaimsRequest {
    #[serde(flatten)]
    pub search: ClaimSearchRequest,

    /// Overrides the configured similarity threshold for this request
    #[serde(default)]
    pub similarity_threshold: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredClaimsResponse {
    /// Scored and rated records that passed the similarity filter
    pub claims: Vec<ProviderResult>,
    pub total_count: usize,
    pub query: String,
    /// Threshold actually applied
    pub similarity_threshold: f32,
    pub classification_labels: Vec<NormalizedRating>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

pub mod error_codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CONFIGURATION_ERROR: &str = "CONFIGURATION_ERROR";
    pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}
