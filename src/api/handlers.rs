//! HTTP handlers

use super::models::{
    error_codes, ApiError, ClaimSearchRequest, ClaimsListResponse, FilteredClaimsRequest,
    FilteredClaimsResponse, HealthResponse, VerifyRequest, VerifyResponse, MAX_PAGE_SIZE,
};
use crate::config::validate_threshold;
use crate::error::Error;
use crate::metrics::METRICS;
use crate::models::{AggregatedResult, NormalizedRating, ProviderResult, SourceApi};
use crate::pipeline::VerdictResolver;
use crate::providers::{extract_key_claim, ProviderHub, SearchQuery};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use reqwest::Url;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

/// Shared, read-only application state
#[derive(Clone)]
pub struct AppState {
    pub providers: Arc<ProviderHub>,
    pub resolver: Arc<VerdictResolver>,
}

impl AppState {
    pub fn new(providers: ProviderHub, resolver: VerdictResolver) -> Self {
        Self {
            providers: Arc::new(providers),
            resolver: Arc::new(resolver),
        }
    }
}

fn validation_error(message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::new(error_codes::VALIDATION_ERROR, message)),
    )
}

/// Malformed bodies are validation errors; oversized ones keep their 413
fn rejection(e: JsonRejection) -> (StatusCode, Json<ApiError>) {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(ApiError::new(error_codes::PAYLOAD_TOO_LARGE, e.body_text())),
        );
    }
    validation_error(e.body_text())
}

impl From<Error> for (StatusCode, Json<ApiError>) {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(message) => validation_error(message),
            Error::Configuration(message) => (
                StatusCode::BAD_REQUEST,
                Json(ApiError::new(error_codes::CONFIGURATION_ERROR, message)),
            ),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new(error_codes::INTERNAL_ERROR, other.to_string())),
            ),
        }
    }
}

/// What the client asked us to check
#[derive(Debug, PartialEq)]
enum ClaimInput {
    Text(String),
    Url(String),
}

impl ClaimInput {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Url(_) => "url",
        }
    }
}

fn parse_input(request: &VerifyRequest) -> Result<ClaimInput, Error> {
    let text = request.text.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let url = request.url.as_deref().map(str::trim).filter(|u| !u.is_empty());

    match (text, url) {
        (Some(_), Some(_)) => Err(Error::validation("Provide either text or url, not both")),
        (None, None) => Err(Error::validation("Either text or url is required")),
        (Some(text), None) => {
            let claim = extract_key_claim(text);
            if claim.is_empty() {
                return Err(Error::validation("Text does not contain a claim"));
            }
            Ok(ClaimInput::Text(claim))
        }
        (None, Some(url)) => {
            let parsed = Url::parse(url)
                .map_err(|e| Error::validation(format!("Invalid url: {}", e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::validation("Url must use http or https"));
            }
            Ok(ClaimInput::Url(url.to_string()))
        }
    }
}

/// Verify a claim
///
/// POST /api/v1/verify
pub async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<VerifyResponse> {
    let request_id = Uuid::new_v4();
    let start = Instant::now();

    let outcome = run_verify(&state, payload, request_id).await;

    METRICS.record_verify(outcome.is_ok());
    match &outcome {
        Ok((kind, _)) => {
            METRICS
                .verify_request_duration
                .with_label_values(&[*kind])
                .observe(start.elapsed().as_secs_f64());
        }
        Err((status, body)) => {
            if status.is_server_error() {
                error!(%request_id, "Verify failed: {}", body.message);
            } else {
                warn!(%request_id, code = %body.code, "Verify rejected: {}", body.message);
            }
        }
    }

    outcome.map(|(_, result)| Json(VerifyResponse { request_id, result }))
}

async fn run_verify(
    state: &AppState,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
    request_id: Uuid,
) -> Result<(&'static str, AggregatedResult), (StatusCode, Json<ApiError>)> {
    let Json(request) = payload.map_err(rejection)?;

    let input = parse_input(&request)?;
    if let Some(threshold) = request.similarity_threshold {
        validate_threshold(threshold)?;
    }

    info!(%request_id, input = input.kind(), "Verify request");

    let (query, page_url) = match &input {
        ClaimInput::Text(claim) => (SearchQuery::text(claim), None),
        ClaimInput::Url(url) => (SearchQuery::page(url), Some(url.as_str())),
    };
    let candidates = state.providers.search_all(&query).await;

    let claim = match page_url {
        Some(url) => {
            let claim = page_claim(url, &candidates);
            debug!(%request_id, claim, "Claim derived from page reviews");
            claim
        }
        None => query.text,
    };

    let result = state
        .resolver
        .resolve(claim, &candidates, request.similarity_threshold)
        .await?;

    Ok((input.kind(), result))
}

/// Claim text to resolve a page against: the claim Google's reviews of that
/// page are about, or the url itself when Google knows no review of it.
fn page_claim<'a>(url: &'a str, candidates: &'a [ProviderResult]) -> &'a str {
    candidates
        .iter()
        .find(|c| c.source_api == SourceApi::Google && !c.claim_text.trim().is_empty())
        .map(|c| c.claim_text.as_str())
        .unwrap_or(url)
}

fn validate_search(request: &ClaimSearchRequest) -> Result<(), Error> {
    if request.query.trim().is_empty() {
        return Err(Error::validation("query must not be empty"));
    }
    if request.language_code.trim().is_empty() {
        return Err(Error::validation("language_code must not be empty"));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&request.page_size) {
        return Err(Error::validation(format!(
            "page_size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok(())
}

fn search_query(request: &ClaimSearchRequest) -> SearchQuery<'_> {
    SearchQuery::text(request.query.trim())
        .with_language(request.language_code.trim())
        .with_page_size(request.page_size)
}

/// Search every provider without filtering or rating
///
/// POST /api/v1/claims/search
pub async fn search_claims(
    State(state): State<AppState>,
    payload: Result<Json<ClaimSearchRequest>, JsonRejection>,
) -> ApiResult<ClaimsListResponse> {
    let Json(request) = payload.map_err(rejection)?;
    validate_search(&request)?;

    let claims = state.providers.search_all(&search_query(&request)).await;
    info!(results = claims.len(), "Claim search");

    Ok(Json(ClaimsListResponse {
        total_count: claims.len(),
        claims,
        query: request.query,
    }))
}

/// Search every provider, keep records similar to the query and rate them
///
/// POST /api/v1/claims/filtered
pub async fn filtered_claims(
    State(state): State<AppState>,
    payload: Result<Json<FilteredClaimsRequest>, JsonRejection>,
) -> ApiResult<FilteredClaimsResponse> {
    let Json(request) = payload.map_err(rejection)?;
    validate_search(&request.search)?;
    let threshold = request
        .similarity_threshold
        .unwrap_or(state.resolver.default_threshold());
    validate_threshold(threshold)?;

    let query = search_query(&request.search);
    let candidates = state.providers.search_all(&query).await;
    let claims = state
        .resolver
        .screen(query.text, &candidates, Some(threshold))
        .await?;
    info!(
        candidates = candidates.len(),
        kept = claims.len(),
        threshold,
        "Filtered claim search"
    );

    Ok(Json(FilteredClaimsResponse {
        total_count: claims.len(),
        claims,
        query: request.search.query.clone(),
        similarity_threshold: threshold,
        classification_labels: NormalizedRating::PRECEDENCE.to_vec(),
    }))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.export_prometheus(),
    )
}
