//! Fact-check provider fetch layer
//!
//! Each provider is a [`ClaimSource`]. [`ProviderHub`] queries every configured
//! source concurrently, retries transient failures and merges the results in
//! fixed provider order. Provider failures never reach the caller; a failing
//! provider simply contributes nothing.

pub mod claimbuster;
pub mod extract;
pub mod google;
mod lenient;
pub mod rapidapi;
pub mod retry;

pub use claimbuster::ClaimBusterSource;
pub use extract::extract_key_claim;
pub use google::GoogleFactCheckSource;
pub use rapidapi::RapidApiSource;
pub use retry::RetryPolicy;

use crate::config::ProvidersConfig;
use crate::error::{Error, Result};
use crate::metrics::METRICS;
use crate::models::{ProviderResult, SourceApi};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Timeout or connection failure, worth retrying
    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Unparseable payload: {0}")]
    Parse(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::Status(_) => "http_error",
            Self::Parse(_) => "parse_error",
            Self::Request(_) => "request_error",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            Self::Transient(e.to_string())
        } else if e.is_decode() {
            Self::Parse(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// One provider search.
///
/// `page_url` is a hint only Google uses. `language_code` and `page_size`
/// override the configured provider defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchQuery<'a> {
    pub text: &'a str,
    pub page_url: Option<&'a str>,
    pub language_code: Option<&'a str>,
    pub page_size: Option<usize>,
}

impl<'a> SearchQuery<'a> {
    pub fn text(text: &'a str) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }

    /// Search for reviews of a web page; the url doubles as the query text
    pub fn page(url: &'a str) -> Self {
        Self {
            text: url,
            page_url: Some(url),
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language_code: &'a str) -> Self {
        self.language_code = Some(language_code);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

/// One fact-check provider
#[async_trait]
pub trait ClaimSource: Send + Sync {
    fn source_api(&self) -> SourceApi;

    /// Whether credentials are present. Unconfigured sources are skipped.
    fn is_configured(&self) -> bool;

    /// Search the provider. Every returned record is tagged with
    /// [`ClaimSource::source_api`].
    async fn search(
        &self,
        query: &SearchQuery<'_>,
    ) -> std::result::Result<Vec<ProviderResult>, FetchError>;
}

/// Shared HTTP client for provider requests
pub fn build_http_client(config: &ProvidersConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| Error::Internal(format!("HTTP client: {}", e)))
}

/// Concurrent fan-out over all providers
pub struct ProviderHub {
    sources: Vec<Arc<dyn ClaimSource>>,
    retry: RetryPolicy,
    max_per_provider: usize,
}

impl ProviderHub {
    pub fn new(sources: Vec<Arc<dyn ClaimSource>>, retry: RetryPolicy, max_per_provider: usize) -> Self {
        Self {
            sources,
            retry,
            max_per_provider,
        }
    }

    /// Google, RapidAPI and ClaimBuster sources sharing one HTTP client
    pub fn from_config(config: &ProvidersConfig) -> Result<Self> {
        let http = build_http_client(config)?;
        let sources: Vec<Arc<dyn ClaimSource>> = vec![
            Arc::new(GoogleFactCheckSource::new(http.clone(), config.google.clone())),
            Arc::new(RapidApiSource::new(http.clone(), config.rapidapi.clone())),
            Arc::new(ClaimBusterSource::new(http, config.claimbuster.clone())),
        ];
        Ok(Self::new(
            sources,
            RetryPolicy::from_config(config),
            config.max_results_per_provider,
        ))
    }

    pub fn configured_sources(&self) -> Vec<SourceApi> {
        self.sources
            .iter()
            .filter(|s| s.is_configured())
            .map(|s| s.source_api())
            .collect()
    }

    /// Query every configured provider and merge the results.
    ///
    /// Output holds at most `max_per_provider` records per provider (or the
    /// query's `page_size` when set), grouped in [`SourceApi::ALL`] order and
    /// in provider order within a group.
    pub async fn search_all(&self, query: &SearchQuery<'_>) -> Vec<ProviderResult> {
        let active: Vec<&Arc<dyn ClaimSource>> = self
            .sources
            .iter()
            .filter(|source| {
                let configured = source.is_configured();
                if !configured {
                    debug!(provider = %source.source_api(), "Skipping provider without API key");
                    METRICS.record_provider_fetch(source.source_api().as_str(), "skipped");
                }
                configured
            })
            .collect();

        let fetches = active.iter().map(|source| self.fetch_one(source.as_ref(), query));
        let mut per_provider = join_all(fetches).await;

        let cap = query.page_size.unwrap_or(self.max_per_provider);
        let mut merged = Vec::new();
        for api in SourceApi::ALL {
            for (source_api, results) in per_provider.iter_mut() {
                if *source_api == api {
                    merged.extend(results.drain(..).take(cap));
                }
            }
        }

        info!(
            providers = active.len(),
            results = merged.len(),
            "Provider search complete"
        );
        merged
    }

    async fn fetch_one(
        &self,
        source: &dyn ClaimSource,
        query: &SearchQuery<'_>,
    ) -> (SourceApi, Vec<ProviderResult>) {
        let api = source.source_api();
        let outcome = crate::time_operation!(
            METRICS.provider_fetch_duration,
            api.as_str(),
            self.retry
                .run(api.as_str(), move || source.search(query))
                .await
        );

        match outcome {
            Ok(results) => {
                METRICS.record_provider_fetch(api.as_str(), "success");
                debug!(provider = %api, count = results.len(), "Provider returned results");
                // Enforce tagging regardless of what the source did
                let results = results.into_iter().filter(|r| r.source_api == api).collect();
                (api, results)
            }
            Err(e) => {
                METRICS.record_provider_fetch(api.as_str(), e.label());
                warn!(provider = %api, "Provider fetch failed: {}", e);
                (api, Vec::new())
            }
        }
    }
}
