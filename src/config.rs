//! Service configuration
//!
//! Layering, lowest precedence first:
//! 1. built-in defaults (the `default_*` functions below)
//! 2. `config/default.toml`, then `config/local.toml` (both optional)
//! 3. `FACTSCREEN__<SECTION>__<KEY>` environment variables
//! 4. well-known secret variables such as `GEMINI_API_KEY`
//!
//! The loaded value is validated once at startup and shared read-only.

use crate::error::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

/// Identifier of the built-in local embedding model
pub const HASHED_TRIGRAM_MODEL: &str = "hashed-trigram-v1";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_max_body_bytes() -> usize { 64 * 1024 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Similarity filter and embedding model settings
#[derive(Debug, Clone, Deserialize)]
pub struct SimilarityConfig {
    /// Default minimum similarity for a candidate to count as a match
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Embedding model identifier. `hashed-trigram-v1` runs locally; any other
    /// value is sent to `embedding_url`.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Base URL of an OpenAI-compatible embeddings API
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// API key for the embeddings API (also read from `EMBEDDING_API_KEY`)
    #[serde(default)]
    pub embedding_api_key: Option<SecretString>,

    /// Vector width of the local model
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_embedding_timeout_ms")]
    pub embedding_timeout_ms: u64,

    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: u64,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_threshold() -> f32 { 0.75 }
fn default_embedding_model() -> String { HASHED_TRIGRAM_MODEL.to_string() }
fn default_dimensions() -> usize { 256 }
fn default_embedding_timeout_ms() -> u64 { 5000 }
fn default_cache_max_entries() -> u64 { 10_000 }
fn default_cache_ttl_secs() -> u64 { 3600 }

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            embedding_model: default_embedding_model(),
            embedding_url: None,
            embedding_api_key: None,
            dimensions: default_dimensions(),
            embedding_timeout_ms: default_embedding_timeout_ms(),
            cache_max_entries: default_cache_max_entries(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl SimilarityConfig {
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_millis(self.embedding_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn uses_local_model(&self) -> bool {
        self.embedding_model == HASHED_TRIGRAM_MODEL
    }
}

/// Keyword vocabulary for the rating normalizer
#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationConfig {
    #[serde(default = "default_true_keywords")]
    pub true_keywords: Vec<String>,
    #[serde(default = "default_false_keywords")]
    pub false_keywords: Vec<String>,
}

fn default_true_keywords() -> Vec<String> {
    [
        "true",
        "mostly true",
        "correct",
        "accurate",
        "supported",
        "verified",
        "substantiated",
        "well-supported",
        "legit",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_false_keywords() -> Vec<String> {
    [
        "false",
        "mostly false",
        "partly false",
        "untrue",
        "not true",
        "partly true",
        "half true",
        "not accurate",
        "not correct",
        "incorrect",
        "inaccurate",
        "fake",
        "hoax",
        "pants on fire",
        "misleading",
        "misrepresented",
        "distorted",
        "unsupported",
        "not supported",
        "no evidence",
        "debunked",
        "fabricated",
        "scam",
        "wrong",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            true_keywords: default_true_keywords(),
            false_keywords: default_false_keywords(),
        }
    }
}

/// Generative-AI fallback settings
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_enabled")]
    pub enabled: bool,

    #[serde(default = "default_ai_model")]
    pub model: String,

    /// Base URL of the Gemini REST API
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,

    /// API key (also read from `GEMINI_API_KEY`)
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Upper bound for a single classify or explain call
    #[serde(default = "default_ai_timeout_ms")]
    pub timeout_ms: u64,

    /// Sources included in the evidence summary sent to the model
    #[serde(default = "default_max_evidence")]
    pub max_evidence_sources: usize,

    #[serde(default = "default_breaker_failures")]
    pub circuit_breaker_failures: usize,

    #[serde(default = "default_breaker_reset")]
    pub circuit_breaker_reset_secs: u64,
}

fn default_ai_enabled() -> bool { true }
fn default_ai_model() -> String { "gemini-2.5-flash".to_string() }
fn default_ai_endpoint() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_ai_timeout_ms() -> u64 { 8000 }
fn default_max_evidence() -> usize { 10 }
fn default_breaker_failures() -> usize { 5 }
fn default_breaker_reset() -> u64 { 30 }

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: default_ai_enabled(),
            model: default_ai_model(),
            endpoint: default_ai_endpoint(),
            api_key: None,
            timeout_ms: default_ai_timeout_ms(),
            max_evidence_sources: default_max_evidence(),
            circuit_breaker_failures: default_breaker_failures(),
            circuit_breaker_reset_secs: default_breaker_reset(),
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn breaker_reset_timeout(&self) -> Duration {
        Duration::from_secs(self.circuit_breaker_reset_secs)
    }
}

/// Fact-check provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_results")]
    pub max_results_per_provider: usize,

    /// Attempts per provider request on transient transport errors
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_retry_backoff_max_ms")]
    pub retry_backoff_max_ms: u64,

    #[serde(default)]
    pub google: GoogleConfig,

    #[serde(default)]
    pub rapidapi: RapidApiConfig,

    #[serde(default)]
    pub claimbuster: ClaimBusterConfig,
}

fn default_request_timeout_ms() -> u64 { 15_000 }
fn default_max_results() -> usize { 5 }
fn default_retry_attempts() -> usize { 2 }
fn default_retry_backoff_ms() -> u64 { 500 }
fn default_retry_backoff_max_ms() -> u64 { 2000 }

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            max_results_per_provider: default_max_results(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            retry_backoff_max_ms: default_retry_backoff_max_ms(),
            google: GoogleConfig::default(),
            rapidapi: RapidApiConfig::default(),
            claimbuster: ClaimBusterConfig::default(),
        }
    }
}

impl ProvidersConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn retry_backoff_max(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_max_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    #[serde(default = "default_google_url")]
    pub url: String,
    #[serde(default = "default_google_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default = "default_language")]
    pub language_code: String,
    #[serde(default = "default_google_page_size")]
    pub page_size: u32,
}

fn default_google_url() -> String { "https://factchecktools.googleapis.com".to_string() }
fn default_google_endpoint() -> String { "v1alpha1/claims:search".to_string() }
fn default_language() -> String { "en".to_string() }
fn default_google_page_size() -> u32 { 10 }

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            url: default_google_url(),
            endpoint: default_google_endpoint(),
            api_key: None,
            language_code: default_language(),
            page_size: default_google_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RapidApiConfig {
    #[serde(default = "default_rapid_url")]
    pub url: String,
    #[serde(default = "default_rapid_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_rapid_host")]
    pub host: String,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default = "default_rapid_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_rapid_url() -> String { "https://fact-checker.p.rapidapi.com".to_string() }
fn default_rapid_endpoint() -> String { "search".to_string() }
fn default_rapid_host() -> String { "fact-checker.p.rapidapi.com".to_string() }
fn default_rapid_limit() -> u32 { 20 }

impl Default for RapidApiConfig {
    fn default() -> Self {
        Self {
            url: default_rapid_url(),
            endpoint: default_rapid_endpoint(),
            host: default_rapid_host(),
            api_key: None,
            limit: default_rapid_limit(),
            offset: 0,
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimBusterConfig {
    #[serde(default = "default_claimbuster_url")]
    pub url: String,
    #[serde(default = "default_claimbuster_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

fn default_claimbuster_url() -> String { "https://idir.uta.edu/claimbuster/api/v2".to_string() }
fn default_claimbuster_endpoint() -> String { "query/fact_matcher".to_string() }

impl Default for ClaimBusterConfig {
    fn default() -> Self {
        Self {
            url: default_claimbuster_url(),
            endpoint: default_claimbuster_endpoint(),
            api_key: None,
        }
    }
}

impl Config {
    /// Load `.env`, config files and environment overrides, then validate
    pub fn load() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(Error::configuration(format!("Failed to read .env: {}", e)));
            }
        }

        let config = Self::load_from(&["config/default", "config/local"])?.with_env_secrets();
        config.validate()?;
        Ok(config)
    }

    /// Load from optional config files plus `FACTSCREEN__*` variables
    pub fn load_from(paths: &[&str]) -> Result<Self> {
        let mut builder = config::Config::builder();
        for path in paths {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("FACTSCREEN")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Parse a TOML document on top of the built-in defaults
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Fill in API keys from their conventional environment variables
    pub fn with_env_secrets(mut self) -> Self {
        if let Some(key) = env_secret("GOOGLE_API_KEY") {
            self.providers.google.api_key = Some(key);
        }
        if let Some(key) = env_secret("FACT_CHECKER_API_KEY") {
            self.providers.rapidapi.api_key = Some(key);
        }
        if let Some(key) = env_secret("CLAIM_BUSTER_API_KEY") {
            self.providers.claimbuster.api_key = Some(key);
        }
        if let Some(key) = env_secret("GEMINI_API_KEY") {
            self.ai.api_key = Some(key);
        }
        if let Some(key) = env_secret("EMBEDDING_API_KEY") {
            self.similarity.embedding_api_key = Some(key);
        }
        if let Ok(val) = std::env::var("SIMILARITY_THRESHOLD") {
            if let Ok(threshold) = val.parse() {
                self.similarity.threshold = threshold;
            }
        }
        if let Ok(val) = std::env::var("GEMINI_MODEL") {
            self.ai.model = val;
        }
        if let Ok(val) = std::env::var("PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        self
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.similarity.threshold)?;

        if self.similarity.embedding_model.trim().is_empty() {
            return Err(Error::configuration("similarity.embedding_model must not be empty"));
        }
        if !self.similarity.uses_local_model() && self.similarity.embedding_url.is_none() {
            return Err(Error::configuration(format!(
                "embedding model '{}' requires similarity.embedding_url",
                self.similarity.embedding_model
            )));
        }
        if self.similarity.uses_local_model() && self.similarity.dimensions == 0 {
            return Err(Error::configuration("similarity.dimensions must be positive"));
        }
        if self.ai.enabled && self.ai.model.trim().is_empty() {
            return Err(Error::configuration("ai.model must not be empty when AI is enabled"));
        }
        if self.ai.timeout_ms == 0 {
            return Err(Error::configuration("ai.timeout_ms must be positive"));
        }
        if self.providers.request_timeout_ms == 0 {
            return Err(Error::configuration("providers.request_timeout_ms must be positive"));
        }

        Ok(())
    }
}

/// Similarity thresholds must lie in [0, 1]
pub fn validate_threshold(threshold: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(Error::configuration(format!(
            "similarity threshold {} outside [0, 1]",
            threshold
        )));
    }
    Ok(())
}

fn env_secret(name: &str) -> Option<SecretString> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::new)
}
