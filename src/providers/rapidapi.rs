//! RapidAPI fact-checker search

use super::lenient::{first_str, items};
use super::{ClaimSource, FetchError, SearchQuery};
use crate::config::RapidApiConfig;
use crate::models::{ProviderResult, SourceApi};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::Value;

const CLAIM_KEYS: &[&str] = &["claim", "claim_text", "title", "summary"];
const RATING_KEYS: &[&str] = &["review_text", "label", "verdict", "rating", "textualRating"];
const LINK_KEYS: &[&str] = &["url", "link", "review_link"];
const PUBLISHER_KEYS: &[&str] = &["source", "publisher"];

pub struct RapidApiSource {
    http: Client,
    config: RapidApiConfig,
}

impl RapidApiSource {
    pub fn new(http: Client, config: RapidApiConfig) -> Self {
        Self { http, config }
    }

    fn url(&self) -> String {
        format!(
            "{}/{}",
            self.config.url.trim_end_matches('/'),
            self.config.endpoint.trim_start_matches('/')
        )
    }
}

/// Accepts a bare list or a list under `results`, `data` or `items`. Items
/// carrying nested `claim_reviews` produce one record per review; flat items
/// produce one record each.
pub fn parse_items(payload: &Value) -> Vec<ProviderResult> {
    let mut results = Vec::new();

    for item in items(payload, &["results", "data", "items"]) {
        let claim_text = match first_str(item, CLAIM_KEYS) {
            Some(text) => text,
            None => continue,
        };
        let claimant = first_str(item, &["claimant"]);
        let reviews = items(item, &["claim_reviews"]);

        let base = || {
            let result = ProviderResult::new(SourceApi::RapidApi, claim_text.clone());
            match &claimant {
                Some(claimant) => result.with_claimant(claimant.clone()),
                None => result,
            }
        };

        if !reviews.is_empty() {
            for review in reviews {
                results.push(with_review_fields(base(), review));
            }
        } else {
            results.push(with_review_fields(base(), item));
        }
    }
    results
}

fn with_review_fields(mut result: ProviderResult, fields: &Value) -> ProviderResult {
    if let Some(rating) = first_str(fields, RATING_KEYS) {
        result = result.with_raw_rating(rating);
    }
    if let Some(link) = first_str(fields, LINK_KEYS) {
        result = result.with_review_link(link);
    }
    if let Some(publisher) = first_str(fields, PUBLISHER_KEYS) {
        result = result.with_publisher(publisher);
    }
    result
}

#[async_trait]
impl ClaimSource for RapidApiSource {
    fn source_api(&self) -> SourceApi {
        SourceApi::RapidApi
    }

    fn is_configured(&self) -> bool {
        self.config
            .api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty())
            && !self.config.host.trim().is_empty()
    }

    async fn search(&self, query: &SearchQuery<'_>) -> Result<Vec<ProviderResult>, FetchError> {
        let api_key = match &self.config.api_key {
            Some(key) => key.expose_secret().to_string(),
            None => return Ok(Vec::new()),
        };

        let limit = query.page_size.unwrap_or(self.config.limit as usize);
        let params = [
            ("query", query.text.to_string()),
            ("limit", limit.to_string()),
            ("offset", self.config.offset.to_string()),
            ("language", query.language_code.unwrap_or(self.config.language.as_str()).to_string()),
        ];

        let response = self
            .http
            .get(self.url())
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", &self.config.host)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let payload: Value = response.json().await.map_err(|e| FetchError::Parse(e.to_string()))?;
        Ok(parse_items(&payload))
    }
}
