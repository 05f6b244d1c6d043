//! ClaimBuster fact matcher

use super::lenient::{first_str, items};
use super::{ClaimSource, FetchError, SearchQuery};
use crate::config::ClaimBusterConfig;
use crate::models::{ProviderResult, SourceApi};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::Value;

pub struct ClaimBusterSource {
    http: Client,
    config: ClaimBusterConfig,
}

impl ClaimBusterSource {
    pub fn new(http: Client, config: ClaimBusterConfig) -> Self {
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

pub fn parse_matches(payload: &Value) -> Vec<ProviderResult> {
    items(payload, &["matches", "justification"])
        .iter()
        .filter_map(|m| {
            let text = first_str(m, &["text", "title", "claim"])?;
            let mut result = ProviderResult::new(SourceApi::ClaimBuster, text);
            if let Some(rating) = first_str(m, &["rating", "verdict", "truth_rating"]) {
                result = result.with_raw_rating(rating);
            }
            if let Some(url) = first_str(m, &["url"]) {
                result = result.with_review_link(url);
            }
            if let Some(reviewer) = first_str(m, &["reviewed_by"]) {
                result = result.with_publisher(reviewer);
            }
            Some(result)
        })
        .collect()
}

#[async_trait]
impl ClaimSource for ClaimBusterSource {
    fn source_api(&self) -> SourceApi {
        SourceApi::ClaimBuster
    }

    fn is_configured(&self) -> bool {
        self.config
            .api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty())
    }

    async fn search(&self, query: &SearchQuery<'_>) -> Result<Vec<ProviderResult>, FetchError> {
        let api_key = match &self.config.api_key {
            Some(key) => key.expose_secret().to_string(),
            None => return Ok(Vec::new()),
        };

        let response = self
            .http
            .get(self.url())
            .header("X-Api-Key", api_key)
            .query(&[("query", query.text)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let payload: Value = response.json().await.map_err(|e| FetchError::Parse(e.to_string()))?;
        Ok(parse_matches(&payload))
    }
}
