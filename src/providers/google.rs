//! Google Fact Check Tools `claims:search`

use super::lenient::{as_text, first_str};
use super::{ClaimSource, FetchError, SearchQuery};
use crate::config::GoogleConfig;
use crate::models::{ProviderResult, SourceApi};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::Value;

pub struct GoogleFactCheckSource {
    http: Client,
    config: GoogleConfig,
}

impl GoogleFactCheckSource {
    pub fn new(http: Client, config: GoogleConfig) -> Self {
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

/// One record per claim review. The review's textual rating falls back to
/// `reviewRating.alternateName`; the claim text falls back to the review title.
pub fn parse_claims(payload: &Value) -> Vec<ProviderResult> {
    let claims = payload
        .get("claims")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut results = Vec::new();
    for claim in claims {
        let claim_text = first_str(claim, &["text"]);
        let claimant = first_str(claim, &["claimant"]);
        let reviews = claim
            .get("claimReview")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        for review in reviews {
            let text = match claim_text.clone().or_else(|| first_str(review, &["title"])) {
                Some(text) => text,
                None => continue,
            };
            let rating = first_str(review, &["textualRating", "textRating"]).or_else(|| {
                review
                    .get("reviewRating")
                    .and_then(|r| r.get("alternateName"))
                    .and_then(as_text)
            });

            let mut result = ProviderResult::new(SourceApi::Google, text);
            if let Some(claimant) = &claimant {
                result = result.with_claimant(claimant.clone());
            }
            if let Some(rating) = rating {
                result = result.with_raw_rating(rating);
            }
            if let Some(url) = first_str(review, &["url"]) {
                result = result.with_review_link(url);
            }
            if let Some(publisher) = review.get("publisher").and_then(as_text) {
                result = result.with_publisher(publisher);
            }
            results.push(result);
        }
    }
    results
}

#[async_trait]
impl ClaimSource for GoogleFactCheckSource {
    fn source_api(&self) -> SourceApi {
        SourceApi::Google
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

        let language = query.language_code.unwrap_or(self.config.language_code.as_str());
        let page_size = query.page_size.unwrap_or(self.config.page_size as usize);
        let mut params: Vec<(&str, String)> = vec![
            ("key", api_key),
            ("languageCode", language.to_string()),
            ("pageSize", page_size.to_string()),
        ];
        match query.page_url {
            Some(page_url) => params.push(("pageUrl", page_url.to_string())),
            None => params.push(("query", query.text.to_string())),
        }

        let response = self.http.get(self.url()).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let payload: Value = response.json().await.map_err(|e| FetchError::Parse(e.to_string()))?;
        Ok(parse_claims(&payload))
    }
}
