//! Client for the Tavily web-search API.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use memescope_core::SearchDepth;

use crate::error::SourceError;

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
}

/// A ranked web search over free-text queries.
pub trait WebSearch: Send + Sync {
    fn search(
        &self,
        query: &str,
        depth: SearchDepth,
        max_results: u32,
    ) -> impl Future<Output = Result<Vec<SearchResult>, SourceError>> + Send;
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'static str,
    max_results: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// HTTP client for `POST {base}/search`.
pub struct TavilyClient {
    client: Client,
    api_key: String,
    endpoint: Url,
}

impl TavilyClient {
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`SourceError::InvalidUrl`] if `base_url`
    /// does not parse.
    pub fn new(api_key: &str, base_url: &str, timeout_secs: u64) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("memescope/0.1 (trend-report)")
            .build()?;

        let raw = format!("{}/search", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&raw).map_err(|e| SourceError::InvalidUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            endpoint,
        })
    }
}

impl WebSearch for TavilyClient {
    async fn search(
        &self,
        query: &str,
        depth: SearchDepth,
        max_results: u32,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let request = SearchRequest {
            api_key: &self.api_key,
            query,
            search_depth: depth.as_api_str(),
            max_results,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.endpoint.to_string(),
            });
        }

        let body = response.text().await?;
        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
                context: format!("search(query={query})"),
                source: e,
            })?;

        Ok(parsed.results)
    }
}
