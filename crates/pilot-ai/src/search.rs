//! Tavily web search client

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::providers::{map_send_error, retry_after};

const BASE_URL: &str = "https://api.tavily.com";

/// Environment variable holding the Tavily key
pub const TAVILY_API_KEY_VAR: &str = "TAVILY_API_KEY";

/// A single search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Extracted page content relevant to the query
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

/// Tavily API client
#[derive(Clone)]
pub struct TavilyClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TavilyClient {
    /// Create a new client with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Bound every request made by this client
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Search the web, returning at most `max_results` hits
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let request = SearchRequest {
            query,
            max_results,
        };
        let url = format!("{}/search", self.base_url);

        tracing::debug!(query, max_results, "tavily search request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry = retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status, retry, text));
        }

        let body: SearchResponse = response.json().await.map_err(map_send_error)?;
        let mut hits = body.results;
        hits.truncate(max_results);
        Ok(hits)
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}
