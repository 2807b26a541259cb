//! Web search backend.
//!
//! `web_search`, `case_study_lookup` and `save_as_markdown` all go through a
//! `SearchBackend`, so tests can swap Brave out for canned results.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const BRAVE_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

/// One web result as the tools report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub description: String,
    pub snippet: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Request(String),

    #[error("Search API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not decode search response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchHit>, SearchError>;
}

/// Brave Search web API client.
pub struct BraveSearch {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl BraveSearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self {
            api_key: api_key.into(),
            endpoint: BRAVE_ENDPOINT.to_string(),
            client,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchBackend for BraveSearch {
    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchHit>, SearchError> {
        debug!(query, count, "Brave search");
        let response = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&[
                ("q", query),
                ("count", &count.to_string()),
                ("search_lang", "en"),
                ("country", "US"),
                ("safesearch", "moderate"),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status { status, body });
        }

        let body: BraveResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        Ok(body.into_hits())
    }
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    extra_snippets: Vec<String>,
}

impl BraveResponse {
    fn into_hits(self) -> Vec<SearchHit> {
        self.web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .map(|r| SearchHit {
                snippet: r.extra_snippets.into_iter().next().unwrap_or_else(|| r.description.clone()),
                title: r.title,
                url: r.url,
                description: r.description,
                kind: "web_result".into(),
            })
            .collect()
    }
}
