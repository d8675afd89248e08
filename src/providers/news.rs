//! News provider, deduplicated by the resolver on canonical URL hash
//! (spec §4.6). Uses Tavily's news search endpoint when
//! `TAVILY_API_KEY` is configured.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::CoreError;

use super::{build_http_client, Article, NewsProvider};

const BASE_URL: &str = "https://api.tavily.com/search";
const TIMEOUT_SECS: u64 = 20;

pub struct TavilyNewsProvider {
    client: reqwest::Client,
    api_key: String,
}

impl TavilyNewsProvider {
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("TAVILY_API_KEY").ok()?;
        if api_key.is_empty() {
            return None;
        }
        Some(Self {
            client: build_http_client(Duration::from_secs(TIMEOUT_SECS)),
            api_key,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    content: String,
    published_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    results: Vec<TavilyResult>,
}

#[async_trait]
impl NewsProvider for TavilyNewsProvider {
    fn name(&self) -> &'static str {
        "tavily_news"
    }

    async fn get_articles(
        &self,
        query: &str,
        window_days: u32,
        limit: u32,
    ) -> Result<Vec<Article>, CoreError> {
        let resp = self
            .client
            .post(BASE_URL)
            .json(&json!({
                "api_key": self.api_key,
                "query": query,
                "topic": "news",
                "days": window_days,
                "max_results": limit,
            }))
            .send()
            .await
            .map_err(|e| crate::error::transient("tavily_news", e))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CoreError::QuotaExceeded {
                endpoint: "tavily_news".into(),
                retry_after_secs: 30,
            });
        }
        if resp.status().is_server_error() {
            return Err(crate::error::transient(
                "tavily_news",
                format!("status {}", resp.status()),
            ));
        }

        let parsed: TavilyResponse = resp
            .json()
            .await
            .map_err(|e| crate::error::transient("tavily_news", e))?;

        if parsed.results.is_empty() {
            return Err(CoreError::not_found(format!("no articles for {query}")));
        }

        Ok(parsed
            .results
            .into_iter()
            .map(|r| Article {
                title: r.title,
                url: r.url,
                published_at: r.published_date.unwrap_or_default(),
                summary: r.content,
                source: "tavily_news".to_string(),
            })
            .collect())
    }
}
