//! Embedding provider backing the RAG pipeline (spec §4.6 "RAG query").
//! Uses OpenAI's embeddings endpoint when `OPENAI_API_KEY` is configured.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::CoreError;

use super::{build_http_client, Embedder};

const BASE_URL: &str = "https://api.openai.com/v1/embeddings";
const MODEL: &str = "text-embedding-3-small";
const TIMEOUT_SECS: u64 = 30;

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
}

impl OpenAiEmbedder {
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok()?;
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
struct EmbeddingRow {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &'static str {
        "openai_embedder"
    }

    fn model_tag(&self) -> &str {
        MODEL
    }

    async fn embed(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let resp = self
            .client
            .post(BASE_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({"model": MODEL, "input": chunks}))
            .send()
            .await
            .map_err(|e| crate::error::transient("openai_embedder", e))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CoreError::QuotaExceeded {
                endpoint: "openai_embedder".into(),
                retry_after_secs: 20,
            });
        }
        if !resp.status().is_success() {
            return Err(crate::error::transient(
                "openai_embedder",
                format!("status {}", resp.status()),
            ));
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| crate::error::transient("openai_embedder", e))?;

        Ok(parsed.data.into_iter().map(|row| row.embedding).collect())
    }
}
