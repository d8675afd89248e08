//! Semantic search provider (spec §6 `EXA_API_KEY`), used for the RAG
//! query capability's retrieval step ahead of LLM synthesis.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::CoreError;

use super::{build_http_client, ScoredChunk, SemanticSearcher};

const BASE_URL: &str = "https://api.exa.ai/search";
const TIMEOUT_SECS: u64 = 20;

pub struct ExaSemanticSearcher {
    client: reqwest::Client,
    api_key: String,
}

impl ExaSemanticSearcher {
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("EXA_API_KEY").ok()?;
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
struct ExaResult {
    text: Option<String>,
    score: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ExaResponse {
    results: Vec<ExaResult>,
}

#[async_trait]
impl SemanticSearcher for ExaSemanticSearcher {
    fn name(&self) -> &'static str {
        "exa_semantic_search"
    }

    async fn top_k(&self, query: &str, k: usize, corpus_id: &str) -> Result<Vec<ScoredChunk>, CoreError> {
        let resp = self
            .client
            .post(BASE_URL)
            .header("x-api-key", &self.api_key)
            .json(&json!({
                "query": query,
                "numResults": k,
                "contents": {"text": true},
                "category": corpus_id,
            }))
            .send()
            .await
            .map_err(|e| crate::error::transient("exa_semantic_search", e))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CoreError::QuotaExceeded {
                endpoint: "exa_semantic_search".into(),
                retry_after_secs: 15,
            });
        }
        if !resp.status().is_success() {
            return Err(crate::error::transient(
                "exa_semantic_search",
                format!("status {}", resp.status()),
            ));
        }

        let parsed: ExaResponse = resp
            .json()
            .await
            .map_err(|e| crate::error::transient("exa_semantic_search", e))?;

        let chunks: Vec<ScoredChunk> = parsed
            .results
            .into_iter()
            .filter_map(|r| {
                r.text.map(|text| ScoredChunk {
                    chunk: text,
                    score: r.score.unwrap_or(0.0),
                })
            })
            .collect();

        if chunks.is_empty() {
            return Err(CoreError::not_found(format!("no semantic matches for '{query}'")));
        }
        Ok(chunks)
    }
}

/// Local cosine-similarity search over pre-computed embeddings (spec §9:
/// the RAG vector index is a derivative of a transcript, owned by C3,
/// rebuildable from source — not an opaque external file). Used when the
/// corpus is a specific transcript's chunk set already embedded and
/// stored, rather than an open web query.
pub struct LocalCosineSearcher {
    corpus: Vec<(String, Vec<f32>)>,
}

impl LocalCosineSearcher {
    pub fn new(corpus: Vec<(String, Vec<f32>)>) -> Self {
        Self { corpus }
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }

    pub fn top_k_against(&self, query_vec: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .corpus
            .iter()
            .map(|(chunk, vec)| ScoredChunk {
                chunk: chunk.clone(),
                score: Self::cosine(query_vec, vec),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_most_similar_first() {
        let searcher = LocalCosineSearcher::new(vec![
            ("unrelated".to_string(), vec![0.0, 1.0]),
            ("matches query".to_string(), vec![1.0, 0.0]),
        ]);
        let results = searcher.top_k_against(&[1.0, 0.0], 2);
        assert_eq!(results[0].chunk, "matches query");
    }
}
