//! LLM gateway (spec §6 `OPENROUTER_API_KEY` / `OPENAI_API_KEY` /
//! `ANTHROPIC_API_KEY`), backing `SummaryProvider` and `SentimentProvider`.
//!
//! Prefers OpenRouter when configured since it fronts multiple model
//! families behind one OpenAI-compatible chat completions API; falls
//! back to a direct OpenAI call otherwise. Anthropic is recognized as a
//! configured credential but routed through OpenRouter's compatibility
//! layer rather than a bespoke client, keeping one HTTP call shape for
//! the whole gateway.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::CoreError;

use super::{build_http_client, SentimentScore, StructuredSummary, SummaryProvider, Tone};
use super::traits::SentimentProvider;

const TIMEOUT_SECS: u64 = 60;

enum Backend {
    OpenRouter { base_url: &'static str, model: &'static str },
    OpenAi { base_url: &'static str, model: &'static str },
}

pub struct LlmGatewayProvider {
    client: reqwest::Client,
    api_key: String,
    backend: Backend,
}

impl LlmGatewayProvider {
    pub fn from_env() -> Option<Self> {
        if let Ok(api_key) = std::env::var("OPENROUTER_API_KEY") {
            if !api_key.is_empty() {
                return Some(Self {
                    client: build_http_client(Duration::from_secs(TIMEOUT_SECS)),
                    api_key,
                    backend: Backend::OpenRouter {
                        base_url: "https://openrouter.ai/api/v1/chat/completions",
                        model: "anthropic/claude-3.5-sonnet",
                    },
                });
            }
        }
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            if !api_key.is_empty() {
                return Some(Self {
                    client: build_http_client(Duration::from_secs(TIMEOUT_SECS)),
                    api_key,
                    backend: Backend::OpenAi {
                        base_url: "https://api.openai.com/v1/chat/completions",
                        model: "gpt-4o-mini",
                    },
                });
            }
        }
        None
    }

    fn model_tag_str(&self) -> &'static str {
        match self.backend {
            Backend::OpenRouter { model, .. } => model,
            Backend::OpenAi { model, .. } => model,
        }
    }

    async fn chat_json(&self, system_prompt: &str, user_content: &str) -> Result<String, CoreError> {
        let (url, model) = match self.backend {
            Backend::OpenRouter { base_url, model } => (base_url, model),
            Backend::OpenAi { base_url, model } => (base_url, model),
        };

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": model,
                "response_format": {"type": "json_object"},
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_content},
                ],
            }))
            .send()
            .await
            .map_err(|e| crate::error::transient("llm_gateway", e))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CoreError::QuotaExceeded {
                endpoint: "llm_gateway".into(),
                retry_after_secs: 20,
            });
        }
        if resp.status().is_server_error() {
            return Err(crate::error::transient(
                "llm_gateway",
                format!("status {}", resp.status()),
            ));
        }
        if !resp.status().is_success() {
            return Err(CoreError::InvalidInput(format!(
                "llm_gateway rejected request: {}",
                resp.status()
            )));
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }
        #[derive(Deserialize)]
        struct ChatMessage {
            content: String,
        }
        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| crate::error::transient("llm_gateway", e))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| crate::error::transient("llm_gateway", "empty completion"))
    }
}

#[async_trait]
impl SummaryProvider for LlmGatewayProvider {
    fn name(&self) -> &'static str {
        "llm_gateway"
    }

    fn model_tag(&self) -> &str {
        self.model_tag_str()
    }

    async fn summarize(&self, text: &str, mode: &str) -> Result<StructuredSummary, CoreError> {
        let system = "You summarize earnings call transcripts. \
            Respond with JSON: {headline, key_points: [string], guidance: string|null, risks: [string]}.";
        let user = format!("Mode: {mode}\n\nTranscript:\n{text}");
        let raw = self.chat_json(system, &user).await?;
        serde_json::from_str(&raw)
            .map_err(|e| crate::error::transient("llm_gateway", format!("malformed summary JSON: {e}")))
    }
}

#[async_trait]
impl SentimentProvider for LlmGatewayProvider {
    fn name(&self) -> &'static str {
        "llm_gateway"
    }

    fn model_tag(&self) -> &str {
        self.model_tag_str()
    }

    async fn score(&self, text: &str) -> Result<SentimentScore, CoreError> {
        let system = "You score the sentiment of an earnings call transcript. \
            Respond with JSON: {overall: 1-5, tone: \"Bullish\"|\"Neutral\"|\"Bearish\", \
            outlook: string, risk: string, confidence: 0-1, signals: [string]}.";
        let raw = self.chat_json(system, text).await?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| crate::error::transient("llm_gateway", format!("malformed sentiment JSON: {e}")))?;

        let tone = match value.get("tone").and_then(|v| v.as_str()).unwrap_or("Neutral") {
            "Bullish" => Tone::Bullish,
            "Bearish" => Tone::Bearish,
            _ => Tone::Neutral,
        };

        Ok(SentimentScore {
            overall: value.get("overall").and_then(|v| v.as_u64()).unwrap_or(3) as u8,
            tone,
            outlook: value.get("outlook").and_then(|v| v.as_str()).unwrap_or("").to_string(),
            risk: value.get("risk").and_then(|v| v.as_str()).unwrap_or("").to_string(),
            confidence: value.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.5),
            signals: value
                .get("signals")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(|s| s.as_str().map(String::from)).collect())
                .unwrap_or_default(),
        })
    }
}
