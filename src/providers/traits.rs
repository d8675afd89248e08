//! Capability interfaces (spec §4.5).
//!
//! Thin, stateless (aside from connection pools) adapters. Each provider
//! implements one or more of these. Declared `#[async_trait]` the same
//! way the teacher declares `QuoteProvider`, so implementations stay
//! swappable and mockable in tests.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::CoreError;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarInterval {
    Daily,
    Weekly,
    Monthly,
}

#[async_trait]
pub trait BarsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: BarInterval,
    ) -> Result<Vec<Bar>, CoreError>;
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `(rate, source_tag)`. `as_of` defaults to today when `None`.
    async fn get_rate(
        &self,
        from: &str,
        to: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<(f64, String), CoreError>;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub published_at: String,
    pub summary: String,
    pub source: String,
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_articles(
        &self,
        query: &str,
        window_days: u32,
        limit: u32,
    ) -> Result<Vec<Article>, CoreError>;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TranscriptText {
    pub text: String,
    pub source_url: String,
    pub source_tag: String,
}

#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_transcript(
        &self,
        symbol: &str,
        quarter: &str,
        fiscal_year: i32,
    ) -> Result<TranscriptText, CoreError>;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
pub struct StructuredSummary {
    pub headline: String,
    pub key_points: Vec<String>,
    pub guidance: Option<String>,
    pub risks: Vec<String>,
}

#[async_trait]
pub trait SummaryProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn model_tag(&self) -> &str;

    async fn summarize(&self, text: &str, mode: &str) -> Result<StructuredSummary, CoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
pub enum Tone {
    Bullish,
    Neutral,
    Bearish,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
pub struct SentimentScore {
    pub overall: u8,
    pub tone: Tone,
    pub outlook: String,
    pub risk: String,
    pub confidence: f64,
    pub signals: Vec<String>,
}

#[async_trait]
pub trait SentimentProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn model_tag(&self) -> &str;

    async fn score(&self, text: &str) -> Result<SentimentScore, CoreError>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &'static str;
    fn model_tag(&self) -> &str;

    async fn embed(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>, CoreError>;
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: String,
    pub score: f32,
}

#[async_trait]
pub trait SemanticSearcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn top_k(&self, query: &str, k: usize, corpus_id: &str) -> Result<Vec<ScoredChunk>, CoreError>;
}
