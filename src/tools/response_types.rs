//! Tool response payloads. Each tool returns one of these as `Json<T>`
//! the way the teacher's `tools::response_types` does for the
//! backtesting surface.

use schemars::JsonSchema;
use serde::Serialize;

use crate::providers::{Article, Bar, SentimentScore, StructuredSummary};

#[derive(Debug, Serialize, JsonSchema)]
pub struct TranscriptResponse {
    pub symbol: String,
    pub quarter: String,
    pub fiscal_year: i32,
    pub text: String,
    pub source_tag: String,
    pub word_count: usize,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct BarsResponse {
    pub symbol: String,
    pub interval: String,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ExchangeRateResponse {
    pub from: String,
    pub to: String,
    pub rate: f64,
    pub source_tag: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct NewsResponse {
    pub query: String,
    pub articles: Vec<Article>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SummaryResponse {
    pub symbol: String,
    pub quarter: String,
    pub fiscal_year: i32,
    pub summary: StructuredSummary,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SentimentResponse {
    pub symbol: String,
    pub quarter: String,
    pub fiscal_year: i32,
    pub sentiment: SentimentScore,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SemanticQueryResponse {
    pub question: String,
    pub answer: StructuredSummary,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ScreeningResponse {
    pub strategy: String,
    pub as_of_date: String,
    pub rows: Vec<ScreeningRowResponse>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ScreeningRowResponse {
    pub rank: i64,
    pub symbol: String,
    pub score: f64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CacheHealthResponse {
    pub l1_entries: usize,
    pub l1_prime_configured: bool,
    pub l1_prime_healthy: bool,
}
