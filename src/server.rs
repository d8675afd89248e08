use garde::Validate;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Json, wrapper::Parameters},
    model::{Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

use crate::context::AppContext;
use crate::tools;
use crate::tools::response_types::{
    BarsResponse, CacheHealthResponse, ExchangeRateResponse, NewsResponse, ScreeningResponse,
    SemanticQueryResponse, SentimentResponse, SummaryResponse, TranscriptResponse,
};

#[derive(Clone)]
pub struct FinDataServer {
    ctx: Arc<AppContext>,
    tool_router: ToolRouter<Self>,
}

impl FinDataServer {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self {
            ctx,
            tool_router: Self::tool_router(),
        }
    }
}

fn default_interval() -> String {
    "daily".to_string()
}

fn default_window_days() -> u32 {
    7
}

fn default_news_limit() -> u32 {
    10
}

fn default_mode() -> String {
    "standard".to_string()
}

fn default_top_k() -> usize {
    5
}

fn default_screening_limit() -> u32 {
    20
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct GetTranscriptParams {
    /// Ticker symbol, optionally market-qualified (e.g. "RELIANCE.NS", "AAPL")
    #[garde(length(min = 1, max = 20))]
    pub symbol: String,
    /// Fiscal quarter token (e.g. "Q1", "1", "quarter 1")
    #[garde(length(min = 1, max = 16))]
    pub quarter: String,
    /// Fiscal year (e.g. 2025)
    #[garde(range(min = 2000, max = 2100))]
    pub fiscal_year: i32,
    /// Bypass the L2 immutability policy and re-fetch from providers
    #[serde(default)]
    #[garde(skip)]
    pub force_refresh: bool,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct GetBarsParams {
    /// Ticker symbol, optionally market-qualified
    #[garde(length(min = 1, max = 20))]
    pub symbol: String,
    /// Range start date (YYYY-MM-DD)
    #[garde(pattern(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$"))]
    pub start: String,
    /// Range end date (YYYY-MM-DD)
    #[garde(pattern(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$"))]
    pub end: String,
    /// Bar interval: "daily", "weekly", or "monthly" (default "daily")
    #[serde(default = "default_interval")]
    #[garde(pattern(r"^(?i)(daily|weekly|monthly)$"))]
    pub interval: String,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct GetExchangeRateParams {
    /// Base currency code (e.g. "USD")
    #[garde(pattern(r"^[A-Za-z]{3}$"))]
    pub from: String,
    /// Quote currency code (e.g. "INR")
    #[garde(pattern(r"^[A-Za-z]{3}$"))]
    pub to: String,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct GetNewsParams {
    /// Free-text search query (company name, ticker, or topic)
    #[garde(length(min = 1, max = 200))]
    pub query: String,
    /// Lookback window in days (default 7)
    #[serde(default = "default_window_days")]
    #[garde(range(min = 1, max = 90))]
    pub window_days: u32,
    /// Max articles to return after dedup (default 10)
    #[serde(default = "default_news_limit")]
    #[garde(range(min = 1, max = 50))]
    pub limit: u32,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct SummarizeParams {
    /// Ticker symbol
    #[garde(length(min = 1, max = 20))]
    pub symbol: String,
    /// Fiscal quarter token
    #[garde(length(min = 1, max = 16))]
    pub quarter: String,
    /// Fiscal year
    #[garde(range(min = 2000, max = 2100))]
    pub fiscal_year: i32,
    /// Summary mode, e.g. "standard", "bull_bear" (default "standard")
    #[serde(default = "default_mode")]
    #[garde(length(min = 1, max = 32))]
    pub mode: String,
    /// Bypass the stored derivative and call the LLM gateway again
    #[serde(default)]
    #[garde(skip)]
    pub force_regenerate: bool,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct ScoreSentimentParams {
    /// Ticker symbol
    #[garde(length(min = 1, max = 20))]
    pub symbol: String,
    /// Fiscal quarter token
    #[garde(length(min = 1, max = 16))]
    pub quarter: String,
    /// Fiscal year
    #[garde(range(min = 2000, max = 2100))]
    pub fiscal_year: i32,
    /// Bypass the stored derivative and call the LLM gateway again
    #[serde(default)]
    #[garde(skip)]
    pub force_regenerate: bool,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct SemanticQueryParams {
    /// Natural-language question
    #[garde(length(min = 1, max = 500))]
    pub question: String,
    /// Identifier of the pre-indexed corpus to search (e.g. a transcript id)
    #[garde(length(min = 1, max = 100))]
    pub corpus_id: String,
    /// Number of chunks to retrieve before synthesis (default 5)
    #[serde(default = "default_top_k")]
    #[garde(range(min = 1, max = 20))]
    pub top_k: usize,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct GetScreeningParams {
    /// Screening strategy name (e.g. "maverick_momentum")
    #[garde(length(min = 1, max = 64))]
    pub strategy: String,
    /// Max rows to return (default 20)
    #[serde(default = "default_screening_limit")]
    #[garde(range(min = 1, max = 200))]
    pub limit: u32,
}

#[tool_router]
impl FinDataServer {
    /// Fetch an earnings call transcript, cascading through cache, the
    /// persistent store, and scrape-based providers in priority order.
    ///
    /// Transcripts are immutable once stored: a cached/stored hit is
    /// returned as-is unless `force_refresh` is set.
    #[tool(name = "get_transcript", annotations(read_only_hint = true))]
    async fn get_transcript(
        &self,
        Parameters(params): Parameters<GetTranscriptParams>,
    ) -> Result<Json<TranscriptResponse>, String> {
        params.validate().map_err(|e| format!("Validation error: {e}"))?;
        tools::get_transcript(
            &self.ctx,
            &params.symbol,
            &params.quarter,
            params.fiscal_year,
            params.force_refresh,
        )
        .await
        .map(Json)
        .map_err(|e| format!("Error: {e}"))
    }

    /// Fetch OHLCV price bars for a symbol over a date range, cascading
    /// through cache, the persistent store, and vendor APIs in priority
    /// order.
    #[tool(name = "get_bars", annotations(read_only_hint = true))]
    async fn get_bars(
        &self,
        Parameters(params): Parameters<GetBarsParams>,
    ) -> Result<Json<BarsResponse>, String> {
        params.validate().map_err(|e| format!("Validation error: {e}"))?;
        let start = chrono::NaiveDate::parse_from_str(&params.start, "%Y-%m-%d")
            .map_err(|e| format!("Error: invalid start date: {e}"))?;
        let end = chrono::NaiveDate::parse_from_str(&params.end, "%Y-%m-%d")
            .map_err(|e| format!("Error: invalid end date: {e}"))?;
        tools::get_bars(&self.ctx, &params.symbol, start, end, &params.interval)
            .await
            .map(Json)
            .map_err(|e| format!("Error: {e}"))
    }

    /// Fetch a currency exchange rate, preferring today's stored rate and
    /// falling back through live FX APIs and a static approximate table.
    #[tool(name = "get_exchange_rate", annotations(read_only_hint = true))]
    async fn get_exchange_rate(
        &self,
        Parameters(params): Parameters<GetExchangeRateParams>,
    ) -> Result<Json<ExchangeRateResponse>, String> {
        params.validate().map_err(|e| format!("Validation error: {e}"))?;
        tools::get_exchange_rate(&self.ctx, &params.from, &params.to)
            .await
            .map(Json)
            .map_err(|e| format!("Error: {e}"))
    }

    /// Search recent news articles, merged and deduplicated across every
    /// configured news provider.
    #[tool(name = "get_news", annotations(read_only_hint = true))]
    async fn get_news(
        &self,
        Parameters(params): Parameters<GetNewsParams>,
    ) -> Result<Json<NewsResponse>, String> {
        params.validate().map_err(|e| format!("Validation error: {e}"))?;
        tools::get_news(&self.ctx, &params.query, params.window_days, params.limit)
            .await
            .map(Json)
            .map_err(|e| format!("Error: {e}"))
    }

    /// Summarize an earnings call transcript into a structured headline,
    /// key points, guidance, and risks. The stored derivative is
    /// authoritative unless `force_regenerate` is set.
    #[tool(name = "summarize", annotations(read_only_hint = true))]
    async fn summarize(
        &self,
        Parameters(params): Parameters<SummarizeParams>,
    ) -> Result<Json<SummaryResponse>, String> {
        params.validate().map_err(|e| format!("Validation error: {e}"))?;
        tools::summarize(
            &self.ctx,
            &params.symbol,
            &params.quarter,
            params.fiscal_year,
            &params.mode,
            params.force_regenerate,
        )
        .await
        .map(Json)
        .map_err(|e| format!("Error: {e}"))
    }

    /// Score the tone and outlook of an earnings call transcript. The
    /// stored derivative is authoritative unless `force_regenerate` is set.
    #[tool(name = "score_sentiment", annotations(read_only_hint = true))]
    async fn score_sentiment(
        &self,
        Parameters(params): Parameters<ScoreSentimentParams>,
    ) -> Result<Json<SentimentResponse>, String> {
        params.validate().map_err(|e| format!("Validation error: {e}"))?;
        tools::score_sentiment(
            &self.ctx,
            &params.symbol,
            &params.quarter,
            params.fiscal_year,
            params.force_regenerate,
        )
        .await
        .map(Json)
        .map_err(|e| format!("Error: {e}"))
    }

    /// Answer a free-form question over a pre-indexed transcript corpus
    /// via retrieval-augmented generation.
    #[tool(name = "semantic_query", annotations(read_only_hint = true))]
    async fn semantic_query(
        &self,
        Parameters(params): Parameters<SemanticQueryParams>,
    ) -> Result<Json<SemanticQueryResponse>, String> {
        params.validate().map_err(|e| format!("Validation error: {e}"))?;
        tools::semantic_query(&self.ctx, &params.question, &params.corpus_id, params.top_k)
            .await
            .map(Json)
            .map_err(|e| format!("Error: {e}"))
    }

    /// Read the most recent screening/ranking snapshot for a strategy.
    ///
    /// Read-only proxy onto the persistent store: the screening
    /// methodology that populates this table is produced out-of-band by
    /// a separate process and is out of scope here.
    #[tool(name = "get_screening", annotations(read_only_hint = true))]
    async fn get_screening(
        &self,
        Parameters(params): Parameters<GetScreeningParams>,
    ) -> Result<Json<ScreeningResponse>, String> {
        params.validate().map_err(|e| format!("Validation error: {e}"))?;
        tools::get_screening(&self.ctx, &params.strategy, params.limit)
            .await
            .map(Json)
            .map_err(|e| format!("Error: {e}"))
    }

    /// Report cache tier health: L1 entry count and L1′ (Redis)
    /// configuration/availability.
    #[tool(name = "cache_health", annotations(read_only_hint = true))]
    async fn cache_health(&self) -> Json<CacheHealthResponse> {
        Json(tools::cache_health(&self.ctx).await)
    }
}

#[tool_handler]
impl ServerHandler for FinDataServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "findata-core".into(),
                title: Some("Financial Data Aggregation Core".into()),
                version: "0.1.0".into(),
                description: Some(
                    "Cascading provider resolution over transcripts, price bars, exchange \
                     rates, news, and LLM-derived summaries/sentiment, behind a multi-tier \
                     cache and circuit-breaker-guarded resolver."
                        .into(),
                ),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Financial data aggregation core. Each tool resolves its data through a \
                \nfixed priority cascade (in-process cache -> shared cache -> persistent \
                \nstore -> upstream providers), so repeated calls for the same data are \
                \ncheap and upstream outages degrade gracefully instead of failing outright.\
                \n\nTools:\
                \n- get_transcript({ symbol, quarter, fiscal_year, force_refresh? }) — earnings \
                call transcript text. Immutable once stored; pass force_refresh to re-fetch.\
                \n- get_bars({ symbol, start, end, interval? }) — OHLCV price bars.\
                \n- get_exchange_rate({ from, to }) — currency pair rate.\
                \n- get_news({ query, window_days?, limit? }) — recent news, deduplicated \
                across providers.\
                \n- summarize({ symbol, quarter, fiscal_year, mode?, force_regenerate? }) and \
                score_sentiment({ symbol, quarter, fiscal_year, force_regenerate? }) — LLM-derived \
                transcript analysis; call get_transcript first isn't required, these fetch it \
                internally.\
                \n- semantic_query({ question, corpus_id, top_k? }) — retrieval-augmented \
                answer over a pre-indexed transcript corpus.\
                \n- get_screening({ strategy, limit? }) and cache_health() — read-only \
                diagnostics."
                    .into(),
            ),
        }
    }
}
