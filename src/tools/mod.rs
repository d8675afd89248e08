//! Thin tool handlers (spec §6/§8): each function validates nothing
//! itself (garde does that in `server.rs`) and calls straight into
//! `resolver/`, mapping the result into a response payload.

pub mod response_types;

use crate::context::AppContext;
use crate::error::CoreError;
use crate::keys::Quarter;
use crate::providers::BarInterval;
use response_types::{
    BarsResponse, CacheHealthResponse, ExchangeRateResponse, NewsResponse, ScreeningResponse,
    ScreeningRowResponse, SemanticQueryResponse, SentimentResponse, SummaryResponse,
    TranscriptResponse,
};

fn transcript_id(symbol: &str, quarter: Quarter, fiscal_year: i32) -> String {
    format!("{symbol}:{}:{fiscal_year}", quarter.as_str())
}

pub async fn get_transcript(
    ctx: &AppContext,
    symbol: &str,
    quarter_raw: &str,
    fiscal_year: i32,
    force_refresh: bool,
) -> Result<TranscriptResponse, CoreError> {
    let quarter = Quarter::parse(quarter_raw)?;
    let current_year = chrono::Utc::now().date_naive().format("%Y").to_string().parse().unwrap_or(fiscal_year);
    let fiscal_year = crate::keys::validate_fiscal_year(fiscal_year, current_year)?;

    let text = crate::resolver::transcript::get_transcript(ctx, symbol, quarter, fiscal_year, force_refresh).await?;
    Ok(TranscriptResponse {
        symbol: symbol.to_string(),
        quarter: quarter.as_str().to_string(),
        fiscal_year,
        word_count: text.text.split_whitespace().count(),
        text: text.text,
        source_tag: text.source_tag,
    })
}

pub async fn get_bars(
    ctx: &AppContext,
    symbol: &str,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
    interval: &str,
) -> Result<BarsResponse, CoreError> {
    let interval = match interval.to_lowercase().as_str() {
        "daily" => BarInterval::Daily,
        "weekly" => BarInterval::Weekly,
        "monthly" => BarInterval::Monthly,
        other => return Err(CoreError::InvalidInput(format!("unknown interval '{other}'"))),
    };
    let bars = crate::resolver::bars::get_bars(ctx, symbol, start, end, interval).await?;
    Ok(BarsResponse {
        symbol: symbol.to_string(),
        interval: interval_label(interval),
        bars,
    })
}

fn interval_label(interval: BarInterval) -> String {
    match interval {
        BarInterval::Daily => "daily",
        BarInterval::Weekly => "weekly",
        BarInterval::Monthly => "monthly",
    }
    .to_string()
}

pub async fn get_exchange_rate(
    ctx: &AppContext,
    from: &str,
    to: &str,
) -> Result<ExchangeRateResponse, CoreError> {
    let (rate, source_tag) = crate::resolver::rate::get_rate(ctx, from, to).await?;
    Ok(ExchangeRateResponse {
        from: from.to_uppercase(),
        to: to.to_uppercase(),
        rate,
        source_tag,
    })
}

pub async fn get_news(
    ctx: &AppContext,
    query: &str,
    window_days: u32,
    limit: u32,
) -> Result<NewsResponse, CoreError> {
    let articles = crate::resolver::news::get_articles(ctx, query, window_days, limit).await?;
    Ok(NewsResponse {
        query: query.to_string(),
        articles,
    })
}

#[allow(clippy::too_many_arguments)]
pub async fn summarize(
    ctx: &AppContext,
    symbol: &str,
    quarter_raw: &str,
    fiscal_year: i32,
    mode: &str,
    force_regenerate: bool,
) -> Result<SummaryResponse, CoreError> {
    let quarter = Quarter::parse(quarter_raw)?;
    let id = transcript_id(symbol, quarter, fiscal_year);
    let transcript = crate::resolver::transcript::get_transcript(ctx, symbol, quarter, fiscal_year, false).await?;
    let summary = crate::resolver::ai::summarize(ctx, &id, &transcript.text, mode, force_regenerate).await?;
    Ok(SummaryResponse {
        symbol: symbol.to_string(),
        quarter: quarter.as_str().to_string(),
        fiscal_year,
        summary,
    })
}

pub async fn score_sentiment(
    ctx: &AppContext,
    symbol: &str,
    quarter_raw: &str,
    fiscal_year: i32,
    force_regenerate: bool,
) -> Result<SentimentResponse, CoreError> {
    let quarter = Quarter::parse(quarter_raw)?;
    let id = transcript_id(symbol, quarter, fiscal_year);
    let transcript = crate::resolver::transcript::get_transcript(ctx, symbol, quarter, fiscal_year, false).await?;
    let sentiment = crate::resolver::ai::score_sentiment(ctx, &id, &transcript.text, force_regenerate).await?;
    Ok(SentimentResponse {
        symbol: symbol.to_string(),
        quarter: quarter.as_str().to_string(),
        fiscal_year,
        sentiment,
    })
}

pub async fn semantic_query(
    ctx: &AppContext,
    question: &str,
    corpus_id: &str,
    top_k: usize,
) -> Result<SemanticQueryResponse, CoreError> {
    let answer = crate::resolver::ai::rag_query(ctx, question, corpus_id, top_k).await?;
    Ok(SemanticQueryResponse {
        question: question.to_string(),
        answer,
    })
}

pub async fn cache_health(ctx: &AppContext) -> CacheHealthResponse {
    let health = ctx.cache.health().await;
    CacheHealthResponse {
        l1_entries: health.l1_entries,
        l1_prime_configured: health.l1_prime_configured,
        l1_prime_healthy: health.l1_prime_healthy,
    }
}

/// Read-only proxy onto the screening table (spec §1 Non-goals: the
/// screening/ranking methodology that populates this table is an
/// external collaborator's concern; this tool only reads what is
/// already stored).
pub async fn get_screening(
    ctx: &AppContext,
    strategy: &str,
    limit: u32,
) -> Result<ScreeningResponse, CoreError> {
    let store = ctx.store.clone();
    let strategy_owned = strategy.to_string();
    let (as_of_date, rows) = tokio::task::spawn_blocking(move || -> Result<_, CoreError> {
        let repo = store.screening()?;
        let Some(as_of) = repo.latest_as_of(&strategy_owned)? else {
            return Ok((String::new(), Vec::new()));
        };
        let rows = repo.query(&strategy_owned, as_of)?;
        Ok((as_of.to_string(), rows))
    })
    .await
    .map_err(|e| CoreError::Fatal(format!("store task panicked: {e}")))??;

    Ok(ScreeningResponse {
        strategy: strategy.to_string(),
        as_of_date,
        rows: rows
            .into_iter()
            .take(limit as usize)
            .map(|r| ScreeningRowResponse {
                rank: r.rank,
                symbol: r.symbol,
                score: r.score,
            })
            .collect(),
    })
}
