//! Transcript resolver (spec §4.6 priority table: L1 → L1′ → L2 always
//! if present → company IR scrape → exchange-filing scrape → aggregator
//! scrape).
//!
//! Immutability policy: if L2 contains the row it is authoritative and
//! upstream is never consulted unless the caller passes
//! `force_refresh=true` (spec §4.6, §8 property 5).

use std::time::Duration;

use super::negative_cache;
use crate::context::AppContext;
use crate::error::CoreError;
use crate::keys::{transcript_key, Quarter};
use crate::providers::TranscriptText;
use crate::resilience::Guarded;
use crate::store::transcripts::Transcript;

const CACHE_KEY_VERSION: u32 = 1;
/// L2 row is permanent; L1/L1′ entries carry a 7-day TTL (spec §9 open
/// question resolution).
const L1_TTL_DAYS: u64 = 7;

pub async fn get_transcript(
    ctx: &AppContext,
    symbol: &str,
    quarter: Quarter,
    fiscal_year: i32,
    force_refresh: bool,
) -> Result<TranscriptText, CoreError> {
    let key = transcript_key(symbol, quarter, fiscal_year, CACHE_KEY_VERSION);

    if !force_refresh {
        if let Some(hit) = ctx.cache.get(&key).await {
            let text: TranscriptText = serde_json::from_slice(&hit.payload)
                .map_err(|e| CoreError::Fatal(format!("corrupt cached transcript payload: {e}")))?;
            return Ok(text);
        }

        if negative_cache::is_recent_miss(&ctx.cache, &key).await {
            return Err(CoreError::not_found(format!(
                "no transcript found for {symbol} {} FY{fiscal_year}",
                quarter.as_str()
            )));
        }

        let store = ctx.store.clone();
        let symbol_owned = symbol.to_string();
        let l2_row = tokio::task::spawn_blocking(move || -> Result<Option<Transcript>, CoreError> {
            store
                .transcripts()?
                .get_by_key(&symbol_owned, quarter, fiscal_year)
        })
        .await
        .map_err(|e| CoreError::Fatal(format!("store task panicked: {e}")))??;

        if let Some(row) = l2_row {
            let text = TranscriptText {
                text: row.text,
                source_url: String::new(),
                source_tag: row.source_tag,
            };
            warm_cache(ctx, &key, &text).await;
            return Ok(text);
        }
    }

    let symbol_owned = symbol.to_string();
    let quarter_str = quarter.as_str().to_string();
    let result = ctx
        .sf_transcript
        .run(key.clone(), || async move {
            fetch_from_providers(ctx, &symbol_owned, &quarter_str, fiscal_year).await
        })
        .await;

    let text = match result {
        Ok(text) => text,
        Err(err) => {
            negative_cache::mark_miss(&ctx.cache, &key).await;
            return Err(err);
        }
    };

    warm_cache(ctx, &key, &text).await;
    write_through_store(ctx, symbol, quarter, fiscal_year, &text, force_refresh).await?;

    Ok(text)
}

async fn fetch_from_providers(
    ctx: &AppContext,
    symbol: &str,
    quarter: &str,
    fiscal_year: i32,
) -> Result<TranscriptText, CoreError> {
    let guarded = Guarded::new(&ctx.breakers, ctx.retry);
    let mut attempts = Vec::new();
    let mut last_not_found = false;

    for provider in &ctx.transcript_providers {
        let provider = provider.clone();
        let name = provider.name();
        let result = guarded
            .call(name, || {
                let provider = provider.clone();
                async move { provider.get_transcript(symbol, quarter, fiscal_year).await }
            })
            .await;

        match result {
            Ok(text) => return Ok(text),
            Err(err) => {
                last_not_found = matches!(err, CoreError::NotFound { .. });
                attempts.push(format!("{name}: {err}"));
            }
        }
    }

    if last_not_found {
        Err(CoreError::not_found_with_hint(
            format!("no transcript found for {symbol} {quarter} FY{fiscal_year}"),
            "likely availability window: earnings date + 3 business days",
        ))
    } else {
        Err(CoreError::UpstreamUnavailable {
            capability: "transcript".to_string(),
            attempts,
        })
    }
}

async fn warm_cache(ctx: &AppContext, key: &crate::keys::CacheKey, text: &TranscriptText) {
    if let Ok(payload) = serde_json::to_vec(text) {
        ctx.cache
            .set(key, payload, Duration::from_secs(L1_TTL_DAYS * 86_400), &text.source_tag)
            .await;
    }
}

async fn write_through_store(
    ctx: &AppContext,
    symbol: &str,
    quarter: Quarter,
    fiscal_year: i32,
    text: &TranscriptText,
    force: bool,
) -> Result<(), CoreError> {
    let store = ctx.store.clone();
    let row = Transcript {
        ticker: symbol.to_string(),
        quarter: quarter.as_str().to_string(),
        fiscal_year,
        text: text.text.clone(),
        source_tag: text.source_tag.clone(),
        fetched_at: chrono::Utc::now().to_rfc3339(),
        word_count: text.text.split_whitespace().count() as i64,
    };
    tokio::task::spawn_blocking(move || store.transcripts()?.upsert(&row, force))
        .await
        .map_err(|e| CoreError::Fatal(format!("store task panicked: {e}")))?
}
