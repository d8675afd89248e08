//! Bars/prices resolver (spec §4.6 priority table: L1 → L1′ → L2 (if
//! fresh enough) → primary vendor → secondary vendor).

use chrono::{NaiveDate, Utc};

use crate::context::AppContext;
use crate::error::CoreError;
use crate::keys::{bars_key, symbol_to_market, Market};
use crate::providers::{Bar, BarInterval};
use crate::resilience::Guarded;
use crate::store::price_bars::{PriceBar, PriceBarPredicate};

const CACHE_KEY_VERSION: u32 = 1;

fn interval_str(interval: BarInterval) -> &'static str {
    match interval {
        BarInterval::Daily => "daily",
        BarInterval::Weekly => "weekly",
        BarInterval::Monthly => "monthly",
    }
}

/// L2 is considered "fresh enough" when it already covers the requested
/// end date (spec §4.6 "L2 (if fresh enough)"); otherwise providers are
/// consulted and the gap is written through.
fn l2_is_fresh(rows: &[PriceBar], end: NaiveDate) -> bool {
    rows.iter().any(|r| r.date >= end)
}

pub async fn get_bars(
    ctx: &AppContext,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    interval: BarInterval,
) -> Result<Vec<Bar>, CoreError> {
    let canonical = symbol_to_market(symbol)?;
    let key = bars_key(
        &canonical.raw_symbol,
        interval_str(interval),
        &start.to_string(),
        &end.to_string(),
        CACHE_KEY_VERSION,
    );

    if let Some(hit) = ctx.cache.get(&key).await {
        let bars: Vec<Bar> = serde_json::from_slice(&hit.payload)
            .map_err(|e| CoreError::Fatal(format!("corrupt cached bars payload: {e}")))?;
        return Ok(bars);
    }

    if super::negative_cache::is_recent_miss(&ctx.cache, &key).await {
        return Err(CoreError::not_found(format!("no bars available for {symbol}")));
    }

    let store = ctx.store.clone();
    let market = canonical.market;
    let raw_symbol = canonical.raw_symbol.clone();
    let rows = tokio::task::spawn_blocking(move || -> Result<Vec<PriceBar>, CoreError> {
        store.price_bars()?.query_by(&PriceBarPredicate {
            symbol: Some(raw_symbol),
            market: Some(market),
            start: Some(start),
            end: Some(end),
        })
    })
    .await
    .map_err(|e| CoreError::Fatal(format!("store task panicked: {e}")))??;

    if l2_is_fresh(&rows, end) {
        let bars = rows_to_bars(&rows);
        warm_caches(ctx, &key, &bars).await;
        return Ok(bars);
    }

    let symbol_owned = canonical.raw_symbol.clone();
    let result = ctx
        .sf_bars
        .run(key.clone(), || async move {
            fetch_from_providers(ctx, &symbol_owned, market, start, end, interval).await
        })
        .await;

    let bars = match result {
        Ok(bars) => bars,
        Err(err) => {
            super::negative_cache::mark_miss(&ctx.cache, &key).await;
            return Err(err);
        }
    };

    warm_caches(ctx, &key, &bars).await;
    write_through_store(ctx, &canonical.raw_symbol, market, &bars).await?;

    Ok(bars)
}

async fn fetch_from_providers(
    ctx: &AppContext,
    symbol: &str,
    _market: Market,
    start: NaiveDate,
    end: NaiveDate,
    interval: BarInterval,
) -> Result<Vec<Bar>, CoreError> {
    let guarded = Guarded::new(&ctx.breakers, ctx.retry);
    let mut attempts = Vec::new();
    let mut last_not_found = false;

    for provider in &ctx.bars_providers {
        let provider = provider.clone();
        let name = provider.name();
        let result = guarded
            .call(name, || {
                let provider = provider.clone();
                async move { provider.get_bars(symbol, start, end, interval).await }
            })
            .await;

        match result {
            Ok(bars) => return Ok(bars),
            Err(err) => {
                last_not_found = matches!(err, CoreError::NotFound { .. });
                attempts.push(format!("{name}: {err}"));
            }
        }
    }

    if last_not_found {
        Err(CoreError::not_found_with_hint(
            format!("no bars available for {symbol}"),
            "check the symbol is listed and the range overlaps trading days",
        ))
    } else {
        Err(CoreError::UpstreamUnavailable {
            capability: "bars".to_string(),
            attempts,
        })
    }
}

async fn warm_caches(ctx: &AppContext, key: &crate::keys::CacheKey, bars: &[Bar]) {
    if let Ok(payload) = serde_json::to_vec(bars) {
        ctx.cache.set(key, payload, ctx.default_ttl, "resolver_write_through").await;
    }
}

async fn write_through_store(
    ctx: &AppContext,
    symbol: &str,
    market: Market,
    bars: &[Bar],
) -> Result<(), CoreError> {
    let store = ctx.store.clone();
    let symbol = symbol.to_string();
    let rows: Vec<PriceBar> = bars
        .iter()
        .map(|b| PriceBar {
            symbol: symbol.clone(),
            market,
            date: b.date,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
        })
        .collect();

    tokio::task::spawn_blocking(move || {
        let mut repo = store.price_bars()?;
        repo.bulk_upsert(&rows)
            .map_err(|e| CoreError::Fatal(format!("write-through bulk upsert failed: {e}")))
    })
    .await
    .map_err(|e| CoreError::Fatal(format!("store task panicked: {e}")))?
}

fn rows_to_bars(rows: &[PriceBar]) -> Vec<Bar> {
    let mut bars: Vec<Bar> = rows
        .iter()
        .map(|r| Bar {
            date: r.date,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
        })
        .collect();
    bars.sort_by_key(|b| b.date);
    bars
}

/// Today's date in UTC, used by callers that default `end` to "now".
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
