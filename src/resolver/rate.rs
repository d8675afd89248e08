//! Exchange-rate resolver (spec §4.6 priority table: L1 → L1′ → L2
//! (same-day row) → primary FX API → secondary FX → approximate-table
//! fallback).
//!
//! Freshness policy: an L2 row is acceptable only if `asOf.date == today`
//! (spec §4.6 "exchange-rate freshness"); otherwise providers are
//! consulted and the result is written through.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::CoreError;
use crate::keys::fx_key;
use crate::resilience::Guarded;
use crate::store::exchange_rates::ExchangeRate;

const CACHE_KEY_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedRate {
    rate: f64,
    source_tag: String,
}

pub async fn get_rate(
    ctx: &AppContext,
    from: &str,
    to: &str,
) -> Result<(f64, String), CoreError> {
    let from = from.to_uppercase();
    let to = to.to_uppercase();
    let key = fx_key(&from, &to, CACHE_KEY_VERSION);

    if let Some(hit) = ctx.cache.get(&key).await {
        let cached: CachedRate = serde_json::from_slice(&hit.payload)
            .map_err(|e| CoreError::Fatal(format!("corrupt cached rate payload: {e}")))?;
        return Ok((cached.rate, cached.source_tag));
    }

    if super::negative_cache::is_recent_miss(&ctx.cache, &key).await {
        return Err(CoreError::not_found(format!("no exchange rate available for {from}/{to}")));
    }

    let today = Utc::now().date_naive();
    let store = ctx.store.clone();
    let (from_l2, to_l2) = (from.clone(), to.clone());
    let l2_row = tokio::task::spawn_blocking(move || -> Result<Option<ExchangeRate>, CoreError> {
        store.exchange_rates()?.get_by_key(&from_l2, &to_l2, today)
    })
    .await
    .map_err(|e| CoreError::Fatal(format!("store task panicked: {e}")))??;

    if let Some(row) = l2_row {
        let result = (row.rate, row.source_tag);
        warm_cache(ctx, &key, result.0, &result.1).await;
        return Ok(result);
    }

    let (from_owned, to_owned) = (from.clone(), to.clone());
    let fetch_result = ctx
        .sf_rate
        .run(key.clone(), || async move {
            fetch_from_providers(ctx, &from_owned, &to_owned).await
        })
        .await;

    let result = match fetch_result {
        Ok(result) => result,
        Err(err) => {
            super::negative_cache::mark_miss(&ctx.cache, &key).await;
            return Err(err);
        }
    };

    warm_cache(ctx, &key, result.0, &result.1).await;
    write_through_store(ctx, &from, &to, today, result.0, &result.1).await?;

    Ok(result)
}

async fn fetch_from_providers(
    ctx: &AppContext,
    from: &str,
    to: &str,
) -> Result<(f64, String), CoreError> {
    let guarded = Guarded::new(&ctx.breakers, ctx.retry);
    let mut attempts = Vec::new();
    let mut last_not_found = false;

    for provider in &ctx.rate_providers {
        let provider = provider.clone();
        let name = provider.name();
        let result = guarded
            .call(name, || {
                let provider = provider.clone();
                async move { provider.get_rate(from, to, None).await }
            })
            .await;

        match result {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_not_found = matches!(err, CoreError::NotFound { .. });
                attempts.push(format!("{name}: {err}"));
            }
        }
    }

    if last_not_found {
        Err(CoreError::not_found(format!("no exchange rate available for {from}/{to}")))
    } else {
        Err(CoreError::UpstreamUnavailable {
            capability: "exchange_rate".to_string(),
            attempts,
        })
    }
}

async fn warm_cache(ctx: &AppContext, key: &crate::keys::CacheKey, rate: f64, source_tag: &str) {
    let cached = CachedRate {
        rate,
        source_tag: source_tag.to_string(),
    };
    if let Ok(payload) = serde_json::to_vec(&cached) {
        ctx.cache.set(key, payload, ctx.default_ttl, "resolver_write_through").await;
    }
}

async fn write_through_store(
    ctx: &AppContext,
    from: &str,
    to: &str,
    date: NaiveDate,
    rate: f64,
    source_tag: &str,
) -> Result<(), CoreError> {
    let store = ctx.store.clone();
    let row = ExchangeRate {
        from_currency: from.to_string(),
        to_currency: to.to_string(),
        date,
        rate,
        source_tag: source_tag.to_string(),
    };
    tokio::task::spawn_blocking(move || store.exchange_rates()?.upsert(&row))
        .await
        .map_err(|e| CoreError::Fatal(format!("store task panicked: {e}")))?
}
