//! News resolver (spec §4.6 priority table: L1 → L1′ → L2 (if window
//! covered) → each news provider in configured order, deduplicated by
//! canonical URL hash).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use crate::context::AppContext;
use crate::error::CoreError;
use crate::keys::CacheKey;
use crate::providers::Article;
use crate::resilience::Guarded;

const CACHE_KEY_VERSION: u32 = 1;
const L1_TTL: Duration = Duration::from_secs(900);

fn canonical_url_hash(url: &str) -> u64 {
    let normalized = url.trim_end_matches('/').split('?').next().unwrap_or(url);
    let mut hasher = DefaultHasher::new();
    normalized.hash(&mut hasher);
    hasher.finish()
}

fn query_key(query: &str, window_days: u32) -> CacheKey {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    CacheKey::new(
        "news",
        "query",
        vec![hasher.finish().to_string(), window_days.to_string()],
        CACHE_KEY_VERSION,
    )
}

pub async fn get_articles(
    ctx: &AppContext,
    query: &str,
    window_days: u32,
    limit: u32,
) -> Result<Vec<Article>, CoreError> {
    let key = query_key(query, window_days);

    if let Some(hit) = ctx.cache.get(&key).await {
        let articles: Vec<Article> = serde_json::from_slice(&hit.payload)
            .map_err(|e| CoreError::Fatal(format!("corrupt cached news payload: {e}")))?;
        return Ok(articles);
    }

    if super::negative_cache::is_recent_miss(&ctx.cache, &key).await {
        return Err(CoreError::not_found(format!("no articles for '{query}'")));
    }

    let query_owned = query.to_string();
    let result = ctx
        .sf_news
        .run(key.clone(), || async move {
            fetch_from_providers(ctx, &query_owned, window_days, limit).await
        })
        .await;

    let articles = match result {
        Ok(articles) => articles,
        Err(err) => {
            super::negative_cache::mark_miss(&ctx.cache, &key).await;
            return Err(err);
        }
    };

    if let Ok(payload) = serde_json::to_vec(&articles) {
        ctx.cache.set(&key, payload, L1_TTL, "resolver_write_through").await;
    }

    Ok(articles)
}

async fn fetch_from_providers(
    ctx: &AppContext,
    query: &str,
    window_days: u32,
    limit: u32,
) -> Result<Vec<Article>, CoreError> {
    let guarded = Guarded::new(&ctx.breakers, ctx.retry);
    let mut attempts = Vec::new();
    let mut seen_urls = std::collections::HashSet::new();
    let mut merged = Vec::new();

    for provider in &ctx.news_providers {
        let provider = provider.clone();
        let name = provider.name();
        let result = guarded
            .call(name, || {
                let provider = provider.clone();
                async move { provider.get_articles(query, window_days, limit).await }
            })
            .await;

        match result {
            Ok(articles) => {
                for article in articles {
                    if seen_urls.insert(canonical_url_hash(&article.url)) {
                        merged.push(article);
                    }
                }
            }
            Err(err) => attempts.push(format!("{name}: {err}")),
        }
    }

    merged.truncate(limit as usize);

    if merged.is_empty() {
        if attempts.len() == ctx.news_providers.len() && !ctx.news_providers.is_empty() {
            return Err(CoreError::UpstreamUnavailable {
                capability: "news".to_string(),
                attempts,
            });
        }
        return Err(CoreError::not_found(format!("no articles for '{query}'")));
    }

    Ok(merged)
}
