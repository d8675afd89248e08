//! AI summary/sentiment and RAG-query resolver (spec §4.6 priority
//! tables: "AI Summary/Sentiment: L1 → L1′ → L2 derivative row → LLM
//! gateway call" and "RAG query: L1 (per-question) → semantic search on
//! pre-indexed chunks → LLM gateway synthesis").
//!
//! Cache authority: stored derivatives are authoritative; the LLM is
//! called only on miss or explicit `force_regenerate` (spec §4.6).

use crate::context::AppContext;
use crate::error::CoreError;
use crate::keys::ai_derivative_key;
use crate::providers::{ScoredChunk, SentimentScore, StructuredSummary};
use crate::resilience::Guarded;
use crate::store::transcript_derivatives::TranscriptDerivative;

const CACHE_KEY_VERSION: u32 = 1;

pub async fn summarize(
    ctx: &AppContext,
    transcript_id: &str,
    text: &str,
    mode: &str,
    force_regenerate: bool,
) -> Result<StructuredSummary, CoreError> {
    let key = ai_derivative_key(transcript_id, "summary", CACHE_KEY_VERSION);

    if !force_regenerate {
        if let Some(hit) = ctx.cache.get(&key).await {
            let summary: StructuredSummary = serde_json::from_slice(&hit.payload)
                .map_err(|e| CoreError::Fatal(format!("corrupt cached summary payload: {e}")))?;
            return Ok(summary);
        }

        let store = ctx.store.clone();
        let transcript_id_owned = transcript_id.to_string();
        let l2_row = tokio::task::spawn_blocking(move || -> Result<Option<TranscriptDerivative>, CoreError> {
            store.transcript_derivatives()?.get(&transcript_id_owned, "summary")
        })
        .await
        .map_err(|e| CoreError::Fatal(format!("store task panicked: {e}")))??;

        if let Some(row) = l2_row {
            let summary: StructuredSummary = serde_json::from_str(&row.payload)
                .map_err(|e| CoreError::Fatal(format!("corrupt stored summary payload: {e}")))?;
            warm_cache(ctx, &key, &summary).await;
            return Ok(summary);
        }
    }

    let provider = ctx
        .summary_provider
        .clone()
        .ok_or_else(|| CoreError::not_found("no summary provider configured"))?;

    let text_owned = text.to_string();
    let mode_owned = mode.to_string();
    let summary = ctx
        .sf_summary
        .run(key.clone(), || async move {
            let guarded = Guarded::new(&ctx.breakers, ctx.retry);
            guarded
                .call(provider.name(), || {
                    let provider = provider.clone();
                    let text = text_owned.clone();
                    let mode = mode_owned.clone();
                    async move { provider.summarize(&text, &mode).await }
                })
                .await
        })
        .await?;

    warm_cache(ctx, &key, &summary).await;
    write_through_summary(ctx, transcript_id, &summary).await?;

    Ok(summary)
}

pub async fn score_sentiment(
    ctx: &AppContext,
    transcript_id: &str,
    text: &str,
    force_regenerate: bool,
) -> Result<SentimentScore, CoreError> {
    let key = ai_derivative_key(transcript_id, "sentiment", CACHE_KEY_VERSION);

    if !force_regenerate {
        if let Some(hit) = ctx.cache.get(&key).await {
            let score: SentimentScore = serde_json::from_slice(&hit.payload)
                .map_err(|e| CoreError::Fatal(format!("corrupt cached sentiment payload: {e}")))?;
            return Ok(score);
        }

        let store = ctx.store.clone();
        let transcript_id_owned = transcript_id.to_string();
        let l2_row = tokio::task::spawn_blocking(move || -> Result<Option<TranscriptDerivative>, CoreError> {
            store.transcript_derivatives()?.get(&transcript_id_owned, "sentiment")
        })
        .await
        .map_err(|e| CoreError::Fatal(format!("store task panicked: {e}")))??;

        if let Some(row) = l2_row {
            let score: SentimentScore = serde_json::from_str(&row.payload)
                .map_err(|e| CoreError::Fatal(format!("corrupt stored sentiment payload: {e}")))?;
            warm_cache(ctx, &key, &score).await;
            return Ok(score);
        }
    }

    let provider = ctx
        .sentiment_provider
        .clone()
        .ok_or_else(|| CoreError::not_found("no sentiment provider configured"))?;

    let text_owned = text.to_string();
    let score = ctx
        .sf_sentiment
        .run(key.clone(), || async move {
            let guarded = Guarded::new(&ctx.breakers, ctx.retry);
            guarded
                .call(provider.name(), || {
                    let provider = provider.clone();
                    let text = text_owned.clone();
                    async move { provider.score(&text).await }
                })
                .await
        })
        .await?;

    warm_cache(ctx, &key, &score).await;
    write_through_sentiment(ctx, transcript_id, &score).await?;

    Ok(score)
}

/// RAG query: retrieval via `SemanticSearcher` over pre-indexed chunks,
/// then synthesis via the configured summary provider (spec §4.6).
pub async fn rag_query(
    ctx: &AppContext,
    question: &str,
    corpus_id: &str,
    k: usize,
) -> Result<StructuredSummary, CoreError> {
    let searcher = ctx
        .semantic_searcher
        .clone()
        .ok_or_else(|| CoreError::not_found("no semantic searcher configured"))?;
    let synthesizer = ctx
        .summary_provider
        .clone()
        .ok_or_else(|| CoreError::not_found("no summary provider configured for RAG synthesis"))?;

    let guarded = Guarded::new(&ctx.breakers, ctx.retry);
    let question_owned = question.to_string();
    let corpus_owned = corpus_id.to_string();
    let chunks: Vec<ScoredChunk> = guarded
        .call(searcher.name(), || {
            let searcher = searcher.clone();
            let question = question_owned.clone();
            let corpus_id = corpus_owned.clone();
            async move { searcher.top_k(&question, k, &corpus_id).await }
        })
        .await?;

    let context_block = chunks
        .iter()
        .map(|c| c.chunk.as_str())
        .collect::<Vec<_>>()
        .join("\n---\n");
    let prompt = format!("Question: {question}\n\nRelevant excerpts:\n{context_block}");

    guarded
        .call(synthesizer.name(), || {
            let synthesizer = synthesizer.clone();
            let prompt = prompt.clone();
            async move { synthesizer.summarize(&prompt, "rag_synthesis").await }
        })
        .await
}

async fn warm_cache<T: serde::Serialize>(ctx: &AppContext, key: &crate::keys::CacheKey, value: &T) {
    if let Ok(payload) = serde_json::to_vec(value) {
        ctx.cache.set(key, payload, ctx.default_ttl, "resolver_write_through").await;
    }
}

async fn write_through_summary(
    ctx: &AppContext,
    transcript_id: &str,
    summary: &StructuredSummary,
) -> Result<(), CoreError> {
    let store = ctx.store.clone();
    let row = TranscriptDerivative {
        transcript_id: transcript_id.to_string(),
        kind: "summary".to_string(),
        payload: serde_json::to_string(summary)
            .map_err(|e| CoreError::Fatal(format!("failed to serialize summary: {e}")))?,
        model_tag: ctx
            .summary_provider
            .as_ref()
            .map(|p| p.model_tag().to_string())
            .unwrap_or_default(),
    };
    tokio::task::spawn_blocking(move || store.transcript_derivatives()?.upsert(&row))
        .await
        .map_err(|e| CoreError::Fatal(format!("store task panicked: {e}")))?
}

async fn write_through_sentiment(
    ctx: &AppContext,
    transcript_id: &str,
    score: &SentimentScore,
) -> Result<(), CoreError> {
    let store = ctx.store.clone();
    let row = TranscriptDerivative {
        transcript_id: transcript_id.to_string(),
        kind: "sentiment".to_string(),
        payload: serde_json::to_string(score)
            .map_err(|e| CoreError::Fatal(format!("failed to serialize sentiment: {e}")))?,
        model_tag: ctx
            .sentiment_provider
            .as_ref()
            .map(|p| p.model_tag().to_string())
            .unwrap_or_default(),
    };
    tokio::task::spawn_blocking(move || store.transcript_derivatives()?.upsert(&row))
        .await
        .map_err(|e| CoreError::Fatal(format!("store task panicked: {e}")))?
}
