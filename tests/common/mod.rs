#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::TempDir;

use findata_core::cache::TieredCache;
use findata_core::context::AppContext;
use findata_core::error::CoreError;
use findata_core::providers::{
    Article, Bar, BarInterval, BarsProvider, NewsProvider, RateProvider, SentimentScore,
    StructuredSummary, TranscriptProvider, TranscriptText,
};
use findata_core::resilience::{BreakerConfig, EndpointRegistry, RetryPolicy};
use findata_core::store::schema::{build_pool, run_migrations};
use findata_core::store::Store;

/// Builds a fresh `Store` backed by a temp-file SQLite database with
/// migrations applied. The `TempDir` must outlive the `Store`.
pub fn make_test_store() -> (Arc<Store>, TempDir) {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("test.db");
    let pool = build_pool(db_path.to_str().unwrap(), 4, 3600).unwrap();
    run_migrations(&pool).unwrap();
    (Arc::new(Store::new(pool)), tmp)
}

/// A breaker config with a low failure threshold and short recovery
/// window, so cascade tests don't need to wait out the real defaults.
pub fn fast_breaker_config() -> BreakerConfig {
    BreakerConfig {
        failure_threshold: 2,
        recovery_timeout: std::time::Duration::from_millis(50),
        half_open_max_calls: 1,
    }
}

pub fn no_delay_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 1,
        base_delay: std::time::Duration::from_millis(1),
        max_delay: std::time::Duration::from_millis(5),
    }
}

/// Always returns the same fixed bars, counting how many times it was called.
pub struct FixedBarsProvider {
    pub name: &'static str,
    pub calls: AtomicU32,
    pub bars: Vec<Bar>,
}

impl FixedBarsProvider {
    pub fn new(name: &'static str, bars: Vec<Bar>) -> Self {
        Self {
            name,
            calls: AtomicU32::new(0),
            bars,
        }
    }
}

#[async_trait]
impl BarsProvider for FixedBarsProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get_bars(
        &self,
        _symbol: &str,
        _start: NaiveDate,
        _end: NaiveDate,
        _interval: BarInterval,
    ) -> Result<Vec<Bar>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.bars.clone())
    }
}

/// Always fails with a transient error, counting how many times it was called.
pub struct FailingBarsProvider {
    pub name: &'static str,
    pub calls: AtomicU32,
}

impl FailingBarsProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl BarsProvider for FailingBarsProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get_bars(
        &self,
        _symbol: &str,
        _start: NaiveDate,
        _end: NaiveDate,
        _interval: BarInterval,
    ) -> Result<Vec<Bar>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CoreError::Transient {
            endpoint: self.name.to_string(),
            message: "simulated upstream failure".to_string(),
        })
    }
}

pub struct FixedRateProvider {
    pub name: &'static str,
    pub calls: AtomicU32,
    pub rate: f64,
}

#[async_trait]
impl RateProvider for FixedRateProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get_rate(
        &self,
        _from: &str,
        _to: &str,
        _as_of: Option<NaiveDate>,
    ) -> Result<(f64, String), CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.rate, self.name.to_string()))
    }
}

pub struct NotFoundTranscriptProvider {
    pub name: &'static str,
    pub calls: AtomicU32,
}

#[async_trait]
impl TranscriptProvider for NotFoundTranscriptProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get_transcript(
        &self,
        _symbol: &str,
        _quarter: &str,
        _fiscal_year: i32,
    ) -> Result<TranscriptText, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CoreError::not_found("no transcript on this mock provider"))
    }
}

pub struct FixedTranscriptProvider {
    pub name: &'static str,
    pub calls: AtomicU32,
    pub text: String,
}

#[async_trait]
impl TranscriptProvider for FixedTranscriptProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get_transcript(
        &self,
        symbol: &str,
        quarter: &str,
        fiscal_year: i32,
    ) -> Result<TranscriptText, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TranscriptText {
            text: self.text.clone(),
            source_url: format!("https://mock.test/{symbol}/{quarter}/{fiscal_year}"),
            source_tag: self.name.to_string(),
        })
    }
}

pub struct EmptyNewsProvider {
    pub name: &'static str,
}

#[async_trait]
impl NewsProvider for EmptyNewsProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get_articles(
        &self,
        _query: &str,
        _window_days: u32,
        _limit: u32,
    ) -> Result<Vec<Article>, CoreError> {
        Ok(Vec::new())
    }
}

/// Minimal `AppContext` with an in-memory L1-only cache, a fresh temp-file
/// store, and caller-supplied providers. No L1', no LLM/embedding
/// providers — capability-specific tests opt into those separately.
pub fn make_test_context(
    store: Arc<Store>,
    bars_providers: Vec<Arc<dyn BarsProvider>>,
    rate_providers: Vec<Arc<dyn RateProvider>>,
    news_providers: Vec<Arc<dyn NewsProvider>>,
    transcript_providers: Vec<Arc<dyn TranscriptProvider>>,
) -> AppContext {
    let cache = Arc::new(TieredCache::new(1000, None, true));
    let breakers = Arc::new(EndpointRegistry::new(fast_breaker_config()));
    AppContext::new(
        cache,
        store,
        breakers,
        no_delay_retry(),
        std::time::Duration::from_secs(3600),
        bars_providers,
        rate_providers,
        news_providers,
        transcript_providers,
        None,
        None,
        None,
        None,
    )
}

pub fn sample_bar(date: NaiveDate) -> Bar {
    Bar {
        date,
        open: 100.0,
        high: 105.0,
        low: 99.0,
        close: 103.0,
        volume: 1_000_000.0,
    }
}

pub fn unused_summary() -> StructuredSummary {
    StructuredSummary {
        headline: String::new(),
        key_points: Vec::new(),
        guidance: None,
        risks: Vec::new(),
    }
}

pub fn unused_sentiment() -> SentimentScore {
    SentimentScore {
        overall: 0,
        tone: findata_core::providers::Tone::Neutral,
        outlook: String::new(),
        risk: String::new(),
        confidence: 0.0,
        signals: Vec::new(),
    }
}
