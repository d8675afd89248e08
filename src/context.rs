//! Explicit application context (spec §9 "replace module-level singletons
//! and lazy initialization with an explicit application context
//! constructed at startup and passed down").
//!
//! Generalizes the teacher's per-field `Arc<T>` dependencies on
//! `OptopsyServer` into one `Arc<AppContext>` carrying the cache, the
//! store, the breaker registry, the single-flight gates, and every
//! provider list, so nothing in the resolver or tool layer reaches for
//! global state.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::TieredCache;
use crate::providers::{
    BarsProvider, Embedder, NewsProvider, RateProvider, SemanticSearcher, SentimentProvider,
    SummaryProvider, TranscriptProvider,
};
use crate::providers::traits::{Article, Bar, SentimentScore, StructuredSummary, TranscriptText};
use crate::resilience::{EndpointRegistry, RetryPolicy, SingleFlightGate};
use crate::store::Store;

pub struct AppContext {
    pub cache: Arc<TieredCache>,
    pub store: Arc<Store>,
    pub breakers: Arc<EndpointRegistry>,
    pub retry: RetryPolicy,
    /// `CACHE_TTL_SECONDS` (spec §6) — the default L1/L1′ TTL used by
    /// resolvers that don't have their own capability-specific freshness
    /// policy (news' shorter TTL and transcripts' multi-day TTL are kept
    /// as their own constants, not overridden by this default).
    pub default_ttl: Duration,

    pub bars_providers: Vec<Arc<dyn BarsProvider>>,
    pub rate_providers: Vec<Arc<dyn RateProvider>>,
    pub news_providers: Vec<Arc<dyn NewsProvider>>,
    pub transcript_providers: Vec<Arc<dyn TranscriptProvider>>,
    pub summary_provider: Option<Arc<dyn SummaryProvider>>,
    pub sentiment_provider: Option<Arc<dyn SentimentProvider>>,
    pub embedder: Option<Arc<dyn Embedder>>,
    pub semantic_searcher: Option<Arc<dyn SemanticSearcher>>,

    pub sf_bars: SingleFlightGate<Vec<Bar>>,
    pub sf_rate: SingleFlightGate<(f64, String)>,
    pub sf_transcript: SingleFlightGate<TranscriptText>,
    pub sf_news: SingleFlightGate<Vec<Article>>,
    pub sf_summary: SingleFlightGate<StructuredSummary>,
    pub sf_sentiment: SingleFlightGate<SentimentScore>,
}

impl AppContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: Arc<TieredCache>,
        store: Arc<Store>,
        breakers: Arc<EndpointRegistry>,
        retry: RetryPolicy,
        default_ttl: Duration,
        bars_providers: Vec<Arc<dyn BarsProvider>>,
        rate_providers: Vec<Arc<dyn RateProvider>>,
        news_providers: Vec<Arc<dyn NewsProvider>>,
        transcript_providers: Vec<Arc<dyn TranscriptProvider>>,
        summary_provider: Option<Arc<dyn SummaryProvider>>,
        sentiment_provider: Option<Arc<dyn SentimentProvider>>,
        embedder: Option<Arc<dyn Embedder>>,
        semantic_searcher: Option<Arc<dyn SemanticSearcher>>,
    ) -> Self {
        Self {
            cache,
            store,
            breakers,
            retry,
            default_ttl,
            bars_providers,
            rate_providers,
            news_providers,
            transcript_providers,
            summary_provider,
            sentiment_provider,
            embedder,
            semantic_searcher,
            sf_bars: SingleFlightGate::new(),
            sf_rate: SingleFlightGate::new(),
            sf_transcript: SingleFlightGate::new(),
            sf_news: SingleFlightGate::new(),
            sf_summary: SingleFlightGate::new(),
            sf_sentiment: SingleFlightGate::new(),
        }
    }
}
