use std::sync::Arc;

use anyhow::Result;
use rmcp::ServiceExt;
use tracing_subscriber::{self, EnvFilter};

use findata_core::cache::{RedisCache, TieredCache};
use findata_core::config::AppConfig;
use findata_core::context::AppContext;
use findata_core::providers::bars_secondary::SecondaryBarsProvider;
use findata_core::providers::bars_tiingo::TiingoBarsProvider;
use findata_core::providers::embedder::OpenAiEmbedder;
use findata_core::providers::llm_gateway::LlmGatewayProvider;
use findata_core::providers::news::TavilyNewsProvider;
use findata_core::providers::rate_approximate::ApproximateRateProvider;
use findata_core::providers::rate_primary::PrimaryRateProvider;
use findata_core::providers::rate_secondary::SecondaryRateProvider;
use findata_core::providers::semantic_search::ExaSemanticSearcher;
use findata_core::providers::transcript_aggregator_scrape::AggregatorScrapeProvider;
use findata_core::providers::transcript_exchange_scrape::ExchangeScrapeProvider;
use findata_core::providers::transcript_ir_scrape::IrScrapeProvider;
use findata_core::resilience::{BreakerConfig, EndpointRegistry, RetryPolicy};
use findata_core::server::FinDataServer;
use findata_core::store::schema::{build_pool, run_migrations};
use findata_core::store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // `RUST_LOG` wins if set; otherwise fall back to the simpler `LOG_LEVEL`
    // (spec §6) so operators don't need to know the `tracing` filter syntax.
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        EnvFilter::new(level)
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env();

    if let Some(parent) = std::path::Path::new(&config.database_path).parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let pool = build_pool(&config.database_path, config.db_pool_size, config.db_recycle_secs)?;
    run_migrations(&pool)?;
    let store = Arc::new(Store::new(pool));

    if let Some(path) = &config.ir_mappings_path {
        match findata_core::config::load_ir_mappings(&store, path) {
            Ok(n) => tracing::info!(count = n, "loaded IR mappings seed file"),
            Err(e) => tracing::warn!(error = %e, "failed to load IR mappings seed file"),
        }
    }

    let l1_prime = match &config.redis_url {
        Some(url) => match RedisCache::connect(url).await {
            Ok(conn) => {
                tracing::info!("connected to L1' (Redis)");
                Some(Arc::new(conn))
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to connect to L1' (Redis); running L1-only");
                None
            }
        },
        None => None,
    };
    let cache = Arc::new(TieredCache::new(config.l1_capacity, l1_prime, config.cache_enabled));

    let breakers = Arc::new(EndpointRegistry::new(BreakerConfig {
        failure_threshold: config.breaker_failure_threshold,
        recovery_timeout: config.breaker_recovery_timeout,
        half_open_max_calls: config.breaker_half_open_max_calls,
    }));
    let retry = RetryPolicy {
        max_attempts: config.retry_max_attempts,
        base_delay: config.retry_base_delay,
        max_delay: config.retry_max_delay,
    };

    let mut bars_providers: Vec<Arc<dyn findata_core::providers::BarsProvider>> = Vec::new();
    if let Some(tiingo) = TiingoBarsProvider::from_env() {
        tracing::info!("Tiingo bars provider configured");
        bars_providers.push(Arc::new(tiingo));
    }
    bars_providers.push(Arc::new(SecondaryBarsProvider::default()));

    let mut rate_providers: Vec<Arc<dyn findata_core::providers::RateProvider>> = Vec::new();
    if let Some(primary) = PrimaryRateProvider::from_env() {
        tracing::info!("primary exchange-rate provider configured");
        rate_providers.push(Arc::new(primary));
    }
    rate_providers.push(Arc::new(SecondaryRateProvider::default()));
    rate_providers.push(Arc::new(ApproximateRateProvider));

    let mut news_providers: Vec<Arc<dyn findata_core::providers::NewsProvider>> = Vec::new();
    if let Some(tavily) = TavilyNewsProvider::from_env() {
        tracing::info!("Tavily news provider configured");
        news_providers.push(Arc::new(tavily));
    }

    let transcript_providers: Vec<Arc<dyn findata_core::providers::TranscriptProvider>> = vec![
        Arc::new(IrScrapeProvider::new(store.clone())),
        Arc::new(ExchangeScrapeProvider::default()),
        Arc::new(AggregatorScrapeProvider::default()),
    ];

    let llm_gateway = LlmGatewayProvider::from_env().map(Arc::new);
    if llm_gateway.is_some() {
        tracing::info!("LLM gateway configured for summary/sentiment");
    }
    let summary_provider = llm_gateway
        .clone()
        .map(|p| p as Arc<dyn findata_core::providers::SummaryProvider>);
    let sentiment_provider = llm_gateway.map(|p| p as Arc<dyn findata_core::providers::SentimentProvider>);

    let embedder = OpenAiEmbedder::from_env().map(|p| Arc::new(p) as Arc<dyn findata_core::providers::Embedder>);
    let semantic_searcher = ExaSemanticSearcher::from_env()
        .map(|p| Arc::new(p) as Arc<dyn findata_core::providers::SemanticSearcher>);
    if embedder.is_some() {
        tracing::info!("embedding provider configured");
    }
    if semantic_searcher.is_some() {
        tracing::info!("semantic search provider configured");
    }

    let ctx = Arc::new(AppContext::new(
        cache,
        store,
        breakers,
        retry,
        std::time::Duration::from_secs(config.cache_ttl_secs),
        bars_providers,
        rate_providers,
        news_providers,
        transcript_providers,
        summary_provider,
        sentiment_provider,
        embedder,
        semantic_searcher,
    ));

    if let Ok(port) = std::env::var("PORT") {
        use rmcp::transport::streamable_http_server::{
            session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
        };

        let service = StreamableHttpService::new(
            move || Ok(FinDataServer::new(ctx.clone())),
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig::default(),
        );

        let app = axum::Router::new()
            .nest_service("/mcp", service)
            .route("/health", axum::routing::get(|| async { "ok" }));

        let addr = format!("0.0.0.0:{port}");
        tracing::info!(addr = %addr, "starting findata-core HTTP server");

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
    } else {
        tracing::info!("starting findata-core MCP server (stdio)");

        let server = FinDataServer::new(ctx);
        let service = server.serve(rmcp::transport::stdio()).await?;
        service.waiting().await?;
    }

    Ok(())
}
