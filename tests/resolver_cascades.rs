//! Cross-module resolver behavior: cache population, provider cascade
//! order, circuit breaker trips, and single-flight dedup, exercised
//! through `resolver::*` against a real (temp-file) store and mock
//! providers rather than unit-level fakes.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;

use findata_core::error::CoreError;
use findata_core::providers::BarInterval;
use findata_core::resolver;

mod common;
use common::*;

#[tokio::test]
async fn bars_cascade_falls_through_to_secondary_provider() {
    let (store, _tmp) = make_test_store();
    let primary = Arc::new(FailingBarsProvider::new("primary"));
    let secondary = Arc::new(FixedBarsProvider::new(
        "secondary",
        vec![sample_bar(NaiveDate::from_ymd_opt(2026, 1, 2).unwrap())],
    ));
    let ctx = make_test_context(
        store,
        vec![primary.clone(), secondary.clone()],
        vec![],
        vec![],
        vec![],
    );

    let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
    let bars = resolver::bars::get_bars(&ctx, "AAPL", start, end, BarInterval::Daily)
        .await
        .unwrap();

    assert_eq!(bars.len(), 1);
    assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn bars_second_request_is_served_from_cache_without_hitting_providers() {
    let (store, _tmp) = make_test_store();
    let provider = Arc::new(FixedBarsProvider::new(
        "only",
        vec![sample_bar(NaiveDate::from_ymd_opt(2026, 1, 2).unwrap())],
    ));
    let ctx = make_test_context(store, vec![provider.clone()], vec![], vec![], vec![]);

    let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();

    resolver::bars::get_bars(&ctx, "AAPL", start, end, BarInterval::Daily)
        .await
        .unwrap();
    resolver::bars::get_bars(&ctx, "AAPL", start, end, BarInterval::Daily)
        .await
        .unwrap();

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn bars_cascade_reports_upstream_unavailable_when_every_provider_fails() {
    let (store, _tmp) = make_test_store();
    let a = Arc::new(FailingBarsProvider::new("a"));
    let b = Arc::new(FailingBarsProvider::new("b"));
    let ctx = make_test_context(store, vec![a, b], vec![], vec![], vec![]);

    let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
    let err = resolver::bars::get_bars(&ctx, "AAPL", start, end, BarInterval::Daily)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::UpstreamUnavailable { .. }));
}

#[tokio::test]
async fn bars_cascade_trips_breaker_after_threshold_then_fails_fast() {
    let (store, _tmp) = make_test_store();
    let failing = Arc::new(FailingBarsProvider::new("flaky"));
    let ctx = make_test_context(store, vec![failing.clone()], vec![], vec![], vec![]);

    let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();

    // fast_breaker_config() trips after 2 failures.
    for _ in 0..2 {
        let _ = resolver::bars::get_bars(&ctx, "AAPL", start, end, BarInterval::Daily).await;
    }
    let calls_before = failing.calls.load(Ordering::SeqCst);

    let err = resolver::bars::get_bars(&ctx, "AAPL", start, end, BarInterval::Daily)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::UpstreamUnavailable { .. }));
    // Breaker should have fast-failed rather than invoking the provider again.
    assert_eq!(failing.calls.load(Ordering::SeqCst), calls_before);
}

#[tokio::test]
async fn concurrent_bars_requests_for_the_same_key_single_flight() {
    let (store, _tmp) = make_test_store();
    let provider = Arc::new(FixedBarsProvider::new(
        "only",
        vec![sample_bar(NaiveDate::from_ymd_opt(2026, 1, 2).unwrap())],
    ));
    let ctx = Arc::new(make_test_context(
        store,
        vec![provider.clone()],
        vec![],
        vec![],
        vec![],
    ));

    let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            resolver::bars::get_bars(&ctx, "AAPL", start, end, BarInterval::Daily).await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rate_cascade_uses_first_provider_and_reports_its_source_tag() {
    let (store, _tmp) = make_test_store();
    let primary = Arc::new(FixedRateProvider {
        name: "primary_fx",
        calls: std::sync::atomic::AtomicU32::new(0),
        rate: 83.5,
    });
    let ctx = make_test_context(store, vec![], vec![primary.clone()], vec![], vec![]);

    let (rate, tag) = resolver::rate::get_rate(&ctx, "USD", "INR").await.unwrap();
    assert_eq!(rate, 83.5);
    assert_eq!(tag, "primary_fx");
}

#[tokio::test]
async fn transcript_cascade_skips_not_found_providers_and_stores_the_hit() {
    let (store, _tmp) = make_test_store();
    let dead_end = Arc::new(NotFoundTranscriptProvider {
        name: "ir_scrape",
        calls: std::sync::atomic::AtomicU32::new(0),
    });
    let live = Arc::new(FixedTranscriptProvider {
        name: "aggregator_scrape",
        calls: std::sync::atomic::AtomicU32::new(0),
        text: "word ".repeat(600),
    });
    let ctx = make_test_context(store, vec![], vec![], vec![], vec![dead_end.clone(), live.clone()]);

    let text = resolver::transcript::get_transcript(&ctx, "RELIANCE.NS", findata_core::keys::Quarter::Q1, 2026, false)
        .await
        .unwrap();

    assert_eq!(dead_end.calls.load(Ordering::SeqCst), 1);
    assert_eq!(live.calls.load(Ordering::SeqCst), 1);
    assert!(text.text.starts_with("word "));

    // Second call must be served from the store (immutable once stored)
    // without touching either provider again.
    let _ = resolver::transcript::get_transcript(&ctx, "RELIANCE.NS", findata_core::keys::Quarter::Q1, 2026, false)
        .await
        .unwrap();
    assert_eq!(live.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_quarter_is_rejected_before_any_provider_is_touched() {
    let (store, _tmp) = make_test_store();
    let provider = Arc::new(FixedTranscriptProvider {
        name: "aggregator_scrape",
        calls: std::sync::atomic::AtomicU32::new(0),
        text: "word ".repeat(600),
    });
    let ctx = make_test_context(store, vec![], vec![], vec![], vec![provider.clone()]);

    let err = findata_core::keys::Quarter::parse("Q9").unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_)));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}
