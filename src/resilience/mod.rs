//! C4 — Resilience Layer (spec §4.4).
//!
//! Wraps outbound calls in a circuit breaker keyed by endpoint identity, a
//! retry policy, a fallback chain, and a single-flight deduplicator keyed
//! by logical cache key.

pub mod breaker;
pub mod fallback;
pub mod retry;
pub mod single_flight;

pub use breaker::{BreakerConfig, CircuitState, EndpointRegistry};
pub use fallback::{FallbackChain, FallbackStrategy};
pub use retry::RetryPolicy;
pub use single_flight::SingleFlightGate;

use crate::error::CoreError;

/// Convenience wrapper combining breaker + retry for one outbound call,
/// the shape most provider call sites need (spec §4.4 "wrap any outbound
/// call in (a) ... (b) ...").
pub struct Guarded<'a> {
    pub breaker: &'a EndpointRegistry,
    pub retry: RetryPolicy,
}

impl<'a> Guarded<'a> {
    pub fn new(breaker: &'a EndpointRegistry, retry: RetryPolicy) -> Self {
        Self { breaker, retry }
    }

    /// Checks the breaker, runs `f` under the retry policy, and reports
    /// the outcome back to the breaker. An exhausted retry sequence
    /// counts as exactly one breaker failure (spec §4.4.2).
    pub async fn call<F, Fut, T>(&self, endpoint: &str, f: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        self.breaker.allow(endpoint)?;
        match self.retry.run(f).await {
            Ok(value) => {
                self.breaker.record_success(endpoint);
                Ok(value)
            }
            Err(err) => {
                if err.counts_as_breaker_failure() {
                    self.breaker.record_failure(endpoint);
                }
                Err(err)
            }
        }
    }
}
