//! Ordered fallback chain (spec §4.4.3).
//!
//! Consulted after the primary call fails with a retryable or open-circuit
//! error. The first strategy whose `can_execute` returns true is invoked;
//! later ones are tried only if it itself fails. Strategies never mutate
//! the chain.

use async_trait::async_trait;

use crate::error::CoreError;

#[async_trait]
pub trait FallbackStrategy<Ctx: Send + Sync, T: Send>: Send + Sync {
    fn name(&self) -> &str;
    async fn can_execute(&self, ctx: &Ctx) -> bool;
    async fn execute(&self, ctx: &Ctx) -> Result<T, CoreError>;
}

pub struct FallbackChain<Ctx: Send + Sync, T: Send> {
    strategies: Vec<Box<dyn FallbackStrategy<Ctx, T>>>,
}

impl<Ctx: Send + Sync, T: Send> Default for FallbackChain<Ctx, T> {
    fn default() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }
}

impl<Ctx: Send + Sync, T: Send> FallbackChain<Ctx, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, strategy: Box<dyn FallbackStrategy<Ctx, T>>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Runs the chain, returning the first strategy's successful result.
    /// If every eligible strategy fails, returns `UpstreamUnavailable`
    /// naming each attempted strategy (spec §4.6 "error escalation").
    pub async fn run(&self, ctx: &Ctx, capability: &str) -> Result<T, CoreError> {
        let mut attempts = Vec::new();
        for strategy in &self.strategies {
            if !strategy.can_execute(ctx).await {
                continue;
            }
            match strategy.execute(ctx).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempts.push(format!("{}: {err}", strategy.name()));
                    if matches!(err, CoreError::NotFound { .. }) {
                        continue;
                    }
                }
            }
        }
        if attempts.is_empty() {
            Err(CoreError::not_found(format!(
                "no eligible fallback strategy for {capability}"
            )))
        } else {
            Err(CoreError::UpstreamUnavailable {
                capability: capability.to_string(),
                attempts,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFails;
    #[async_trait]
    impl FallbackStrategy<(), i32> for AlwaysFails {
        fn name(&self) -> &str {
            "always_fails"
        }
        async fn can_execute(&self, _ctx: &()) -> bool {
            true
        }
        async fn execute(&self, _ctx: &()) -> Result<i32, CoreError> {
            Err(crate::error::transient("x", "no"))
        }
    }

    struct Succeeds(i32);
    #[async_trait]
    impl FallbackStrategy<(), i32> for Succeeds {
        fn name(&self) -> &str {
            "succeeds"
        }
        async fn can_execute(&self, _ctx: &()) -> bool {
            true
        }
        async fn execute(&self, _ctx: &()) -> Result<i32, CoreError> {
            Ok(self.0)
        }
    }

    struct Ineligible;
    #[async_trait]
    impl FallbackStrategy<(), i32> for Ineligible {
        fn name(&self) -> &str {
            "ineligible"
        }
        async fn can_execute(&self, _ctx: &()) -> bool {
            false
        }
        async fn execute(&self, _ctx: &()) -> Result<i32, CoreError> {
            Ok(-1)
        }
    }

    #[tokio::test]
    async fn first_eligible_success_wins() {
        let chain = FallbackChain::new()
            .push(Box::new(Ineligible))
            .push(Box::new(AlwaysFails))
            .push(Box::new(Succeeds(7)));
        assert_eq!(chain.run(&(), "bars").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn all_fail_returns_upstream_unavailable() {
        let chain: FallbackChain<(), i32> =
            FallbackChain::new().push(Box::new(AlwaysFails)).push(Box::new(AlwaysFails));
        let err = chain.run(&(), "bars").await.unwrap_err();
        assert!(matches!(err, CoreError::UpstreamUnavailable { .. }));
    }

    #[tokio::test]
    async fn no_eligible_strategy_returns_not_found() {
        let chain: FallbackChain<(), i32> = FallbackChain::new().push(Box::new(Ineligible));
        let err = chain.run(&(), "bars").await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
