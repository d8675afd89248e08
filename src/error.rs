//! Typed error taxonomy (spec §7).
//!
//! Every boundary-facing operation (provider methods, resolver methods,
//! tool handlers) returns `CoreError`. Internal plumbing (file IO, SQL,
//! JSON) keeps using `anyhow::Result` and is converted at the boundary.

use std::fmt;

use thiserror::Error;

fn fmt_hint(hint: &Option<String>) -> String {
    match hint {
        Some(h) => format!(" ({h})"),
        None => String::new(),
    }
}

/// The error taxonomy from spec §7. Each variant carries exactly the
/// context a caller needs to render a stable, human-readable message —
/// no raw stack traces, no upstream response bodies.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Caller error. Never retried, never counted for breakers.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The fact does not exist (e.g. no transcript published yet).
    #[error("not found: {message}{}", fmt_hint(hint))]
    NotFound { message: String, hint: Option<String> },

    /// Retryable. Counted for breaker purposes.
    #[error("transient error calling {endpoint}: {message}")]
    Transient { endpoint: String, message: String },

    /// Retried per policy, then treated as transient for breaker counting,
    /// but logged and reported distinctly.
    #[error("quota exceeded calling {endpoint}, retry after {retry_after_secs}s")]
    QuotaExceeded {
        endpoint: String,
        retry_after_secs: u64,
    },

    /// Breaker fail-fast. Not counted as a fresh provider fault.
    #[error("circuit open for endpoint {endpoint}")]
    CircuitOpen { endpoint: String },

    /// Every provider for a capability failed.
    #[error("all providers failed for {capability}: {}", attempts.join("; "))]
    UpstreamUnavailable {
        capability: String,
        attempts: Vec<String>,
    },

    /// Non-fatal: the response includes the successful portion and a
    /// description of what is missing.
    #[error("partial result: missing {missing}")]
    Partial { missing: String },

    /// Configuration/schema errors. Aborts startup.
    #[error("fatal configuration error: {0}")]
    Fatal(String),
}

impl CoreError {
    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound {
            message: message.into(),
            hint: None,
        }
    }

    pub fn not_found_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CoreError::NotFound {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    /// Classification used by the resilience layer to decide whether a
    /// failure counts against a circuit breaker (spec §4.4.1, §7).
    pub fn counts_as_breaker_failure(&self) -> bool {
        matches!(
            self,
            CoreError::Transient { .. } | CoreError::QuotaExceeded { .. }
        )
    }

    /// Whether the resilience layer should retry this error at all
    /// (spec §4.4.2). `InvalidInput`, `NotFound`, `CircuitOpen` and
    /// `Fatal` are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Transient { .. } | CoreError::QuotaExceeded { .. }
        )
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            CoreError::Transient { endpoint, .. }
            | CoreError::QuotaExceeded { endpoint, .. }
            | CoreError::CircuitOpen { endpoint } => Some(endpoint),
            _ => None,
        }
    }
}

/// Wraps an opaque internal (`anyhow`) failure as a `Transient` error at a
/// named endpoint, the conversion point between internal plumbing and the
/// boundary taxonomy.
pub fn transient(endpoint: impl Into<String>, err: impl fmt::Display) -> CoreError {
    CoreError::Transient {
        endpoint: endpoint.into(),
        message: err.to_string(),
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
