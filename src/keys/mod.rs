//! C1 — Key & Namespace Registry (spec §4.1).
//!
//! Canonicalizes logical identities and produces versioned cache keys.
//! Nothing outside this module constructs a `CacheKey` from raw strings.

pub mod cache_key;
pub mod market;

pub use cache_key::{
    ai_derivative_key, bars_key, fx_key, news_key, transcript_key, validate_fiscal_year, CacheKey,
    Quarter,
};
pub use market::{symbol_to_market, CanonicalSymbol, Market, MarketAttrs};
