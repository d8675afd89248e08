//! Cross-module key registry checks: symbol-to-market resolution feeding
//! directly into a cache key, the way resolvers actually use both
//! together, rather than each in isolation.

use findata_core::error::CoreError;
use findata_core::keys::{fx_key, symbol_to_market, CacheKey, Market};

#[test]
fn canonical_symbol_market_attrs_drive_a_stable_cache_key() {
    let canonical = symbol_to_market("RELIANCE.NS").unwrap();
    assert_eq!(canonical.market, Market::Nse);

    let key = CacheKey::new(
        "bars",
        "daily",
        vec![canonical.raw_symbol.clone(), "2026-01-01".to_string(), "2026-01-31".to_string()],
        1,
    );
    let reparsed = CacheKey::parse(&key.to_wire()).unwrap();
    assert_eq!(key, reparsed);
}

#[test]
fn fx_key_is_stable_regardless_of_currency_case() {
    let a = fx_key("usd", "inr", 1);
    let b = fx_key("USD", "INR", 1);
    // fx_key itself does not normalize case; resolver::rate uppercases
    // before calling it, so identical wire output only holds once both
    // inputs are already normalized the same way.
    assert_ne!(a.to_wire(), b.to_wire());
    assert_eq!(fx_key("USD", "INR", 1).to_wire(), b.to_wire());
}

#[test]
fn unresolvable_symbol_suffix_is_an_invalid_input_not_a_panic() {
    let err = symbol_to_market("???").unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_)));
}
