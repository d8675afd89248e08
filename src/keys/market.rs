//! `Market` identity (spec §3) — suffix-keyed, immutable once configured.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    Us,
    Nse,
    Bse,
    Lse,
    Tse,
    Hkex,
}

/// Static attributes for a `Market`. Looked up by suffix match (spec §3);
/// a symbol without a known suffix resolves to `US`.
#[derive(Debug, Clone, Copy)]
pub struct MarketAttrs {
    pub market: Market,
    pub iso_country: &'static str,
    pub currency: &'static str,
    pub timezone: &'static str,
    /// Local trading-hours window, `(open, close)` in market-local time.
    pub trading_hours: (&'static str, &'static str),
    /// The India-style price-band percentage (spec §9: a pure calculation
    /// owned by surrounding code, carried here only as descriptive data —
    /// not the system-level circuit breaker of §4.4).
    pub circuit_breaker_pct: Option<f64>,
    pub settlement_cycle: &'static str,
    pub symbol_suffix: Option<&'static str>,
    pub calendar_name: &'static str,
}

const MARKETS: &[MarketAttrs] = &[
    MarketAttrs {
        market: Market::Us,
        iso_country: "US",
        currency: "USD",
        timezone: "America/New_York",
        trading_hours: ("09:30", "16:00"),
        circuit_breaker_pct: None,
        settlement_cycle: "T+1",
        symbol_suffix: None,
        calendar_name: "NYSE",
    },
    MarketAttrs {
        market: Market::Nse,
        iso_country: "IN",
        currency: "INR",
        timezone: "Asia/Kolkata",
        trading_hours: ("09:15", "15:30"),
        circuit_breaker_pct: Some(10.0),
        settlement_cycle: "T+1",
        symbol_suffix: Some(".NS"),
        calendar_name: "NSE",
    },
    MarketAttrs {
        market: Market::Bse,
        iso_country: "IN",
        currency: "INR",
        timezone: "Asia/Kolkata",
        trading_hours: ("09:15", "15:30"),
        circuit_breaker_pct: Some(10.0),
        settlement_cycle: "T+1",
        symbol_suffix: Some(".BO"),
        calendar_name: "BSE",
    },
    MarketAttrs {
        market: Market::Lse,
        iso_country: "GB",
        currency: "GBP",
        timezone: "Europe/London",
        trading_hours: ("08:00", "16:30"),
        circuit_breaker_pct: None,
        settlement_cycle: "T+2",
        symbol_suffix: Some(".L"),
        calendar_name: "LSE",
    },
    MarketAttrs {
        market: Market::Tse,
        iso_country: "JP",
        currency: "JPY",
        timezone: "Asia/Tokyo",
        trading_hours: ("09:00", "15:00"),
        circuit_breaker_pct: None,
        settlement_cycle: "T+2",
        symbol_suffix: Some(".T"),
        calendar_name: "TSE",
    },
    MarketAttrs {
        market: Market::Hkex,
        iso_country: "HK",
        currency: "HKD",
        timezone: "Asia/Hong_Kong",
        trading_hours: ("09:30", "16:00"),
        circuit_breaker_pct: None,
        settlement_cycle: "T+2",
        symbol_suffix: Some(".HK"),
        calendar_name: "HKEX",
    },
];

impl Market {
    pub fn attrs(self) -> &'static MarketAttrs {
        MARKETS
            .iter()
            .find(|m| m.market == self)
            .expect("every Market variant has a MARKETS entry")
    }
}

/// Result of normalizing a raw ticker string: the detected market and the
/// suffix-stripped, upcased symbol (spec §3 `CanonicalSymbol`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSymbol {
    pub market: Market,
    pub raw_symbol: String,
}

/// Detect `Market` from a raw symbol by suffix (spec §4.1). Empty symbols
/// and symbols with characters outside `[A-Z0-9.\-]` after upcasing are
/// rejected as `InvalidInput`.
pub fn symbol_to_market(raw: &str) -> Result<CanonicalSymbol, CoreError> {
    if raw.trim().is_empty() {
        return Err(CoreError::InvalidInput("symbol must not be empty".into()));
    }
    let upper = raw.trim().to_uppercase();
    if !upper
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(CoreError::InvalidInput(format!(
            "symbol '{raw}' contains characters outside [A-Z0-9.-]"
        )));
    }

    for attrs in MARKETS {
        if let Some(suffix) = attrs.symbol_suffix {
            if let Some(stripped) = upper.strip_suffix(suffix) {
                if stripped.is_empty() {
                    return Err(CoreError::InvalidInput(format!(
                        "symbol '{raw}' is only a market suffix"
                    )));
                }
                return Ok(CanonicalSymbol {
                    market: attrs.market,
                    raw_symbol: stripped.to_string(),
                });
            }
        }
    }

    // No suffix matched: default to US (spec §3, §4.1, §8 property 2).
    Ok(CanonicalSymbol {
        market: Market::Us,
        raw_symbol: upper,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_suffix_defaults_to_us() {
        let sym = symbol_to_market("aapl").unwrap();
        assert_eq!(sym.market, Market::Us);
        assert_eq!(sym.raw_symbol, "AAPL");
    }

    #[test]
    fn every_configured_suffix_resolves_to_its_market() {
        for attrs in MARKETS {
            let Some(suffix) = attrs.symbol_suffix else {
                continue;
            };
            let raw = format!("ANY{suffix}");
            let sym = symbol_to_market(&raw).unwrap();
            assert_eq!(sym.market, attrs.market, "suffix {suffix} mismatch");
        }
    }

    #[test]
    fn empty_symbol_is_invalid() {
        assert!(matches!(
            symbol_to_market(""),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            symbol_to_market("   "),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn invalid_characters_are_rejected() {
        assert!(matches!(
            symbol_to_market("AAPL$"),
            Err(CoreError::InvalidInput(_))
        ));
    }
}
