//! C5 — Provider Clients (spec §4.5).

pub mod bars_secondary;
pub mod bars_tiingo;
pub mod embedder;
pub mod llm_gateway;
pub mod news;
pub mod rate_approximate;
pub mod rate_primary;
pub mod rate_secondary;
pub mod semantic_search;
pub mod traits;
pub mod transcript_aggregator_scrape;
pub mod transcript_exchange_scrape;
pub mod transcript_ir_scrape;

pub use traits::*;

use std::time::Duration;

/// One `reqwest::Client` per provider, each with its own timeout (spec §5
/// "HTTP client pools: one per provider, with its own timeouts and TLS
/// settings"), following the teacher's `Client::builder().timeout(...).build()`
/// construction style in `EodhdProvider::from_env`.
pub fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("reqwest client construction with static config cannot fail")
}

/// Parser invariant shared by every transcript-scraping provider (spec
/// §4.5): a successful parse must yield at least 500 words, a mention of
/// the symbol or company name, and at least one management role token.
/// Parses that fail this are rejected so the caller falls through to the
/// next provider. Grounded on the teacher's shared free-function parsing
/// helpers in `data/eodhd.rs` (`normalize_rows`-style validators kept
/// separate from the HTTP call itself).
pub fn validate_transcript_parse(text: &str, symbol: &str, company_name: Option<&str>) -> bool {
    const ROLE_TOKENS: &[&str] = &["CEO", "CFO", "MD", "Managing Director", "Chief Executive", "Chief Financial"];

    let word_count = text.split_whitespace().count();
    if word_count < 500 {
        return false;
    }

    let haystack = text.to_uppercase();
    let mentions_entity = haystack.contains(&symbol.to_uppercase())
        || company_name
            .map(|name| haystack.contains(&name.to_uppercase()))
            .unwrap_or(false);
    if !mentions_entity {
        return false;
    }

    ROLE_TOKENS
        .iter()
        .any(|token| haystack.contains(&token.to_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text(body: &str) -> String {
        let filler = "word ".repeat(500);
        format!("{filler} {body}")
    }

    #[test]
    fn rejects_short_text() {
        assert!(!validate_transcript_parse("too short CEO RELIANCE", "RELIANCE", None));
    }

    #[test]
    fn rejects_missing_entity_mention() {
        let text = long_text("our CEO discussed the quarter");
        assert!(!validate_transcript_parse(&text, "TOTALLYUNRELATED", None));
    }

    #[test]
    fn rejects_missing_role_token() {
        let text = long_text("RELIANCE had a great quarter, said the team");
        assert!(!validate_transcript_parse(&text, "RELIANCE", None));
    }

    #[test]
    fn accepts_valid_transcript() {
        let text = long_text("RELIANCE Industries Q1 call: our CEO Mukesh Ambani said revenue grew");
        assert!(validate_transcript_parse(&text, "RELIANCE", Some("Reliance Industries")));
    }
}
