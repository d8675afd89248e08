//! Exchange-filing scraper, second scrape tier for transcripts (spec
//! §4.6 priority table). Pulls from the exchange's public filings search
//! rather than the company's own site, reusing the same declarative
//! selector and parse-validation pattern as `transcript_ir_scrape`.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::error::CoreError;
use crate::keys::{symbol_to_market, Market};

use super::{build_http_client, validate_transcript_parse, TranscriptProvider, TranscriptText};

const TIMEOUT_SECS: u64 = 30;

fn filings_search_url(market: Market, symbol: &str, quarter: &str, fiscal_year: i32) -> Option<String> {
    let base = match market {
        Market::Nse => "https://www.nseindia.com/companies-listing/corporate-filings-event-calendar",
        Market::Bse => "https://www.bseindia.com/corporates/ann.aspx",
        Market::Lse => "https://www.londonstockexchange.com/news",
        Market::Hkex => "https://www1.hkexnews.hk/search",
        Market::Tse => "https://www.jpx.co.jp/english/listing/disclosure",
        Market::Us => return None,
    };
    Some(format!("{base}?symbol={symbol}&quarter={quarter}&fy={fiscal_year}"))
}

pub struct ExchangeScrapeProvider {
    client: reqwest::Client,
}

impl Default for ExchangeScrapeProvider {
    fn default() -> Self {
        Self {
            client: build_http_client(Duration::from_secs(TIMEOUT_SECS)),
        }
    }
}

#[async_trait]
impl TranscriptProvider for ExchangeScrapeProvider {
    fn name(&self) -> &'static str {
        "exchange_filing"
    }

    async fn get_transcript(
        &self,
        symbol: &str,
        quarter: &str,
        fiscal_year: i32,
    ) -> Result<TranscriptText, CoreError> {
        let canonical = symbol_to_market(symbol)?;
        let url = filings_search_url(canonical.market, &canonical.raw_symbol, quarter, fiscal_year)
            .ok_or_else(|| {
                CoreError::not_found(format!(
                    "no exchange filings search configured for market {:?}",
                    canonical.market
                ))
            })?;

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| crate::error::transient("exchange_filing", e))?;

        if resp.status().is_server_error() {
            return Err(crate::error::transient(
                "exchange_filing",
                format!("status {}", resp.status()),
            ));
        }
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::not_found(format!(
                "no exchange filing found for {symbol} {quarter} FY{fiscal_year}"
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| crate::error::transient("exchange_filing", e))?;

        let document = Html::parse_document(&body);
        let selector = Selector::parse("article, .filing-content, main")
            .expect("static selector is always valid");
        let text = document
            .select(&selector)
            .flat_map(|el| el.text())
            .collect::<Vec<_>>()
            .join(" ");

        if !validate_transcript_parse(&text, &canonical.raw_symbol, None) {
            return Err(CoreError::InvalidInput(format!(
                "parsed exchange filing for {symbol} failed transcript validation"
            )));
        }

        Ok(TranscriptText {
            text,
            source_url: url,
            source_tag: "EXCHANGE_FILING".to_string(),
        })
    }
}
