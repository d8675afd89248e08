//! Aggregator-site scraper, last scrape tier for transcripts (spec §4.6
//! priority table). Aggregator sites frequently publish the transcript as
//! a linked PDF rather than inline HTML, so this provider tries PDF
//! extraction first and falls back to HTML section scraping.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::error::CoreError;

use super::{build_http_client, validate_transcript_parse, TranscriptProvider, TranscriptText};

const TIMEOUT_SECS: u64 = 45;
const AGGREGATOR_BASE: &str = "https://www.screener.in/concalls";

pub struct AggregatorScrapeProvider {
    client: reqwest::Client,
}

impl Default for AggregatorScrapeProvider {
    fn default() -> Self {
        Self {
            client: build_http_client(Duration::from_secs(TIMEOUT_SECS)),
        }
    }
}

#[async_trait]
impl TranscriptProvider for AggregatorScrapeProvider {
    fn name(&self) -> &'static str {
        "aggregator_site"
    }

    async fn get_transcript(
        &self,
        symbol: &str,
        quarter: &str,
        fiscal_year: i32,
    ) -> Result<TranscriptText, CoreError> {
        let url = format!("{AGGREGATOR_BASE}/{symbol}/{fiscal_year}/{quarter}");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| crate::error::transient("aggregator_site", e))?;

        if resp.status().is_server_error() {
            return Err(crate::error::transient(
                "aggregator_site",
                format!("status {}", resp.status()),
            ));
        }
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::not_found(format!(
                "no aggregator entry for {symbol} {quarter} FY{fiscal_year}"
            )));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| crate::error::transient("aggregator_site", e))?;

        let text = if content_type.contains("pdf") {
            pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| crate::error::transient("aggregator_site", e))?
        } else {
            let html = String::from_utf8_lossy(&bytes).to_string();
            let document = Html::parse_document(&html);
            let selector = Selector::parse(".concall-transcript, article, main")
                .expect("static selector is always valid");
            document
                .select(&selector)
                .flat_map(|el| el.text())
                .collect::<Vec<_>>()
                .join(" ")
        };

        if !validate_transcript_parse(&text, symbol, None) {
            return Err(CoreError::InvalidInput(format!(
                "parsed aggregator content for {symbol} failed transcript validation"
            )));
        }

        Ok(TranscriptText {
            text,
            source_url: url,
            source_tag: "AGGREGATOR_SITE".to_string(),
        })
    }
}
