//! Company investor-relations page scraper (spec §4.6 priority table,
//! first scrape tier for transcripts).
//!
//! Selectors are declarative, taken from C3's `IrMapping` row rather than
//! hardcoded, so a config push — not a code change — fixes a selector
//! broken by an upstream HTML change (spec §9).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::error::CoreError;
use crate::store::Store;

use super::{build_http_client, validate_transcript_parse, TranscriptProvider, TranscriptText};

const TIMEOUT_SECS: u64 = 30;

pub struct IrScrapeProvider {
    client: reqwest::Client,
    store: Arc<Store>,
}

impl IrScrapeProvider {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            client: build_http_client(Duration::from_secs(TIMEOUT_SECS)),
            store,
        }
    }
}

#[async_trait]
impl TranscriptProvider for IrScrapeProvider {
    fn name(&self) -> &'static str {
        "ir_website"
    }

    async fn get_transcript(
        &self,
        symbol: &str,
        quarter: &str,
        fiscal_year: i32,
    ) -> Result<TranscriptText, CoreError> {
        let mapping = self
            .store
            .ir_mappings()?
            .get(symbol)?
            .ok_or_else(|| CoreError::not_found(format!("no IR mapping configured for {symbol}")))?;

        if !mapping.is_active {
            return Err(CoreError::not_found(format!(
                "IR mapping for {symbol} is marked inactive"
            )));
        }

        let url = mapping
            .concall_url_pattern
            .as_deref()
            .map(|pattern| {
                pattern
                    .replace("{ticker}", symbol)
                    .replace("{quarter}", quarter)
                    .replace("{fy}", &fiscal_year.to_string())
            })
            .unwrap_or_else(|| mapping.ir_base_url.clone());

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| crate::error::transient("ir_website", e))?;

        if resp.status().is_server_error() {
            return Err(crate::error::transient(
                "ir_website",
                format!("status {}", resp.status()),
            ));
        }
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::not_found(format!(
                "IR page not found for {symbol} at {url}"
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| crate::error::transient("ir_website", e))?;

        let text = extract_section(&body, mapping.concall_section_css.as_deref());

        if !validate_transcript_parse(&text, symbol, Some(&mapping.company_name)) {
            return Err(CoreError::InvalidInput(format!(
                "parsed IR page for {symbol} failed transcript validation (word count, entity mention, or role token missing)"
            )));
        }

        Ok(TranscriptText {
            text,
            source_url: url,
            source_tag: "IR_WEBSITE".to_string(),
        })
    }
}

/// Extracts the transcript section using the configured CSS selector,
/// falling back to the whole document's text when no selector is set or
/// it matches nothing — the parser invariant then decides whether the
/// result is usable.
fn extract_section(html: &str, css: Option<&str>) -> String {
    let document = Html::parse_document(html);

    if let Some(css) = css {
        if let Ok(selector) = Selector::parse(css) {
            let joined: String = document
                .select(&selector)
                .flat_map(|el| el.text())
                .collect::<Vec<_>>()
                .join(" ");
            if !joined.trim().is_empty() {
                return joined;
            }
        }
    }

    document.root_element().text().collect::<Vec<_>>().join(" ")
}
