//! Secondary bars provider, consulted when the primary vendor fails
//! permanently or its breaker is open (spec §4.6 priority table).
//!
//! Uses Stooq's free, keyless CSV endpoint — no credential gate, unlike
//! the primary. Kept as a distinct provider rather than a retry of
//! Tiingo so the fallback genuinely diversifies the upstream (spec §9
//! "duck-typed provider interchangeability ... replace with capability
//! interfaces and a provider registry").

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::CoreError;

use super::{build_http_client, Bar, BarInterval, BarsProvider};

const TIMEOUT_SECS: u64 = 15;

pub struct SecondaryBarsProvider {
    client: reqwest::Client,
}

impl Default for SecondaryBarsProvider {
    fn default() -> Self {
        Self {
            client: build_http_client(Duration::from_secs(TIMEOUT_SECS)),
        }
    }
}

#[async_trait]
impl BarsProvider for SecondaryBarsProvider {
    fn name(&self) -> &'static str {
        "stooq_secondary"
    }

    async fn get_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: BarInterval,
    ) -> Result<Vec<Bar>, CoreError> {
        if interval != BarInterval::Daily {
            return Err(CoreError::InvalidInput(
                "stooq_secondary only supports daily bars".into(),
            ));
        }

        let url = format!("https://stooq.com/q/d/l/?s={}&i=d", symbol.to_lowercase());
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| crate::error::transient("stooq_secondary", e))?;

        if resp.status().is_server_error() {
            return Err(crate::error::transient(
                "stooq_secondary",
                format!("status {}", resp.status()),
            ));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| crate::error::transient("stooq_secondary", e))?;

        let mut bars = Vec::new();
        for line in body.lines().skip(1) {
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() < 6 {
                continue;
            }
            let Ok(date) = NaiveDate::parse_from_str(fields[0], "%Y-%m-%d") else {
                continue;
            };
            if date < start || date > end {
                continue;
            }
            let (Ok(open), Ok(high), Ok(low), Ok(close), Ok(volume)) = (
                fields[1].parse(),
                fields[2].parse(),
                fields[3].parse(),
                fields[4].parse(),
                fields[5].parse(),
            ) else {
                continue;
            };
            bars.push(Bar {
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        if bars.is_empty() {
            return Err(CoreError::not_found(format!(
                "no bars for {symbol} in range {start}..{end}"
            )));
        }
        Ok(bars)
    }
}
