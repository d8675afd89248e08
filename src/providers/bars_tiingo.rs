//! Primary bars/quotes provider (spec §6 `TIINGO_API_KEY`).

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use governor::{Quota, RateLimiter};
use serde::Deserialize;

use crate::error::CoreError;

use super::{build_http_client, Bar, BarInterval, BarsProvider};

const BASE_URL: &str = "https://api.tiingo.com/tiingo/daily";
const TIMEOUT_SECS: u64 = 20;

pub struct TiingoBarsProvider {
    client: reqwest::Client,
    api_key: String,
    limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl TiingoBarsProvider {
    /// Returns `None` if `TIINGO_API_KEY` is unset, following the
    /// teacher's `EodhdProvider::from_env` "absent credential disables
    /// this provider" convention.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("TIINGO_API_KEY").ok()?;
        if api_key.is_empty() {
            return None;
        }
        let quota = Quota::per_second(std::num::NonZeroU32::new(5).unwrap());
        Some(Self {
            client: build_http_client(Duration::from_secs(TIMEOUT_SECS)),
            api_key,
            limiter: RateLimiter::direct(quota),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TiingoRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[async_trait]
impl BarsProvider for TiingoBarsProvider {
    fn name(&self) -> &'static str {
        "tiingo_primary"
    }

    async fn get_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: BarInterval,
    ) -> Result<Vec<Bar>, CoreError> {
        self.limiter.until_ready().await;

        let resample_freq = match interval {
            BarInterval::Daily => "daily",
            BarInterval::Weekly => "weekly",
            BarInterval::Monthly => "monthly",
        };

        let url = format!("{BASE_URL}/{symbol}/prices");
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("startDate", start.to_string()),
                ("endDate", end.to_string()),
                ("resampleFreq", resample_freq.to_string()),
                ("token", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| crate::error::transient("tiingo_primary", e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CoreError::QuotaExceeded {
                endpoint: "tiingo_primary".into(),
                retry_after_secs: 60,
            });
        }
        if status.is_server_error() {
            return Err(crate::error::transient(
                "tiingo_primary",
                format!("status {status}"),
            ));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::not_found(format!("no bars for {symbol}")));
        }
        if !status.is_success() {
            return Err(CoreError::InvalidInput(format!(
                "tiingo rejected request for {symbol}: {status}"
            )));
        }

        let rows: Vec<TiingoRow> = resp
            .json()
            .await
            .map_err(|e| crate::error::transient("tiingo_primary", e))?;

        if rows.is_empty() {
            return Err(CoreError::not_found(format!(
                "no bars for {symbol} in range {start}..{end}"
            )));
        }

        rows.into_iter()
            .map(|row| {
                NaiveDate::parse_from_str(&row.date[..10], "%Y-%m-%d")
                    .map(|date| Bar {
                        date,
                        open: row.open,
                        high: row.high,
                        low: row.low,
                        close: row.close,
                        volume: row.volume,
                    })
                    .map_err(|e| crate::error::transient("tiingo_primary", e))
            })
            .collect()
    }
}
