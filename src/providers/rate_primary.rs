//! Primary FX provider (spec §6 `EXCHANGE_RATE_API_KEY`).

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::CoreError;

use super::{build_http_client, RateProvider};

const BASE_URL: &str = "https://v6.exchangerate-api.com/v6";
const TIMEOUT_SECS: u64 = 10;

pub struct PrimaryRateProvider {
    client: reqwest::Client,
    api_key: String,
}

impl PrimaryRateProvider {
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("EXCHANGE_RATE_API_KEY").ok()?;
        if api_key.is_empty() {
            return None;
        }
        Some(Self {
            client: build_http_client(Duration::from_secs(TIMEOUT_SECS)),
            api_key,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PairResponse {
    result: String,
    conversion_rate: Option<f64>,
}

#[async_trait]
impl RateProvider for PrimaryRateProvider {
    fn name(&self) -> &'static str {
        "exchangerate_api_primary"
    }

    async fn get_rate(
        &self,
        from: &str,
        to: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<(f64, String), CoreError> {
        if as_of.is_some() {
            // This vendor's free tier only exposes the latest rate; historical
            // requests fall through to the secondary/approximate providers.
            return Err(CoreError::not_found(
                "exchangerate_api_primary does not support historical dates",
            ));
        }

        let url = format!("{BASE_URL}/{}/pair/{from}/{to}", self.api_key);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| crate::error::transient("exchangerate_api_primary", e))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CoreError::QuotaExceeded {
                endpoint: "exchangerate_api_primary".into(),
                retry_after_secs: 60,
            });
        }
        if resp.status().is_server_error() {
            return Err(crate::error::transient(
                "exchangerate_api_primary",
                format!("status {}", resp.status()),
            ));
        }

        let parsed: PairResponse = resp
            .json()
            .await
            .map_err(|e| crate::error::transient("exchangerate_api_primary", e))?;

        if parsed.result != "success" {
            return Err(CoreError::not_found(format!("no rate for {from}/{to}")));
        }
        let rate = parsed
            .conversion_rate
            .ok_or_else(|| CoreError::not_found(format!("no rate for {from}/{to}")))?;

        Ok((rate, "exchangerate_api_primary".to_string()))
    }
}
