//! Secondary FX provider: a public market-quote venue used when the
//! primary FX API fails permanently (spec §4.6 priority table).

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::CoreError;

use super::{build_http_client, RateProvider};

const TIMEOUT_SECS: u64 = 10;

pub struct SecondaryRateProvider {
    client: reqwest::Client,
}

impl Default for SecondaryRateProvider {
    fn default() -> Self {
        Self {
            client: build_http_client(Duration::from_secs(TIMEOUT_SECS)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FrankfurterResponse {
    rates: std::collections::HashMap<String, f64>,
}

#[async_trait]
impl RateProvider for SecondaryRateProvider {
    fn name(&self) -> &'static str {
        "frankfurter_secondary"
    }

    async fn get_rate(
        &self,
        from: &str,
        to: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<(f64, String), CoreError> {
        let date_segment = as_of.map(|d| d.to_string()).unwrap_or_else(|| "latest".to_string());
        let url = format!("https://api.frankfurter.app/{date_segment}?from={from}&to={to}");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| crate::error::transient("frankfurter_secondary", e))?;

        if resp.status().is_server_error() {
            return Err(crate::error::transient(
                "frankfurter_secondary",
                format!("status {}", resp.status()),
            ));
        }
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::not_found(format!("no rate for {from}/{to}")));
        }

        let parsed: FrankfurterResponse = resp
            .json()
            .await
            .map_err(|e| crate::error::transient("frankfurter_secondary", e))?;

        let rate = parsed
            .rates
            .get(to)
            .copied()
            .ok_or_else(|| CoreError::not_found(format!("no rate for {from}/{to}")))?;

        Ok((rate, "frankfurter_secondary".to_string()))
    }
}
