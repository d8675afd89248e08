//! Approximate-table fallback (spec §4.6 priority table, last resort).
//!
//! A small static table of recent average rates, used only when both live
//! FX providers fail. Always returns `Partial`-flavored data: callers must
//! not treat this as a precise quote.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::CoreError;

use super::RateProvider;

const APPROXIMATE_RATES: &[(&str, &str, f64)] = &[
    ("USD", "INR", 83.5),
    ("USD", "EUR", 0.92),
    ("USD", "GBP", 0.79),
    ("USD", "JPY", 151.0),
    ("USD", "HKD", 7.8),
    ("EUR", "USD", 1.09),
    ("GBP", "USD", 1.27),
    ("INR", "USD", 1.0 / 83.5),
];

#[derive(Default)]
pub struct ApproximateRateProvider;

#[async_trait]
impl RateProvider for ApproximateRateProvider {
    fn name(&self) -> &'static str {
        "approximate_table"
    }

    async fn get_rate(
        &self,
        from: &str,
        to: &str,
        _as_of: Option<NaiveDate>,
    ) -> Result<(f64, String), CoreError> {
        if from.eq_ignore_ascii_case(to) {
            return Ok((1.0, "approximate_table".to_string()));
        }
        APPROXIMATE_RATES
            .iter()
            .find(|(f, t, _)| f.eq_ignore_ascii_case(from) && t.eq_ignore_ascii_case(to))
            .map(|(_, _, rate)| (*rate, "approximate_table".to_string()))
            .ok_or_else(|| CoreError::not_found(format!("no approximate rate for {from}/{to}")))
    }
}
