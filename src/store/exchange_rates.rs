//! `mcp_exchange_rates` repository (spec §3 `StoredRecord::ExchangeRate`).
//!
//! Unique on `(from_currency, to_currency, date)`. Same-day freshness is
//! enforced by the resolver (spec §4.6), not this repository.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{map_sqlite_err, now_rfc3339, StoreSession};
use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub date: NaiveDate,
    pub rate: f64,
    pub source_tag: String,
}

pub struct ExchangeRatesRepo {
    session: StoreSession,
}

impl ExchangeRatesRepo {
    pub fn new(session: StoreSession) -> Self {
        Self { session }
    }

    pub fn get_by_key(
        &self,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRate>, CoreError> {
        self.session
            .conn
            .query_row(
                "SELECT from_currency, to_currency, date, rate, source_tag \
                 FROM mcp_exchange_rates WHERE from_currency = ?1 AND to_currency = ?2 AND date = ?3",
                params![from_currency, to_currency, date.to_string()],
                row_to_rate,
            )
            .optional()
            .map_err(map_sqlite_err)
    }

    pub fn upsert(&self, rate: &ExchangeRate) -> Result<(), CoreError> {
        let now = now_rfc3339();
        self.session
            .conn
            .execute(
                "INSERT INTO mcp_exchange_rates (from_currency, to_currency, date, rate, source_tag, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) \
                 ON CONFLICT(from_currency, to_currency, date) DO UPDATE SET \
                   rate = excluded.rate, source_tag = excluded.source_tag, updated_at = excluded.updated_at",
                params![
                    rate.from_currency,
                    rate.to_currency,
                    rate.date.to_string(),
                    rate.rate,
                    rate.source_tag,
                    now,
                ],
            )
            .map_err(map_sqlite_err)?;
        Ok(())
    }
}

fn row_to_rate(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExchangeRate> {
    let date_s: String = row.get(2)?;
    Ok(ExchangeRate {
        from_currency: row.get(0)?,
        to_currency: row.get(1)?,
        date: NaiveDate::parse_from_str(&date_s, "%Y-%m-%d").unwrap_or_default(),
        rate: row.get(3)?,
        source_tag: row.get(4)?,
    })
}
