//! `mcp_price_cache` repository (spec §3 `StoredRecord::PriceBar`).
//!
//! Unique on `(symbol, date)`. `bulkUpsert` is a single transaction,
//! all-or-nothing (spec §5).

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::stocks::{market_from_str, market_str};
use super::{map_sqlite_err, now_rfc3339, BulkWriteError, StoreSession};
use crate::error::CoreError;
use crate::keys::Market;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub symbol: String,
    pub market: Market,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Default, Clone)]
pub struct PriceBarPredicate {
    pub symbol: Option<String>,
    pub market: Option<Market>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

pub struct PriceBarsRepo {
    session: StoreSession,
}

impl PriceBarsRepo {
    pub fn new(session: StoreSession) -> Self {
        Self { session }
    }

    pub fn get_by_key(
        &self,
        symbol: &str,
        market: Market,
        date: NaiveDate,
    ) -> Result<Option<PriceBar>, CoreError> {
        self.session
            .conn
            .query_row(
                "SELECT symbol, market, date, open, high, low, close, volume \
                 FROM mcp_price_cache WHERE symbol = ?1 AND market = ?2 AND date = ?3",
                params![symbol, market_str(market), date.to_string()],
                row_to_bar,
            )
            .optional()
            .map_err(map_sqlite_err)
    }

    pub fn upsert(&self, bar: &PriceBar) -> Result<(), CoreError> {
        let now = now_rfc3339();
        self.session
            .conn
            .execute(
                "INSERT INTO mcp_price_cache (symbol, market, date, open, high, low, close, volume, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9) \
                 ON CONFLICT(symbol, market, date) DO UPDATE SET \
                   open = excluded.open, high = excluded.high, low = excluded.low, \
                   close = excluded.close, volume = excluded.volume, updated_at = excluded.updated_at",
                params![
                    bar.symbol,
                    market_str(bar.market),
                    bar.date.to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                    now,
                ],
            )
            .map_err(map_sqlite_err)?;
        Ok(())
    }

    /// All-or-nothing (spec §5): a single transaction for the whole batch.
    pub fn bulk_upsert(&mut self, bars: &[PriceBar]) -> Result<(), BulkWriteError> {
        let tx = self
            .session
            .conn
            .transaction()
            .map_err(|e| BulkWriteError {
                first_failing: 0,
                count: bars.len(),
                message: e.to_string(),
            })?;
        let now = now_rfc3339();

        for (i, bar) in bars.iter().enumerate() {
            let result = tx.execute(
                "INSERT INTO mcp_price_cache (symbol, market, date, open, high, low, close, volume, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9) \
                 ON CONFLICT(symbol, market, date) DO UPDATE SET \
                   open = excluded.open, high = excluded.high, low = excluded.low, \
                   close = excluded.close, volume = excluded.volume, updated_at = excluded.updated_at",
                params![
                    bar.symbol,
                    market_str(bar.market),
                    bar.date.to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                    now,
                ],
            );
            if let Err(e) = result {
                return Err(BulkWriteError {
                    first_failing: i,
                    count: bars.len(),
                    message: e.to_string(),
                });
            }
        }

        tx.commit().map_err(|e| BulkWriteError {
            first_failing: bars.len(),
            count: bars.len(),
            message: e.to_string(),
        })
    }

    /// Ordered `(symbol ASC, date DESC)` unless the caller asks otherwise
    /// (spec §4.3).
    pub fn query_by(&self, predicate: &PriceBarPredicate) -> Result<Vec<PriceBar>, CoreError> {
        let mut sql = String::from(
            "SELECT symbol, market, date, open, high, low, close, volume FROM mcp_price_cache WHERE 1=1",
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(symbol) = &predicate.symbol {
            sql.push_str(" AND symbol = ?");
            args.push(Box::new(symbol.clone()));
        }
        if let Some(market) = predicate.market {
            sql.push_str(" AND market = ?");
            args.push(Box::new(market_str(market).to_string()));
        }
        if let Some(start) = predicate.start {
            sql.push_str(" AND date >= ?");
            args.push(Box::new(start.to_string()));
        }
        if let Some(end) = predicate.end {
            sql.push_str(" AND date <= ?");
            args.push(Box::new(end.to_string()));
        }
        sql.push_str(" ORDER BY symbol ASC, date DESC");

        let mut stmt = self.session.conn.prepare(&sql).map_err(map_sqlite_err)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(AsRef::as_ref).collect();
        let rows = stmt
            .query_map(params_refs.as_slice(), row_to_bar)
            .map_err(map_sqlite_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(map_sqlite_err)
    }
}

fn row_to_bar(row: &rusqlite::Row<'_>) -> rusqlite::Result<PriceBar> {
    let market_s: String = row.get(1)?;
    let date_s: String = row.get(2)?;
    Ok(PriceBar {
        symbol: row.get(0)?,
        market: market_from_str(&market_s).unwrap_or(Market::Us),
        date: NaiveDate::parse_from_str(&date_s, "%Y-%m-%d").unwrap_or_default(),
        open: row.get(3)?,
        high: row.get(4)?,
        low: row.get(5)?,
        close: row.get(6)?,
        volume: row.get(7)?,
    })
}
