//! `mcp_stocks` repository (spec §3 `StoredRecord::Stock`).

use rusqlite::{params, OptionalExtension};

use super::{map_sqlite_err, now_rfc3339, BulkWriteError, StoreSession};
use crate::error::CoreError;
use crate::keys::Market;

#[derive(Debug, Clone, PartialEq)]
pub struct Stock {
    pub symbol: String,
    pub market: Market,
    pub country: String,
    pub currency: String,
    pub sector: Option<String>,
    pub active: bool,
    pub indexes: Vec<String>,
}

/// Narrow predicate type for `query_by` (spec §4.3 "never free-form").
#[derive(Debug, Default, Clone)]
pub struct StockPredicate {
    pub market: Option<Market>,
    pub active_only: bool,
    pub sector: Option<String>,
}

pub struct StocksRepo {
    session: StoreSession,
}

pub(crate) fn market_str(m: Market) -> &'static str {
    m.attrs().calendar_name
}

pub(crate) fn market_from_str(s: &str) -> Option<Market> {
    [
        Market::Us,
        Market::Nse,
        Market::Bse,
        Market::Lse,
        Market::Tse,
        Market::Hkex,
    ]
    .into_iter()
    .find(|m| market_str(*m) == s)
}

impl StocksRepo {
    pub fn new(session: StoreSession) -> Self {
        Self { session }
    }

    pub fn get_by_key(&self, symbol: &str, market: Market) -> Result<Option<Stock>, CoreError> {
        self.session
            .conn
            .query_row(
                "SELECT symbol, market, country, currency, sector, active, indexes \
                 FROM mcp_stocks WHERE symbol = ?1 AND market = ?2",
                params![symbol, market_str(market)],
                row_to_stock,
            )
            .optional()
            .map_err(map_sqlite_err)
    }

    pub fn upsert(&self, stock: &Stock) -> Result<(), CoreError> {
        let now = now_rfc3339();
        let indexes_json = serde_json::to_string(&stock.indexes).unwrap_or_else(|_| "[]".into());
        self.session
            .conn
            .execute(
                "INSERT INTO mcp_stocks (symbol, market, country, currency, sector, active, indexes, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8) \
                 ON CONFLICT(symbol, market) DO UPDATE SET \
                   country = excluded.country, currency = excluded.currency, \
                   sector = excluded.sector, active = excluded.active, \
                   indexes = excluded.indexes, updated_at = excluded.updated_at",
                params![
                    stock.symbol,
                    market_str(stock.market),
                    stock.country,
                    stock.currency,
                    stock.sector,
                    stock.active as i64,
                    indexes_json,
                    now,
                ],
            )
            .map_err(map_sqlite_err)?;
        Ok(())
    }

    /// Single-transaction bulk upsert; all-or-nothing (spec §4.3).
    pub fn bulk_upsert(&mut self, stocks: &[Stock]) -> Result<(), BulkWriteError> {
        let tx = self.session.conn.transaction().map_err(|e| BulkWriteError {
            first_failing: 0,
            count: stocks.len(),
            message: e.to_string(),
        })?;

        let now = now_rfc3339();
        for (i, stock) in stocks.iter().enumerate() {
            let indexes_json =
                serde_json::to_string(&stock.indexes).unwrap_or_else(|_| "[]".into());
            let result = tx.execute(
                "INSERT INTO mcp_stocks (symbol, market, country, currency, sector, active, indexes, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8) \
                 ON CONFLICT(symbol, market) DO UPDATE SET \
                   country = excluded.country, currency = excluded.currency, \
                   sector = excluded.sector, active = excluded.active, \
                   indexes = excluded.indexes, updated_at = excluded.updated_at",
                params![
                    stock.symbol,
                    market_str(stock.market),
                    stock.country,
                    stock.currency,
                    stock.sector,
                    stock.active as i64,
                    indexes_json,
                    now,
                ],
            );
            if let Err(e) = result {
                return Err(BulkWriteError {
                    first_failing: i,
                    count: stocks.len(),
                    message: e.to_string(),
                });
            }
        }

        tx.commit().map_err(|e| BulkWriteError {
            first_failing: stocks.len(),
            count: stocks.len(),
            message: e.to_string(),
        })
    }

    pub fn query_by(&self, predicate: &StockPredicate) -> Result<Vec<Stock>, CoreError> {
        let mut sql = String::from(
            "SELECT symbol, market, country, currency, sector, active, indexes FROM mcp_stocks WHERE 1=1",
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(market) = predicate.market {
            sql.push_str(" AND market = ?");
            args.push(Box::new(market_str(market).to_string()));
        }
        if predicate.active_only {
            sql.push_str(" AND active = 1");
        }
        if let Some(sector) = &predicate.sector {
            sql.push_str(" AND sector = ?");
            args.push(Box::new(sector.clone()));
        }
        sql.push_str(" ORDER BY symbol ASC");

        let mut stmt = self.session.conn.prepare(&sql).map_err(map_sqlite_err)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(AsRef::as_ref).collect();
        let rows = stmt
            .query_map(params_refs.as_slice(), row_to_stock)
            .map_err(map_sqlite_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(map_sqlite_err)
    }
}

fn row_to_stock(row: &rusqlite::Row<'_>) -> rusqlite::Result<Stock> {
    let market_s: String = row.get(1)?;
    let indexes_json: String = row.get(6)?;
    Ok(Stock {
        symbol: row.get(0)?,
        market: market_from_str(&market_s).unwrap_or(Market::Us),
        country: row.get(2)?,
        currency: row.get(3)?,
        sector: row.get(4)?,
        active: row.get::<_, i64>(5)? != 0,
        indexes: serde_json::from_str(&indexes_json).unwrap_or_default(),
    })
}
