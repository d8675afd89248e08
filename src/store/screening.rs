//! `mcp_maverick_screening` repository (spec §3
//! `StoredRecord::ScreeningRow`).
//!
//! Keyed by `(strategy, as_of_date, rank)`. Rows for a given
//! `(strategy, as_of_date)` are written together as a full replacement
//! of the prior ranking (spec §4.3).

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{map_sqlite_err, now_rfc3339, BulkWriteError, StoreSession};
use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningRow {
    pub strategy: String,
    pub as_of_date: NaiveDate,
    pub rank: i64,
    pub symbol: String,
    pub score: f64,
    pub payload: String,
}

pub struct ScreeningRepo {
    session: StoreSession,
}

impl ScreeningRepo {
    pub fn new(session: StoreSession) -> Self {
        Self { session }
    }

    pub fn latest_as_of(&self, strategy: &str) -> Result<Option<NaiveDate>, CoreError> {
        self.session
            .conn
            .query_row(
                "SELECT MAX(as_of_date) FROM mcp_maverick_screening WHERE strategy = ?1",
                params![strategy],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map_err(map_sqlite_err)?
            .flatten()
            .map(|s| {
                NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map_err(|e| CoreError::Fatal(format!("corrupt as_of_date in store: {e}")))
            })
            .transpose()
    }

    /// Ordered by `rank ASC` (spec §4.3).
    pub fn query(
        &self,
        strategy: &str,
        as_of_date: NaiveDate,
    ) -> Result<Vec<ScreeningRow>, CoreError> {
        let mut stmt = self
            .session
            .conn
            .prepare(
                "SELECT strategy, as_of_date, rank, symbol, score, payload \
                 FROM mcp_maverick_screening WHERE strategy = ?1 AND as_of_date = ?2 \
                 ORDER BY rank ASC",
            )
            .map_err(map_sqlite_err)?;
        let rows = stmt
            .query_map(params![strategy, as_of_date.to_string()], row_to_row)
            .map_err(map_sqlite_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(map_sqlite_err)
    }

    /// Replaces the whole `(strategy, as_of_date)` ranking in one
    /// transaction: deletes any existing rows for that key, then inserts
    /// the new set (spec §4.3 "full replacement of the prior ranking").
    pub fn replace_ranking(
        &mut self,
        strategy: &str,
        as_of_date: NaiveDate,
        rows: &[ScreeningRow],
    ) -> Result<(), BulkWriteError> {
        let tx = self.session.conn.transaction().map_err(|e| BulkWriteError {
            first_failing: 0,
            count: rows.len(),
            message: e.to_string(),
        })?;

        tx.execute(
            "DELETE FROM mcp_maverick_screening WHERE strategy = ?1 AND as_of_date = ?2",
            params![strategy, as_of_date.to_string()],
        )
        .map_err(|e| BulkWriteError {
            first_failing: 0,
            count: rows.len(),
            message: e.to_string(),
        })?;

        let now = now_rfc3339();
        for (i, row) in rows.iter().enumerate() {
            let result = tx.execute(
                "INSERT INTO mcp_maverick_screening (strategy, as_of_date, rank, symbol, score, payload, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    row.strategy,
                    row.as_of_date.to_string(),
                    row.rank,
                    row.symbol,
                    row.score,
                    row.payload,
                    now,
                ],
            );
            if let Err(e) = result {
                return Err(BulkWriteError {
                    first_failing: i,
                    count: rows.len(),
                    message: e.to_string(),
                });
            }
        }

        tx.commit().map_err(|e| BulkWriteError {
            first_failing: rows.len(),
            count: rows.len(),
            message: e.to_string(),
        })
    }
}

fn row_to_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScreeningRow> {
    let date_s: String = row.get(1)?;
    Ok(ScreeningRow {
        strategy: row.get(0)?,
        as_of_date: NaiveDate::parse_from_str(&date_s, "%Y-%m-%d").unwrap_or_default(),
        rank: row.get(2)?,
        symbol: row.get(3)?,
        score: row.get(4)?,
        payload: row.get(5)?,
    })
}
