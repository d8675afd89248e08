//! C3 — Persistent Store Gateway (spec §4.3).
//!
//! Typed repositories over an embedded SQLite store. All access goes
//! through this module; no SQL appears outside it (spec §4.3 "direct SQL
//! outside C3 is forbidden").

pub mod exchange_rates;
pub mod ir_mappings;
pub mod price_bars;
pub mod schema;
pub mod screening;
pub mod stocks;
pub mod transcript_derivatives;
pub mod transcripts;

use std::sync::Arc;

use chrono::Utc;

use crate::error::CoreError;
pub use schema::DbPool;

/// Result of a `bulk_upsert` that failed partway through. The whole batch
/// was rolled back (spec §4.3 "partial failure rolls the entire batch
/// back").
#[derive(Debug, thiserror::Error)]
#[error("bulk write failed at row {first_failing} of {count}: {message}")]
pub struct BulkWriteError {
    pub first_failing: usize,
    pub count: usize,
    pub message: String,
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub(crate) fn map_sqlite_err(e: rusqlite::Error) -> CoreError {
    crate::error::transient("sqlite", e)
}

pub(crate) fn map_pool_err(e: r2d2::Error) -> CoreError {
    crate::error::transient("sqlite_pool", e)
}

/// Scoped session: a pooled connection whose lifetime guarantees release
/// on all exit paths (spec §4.3, §9 "replace implicit global session /
/// thread-local db handles"). Not `Send` across an `.await` boundary by
/// design — callers acquire, use, and drop within one synchronous block.
pub struct StoreSession {
    pub(crate) conn: r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>,
}

/// The persistent store gateway: owns the pool, hands out scoped sessions.
#[derive(Clone)]
pub struct Store {
    pool: Arc<DbPool>,
}

impl Store {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn session(&self) -> Result<StoreSession, CoreError> {
        let conn = self.pool.get().map_err(map_pool_err)?;
        Ok(StoreSession { conn })
    }

    pub fn stocks(&self) -> Result<stocks::StocksRepo, CoreError> {
        Ok(stocks::StocksRepo::new(self.session()?))
    }

    pub fn price_bars(&self) -> Result<price_bars::PriceBarsRepo, CoreError> {
        Ok(price_bars::PriceBarsRepo::new(self.session()?))
    }

    pub fn transcripts(&self) -> Result<transcripts::TranscriptsRepo, CoreError> {
        Ok(transcripts::TranscriptsRepo::new(self.session()?))
    }

    pub fn transcript_derivatives(
        &self,
    ) -> Result<transcript_derivatives::TranscriptDerivativesRepo, CoreError> {
        Ok(transcript_derivatives::TranscriptDerivativesRepo::new(
            self.session()?,
        ))
    }

    pub fn ir_mappings(&self) -> Result<ir_mappings::IrMappingsRepo, CoreError> {
        Ok(ir_mappings::IrMappingsRepo::new(self.session()?))
    }

    pub fn exchange_rates(&self) -> Result<exchange_rates::ExchangeRatesRepo, CoreError> {
        Ok(exchange_rates::ExchangeRatesRepo::new(self.session()?))
    }

    pub fn screening(&self) -> Result<screening::ScreeningRepo, CoreError> {
        Ok(screening::ScreeningRepo::new(self.session()?))
    }
}
