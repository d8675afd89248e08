//! `mcp_ir_mappings` repository (spec §3 `StoredRecord::IrMapping`).
//!
//! Symbol -> investor-relations page metadata used by the transcript
//! scraping providers (spec §4.5). Seeded from a JSON file at startup
//! (spec §6, `config::load_ir_mappings`).

use rusqlite::{params, OptionalExtension};

use super::{map_sqlite_err, now_rfc3339, StoreSession};
use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq)]
pub struct IrMapping {
    pub ticker: String,
    pub company_name: String,
    pub ir_base_url: String,
    pub concall_url_pattern: Option<String>,
    pub concall_section_xpath: Option<String>,
    pub concall_section_css: Option<String>,
    pub market: String,
    pub country: String,
    pub is_active: bool,
    pub notes: Option<String>,
    pub verification_status: String,
}

pub struct IrMappingsRepo {
    session: StoreSession,
}

impl IrMappingsRepo {
    pub fn new(session: StoreSession) -> Self {
        Self { session }
    }

    pub fn get(&self, ticker: &str) -> Result<Option<IrMapping>, CoreError> {
        self.session
            .conn
            .query_row(
                "SELECT ticker, company_name, ir_base_url, concall_url_pattern, \
                        concall_section_xpath, concall_section_css, market, country, \
                        is_active, notes, verification_status \
                 FROM mcp_ir_mappings WHERE ticker = ?1",
                params![ticker],
                row_to_mapping,
            )
            .optional()
            .map_err(map_sqlite_err)
    }

    pub fn upsert(&self, mapping: &IrMapping) -> Result<(), CoreError> {
        let now = now_rfc3339();
        self.session
            .conn
            .execute(
                "INSERT INTO mcp_ir_mappings (ticker, company_name, ir_base_url, concall_url_pattern, \
                   concall_section_xpath, concall_section_css, market, country, is_active, notes, \
                   verification_status, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12) \
                 ON CONFLICT(ticker) DO UPDATE SET \
                   company_name = excluded.company_name, ir_base_url = excluded.ir_base_url, \
                   concall_url_pattern = excluded.concall_url_pattern, \
                   concall_section_xpath = excluded.concall_section_xpath, \
                   concall_section_css = excluded.concall_section_css, \
                   market = excluded.market, country = excluded.country, \
                   is_active = excluded.is_active, notes = excluded.notes, \
                   verification_status = excluded.verification_status, updated_at = excluded.updated_at",
                params![
                    mapping.ticker,
                    mapping.company_name,
                    mapping.ir_base_url,
                    mapping.concall_url_pattern,
                    mapping.concall_section_xpath,
                    mapping.concall_section_css,
                    mapping.market,
                    mapping.country,
                    mapping.is_active as i64,
                    mapping.notes,
                    mapping.verification_status,
                    now,
                ],
            )
            .map_err(map_sqlite_err)?;
        Ok(())
    }

    pub fn active_mappings(&self) -> Result<Vec<IrMapping>, CoreError> {
        let mut stmt = self
            .session
            .conn
            .prepare(
                "SELECT ticker, company_name, ir_base_url, concall_url_pattern, \
                        concall_section_xpath, concall_section_css, market, country, \
                        is_active, notes, verification_status \
                 FROM mcp_ir_mappings WHERE is_active = 1 ORDER BY ticker ASC",
            )
            .map_err(map_sqlite_err)?;
        let rows = stmt
            .query_map(params![], row_to_mapping)
            .map_err(map_sqlite_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(map_sqlite_err)
    }
}

fn row_to_mapping(row: &rusqlite::Row<'_>) -> rusqlite::Result<IrMapping> {
    Ok(IrMapping {
        ticker: row.get(0)?,
        company_name: row.get(1)?,
        ir_base_url: row.get(2)?,
        concall_url_pattern: row.get(3)?,
        concall_section_xpath: row.get(4)?,
        concall_section_css: row.get(5)?,
        market: row.get(6)?,
        country: row.get(7)?,
        is_active: row.get::<_, i64>(8)? != 0,
        notes: row.get(9)?,
        verification_status: row.get(10)?,
    })
}
