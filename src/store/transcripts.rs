//! `mcp_transcripts` repository (spec §3 `StoredRecord::Transcript`).
//!
//! Never auto-expired: once stored, served from L2 forever unless an
//! explicit refresh is requested. `upsert` refuses to overwrite an
//! existing row unless `force=true` (spec §4.3 "transcripts are
//! immutable").

use rusqlite::{params, OptionalExtension};

use super::{map_sqlite_err, now_rfc3339, StoreSession};
use crate::error::CoreError;
use crate::keys::Quarter;

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub ticker: String,
    pub quarter: String,
    pub fiscal_year: i32,
    pub text: String,
    pub source_tag: String,
    pub fetched_at: String,
    pub word_count: i64,
}

pub struct TranscriptsRepo {
    session: StoreSession,
}

impl TranscriptsRepo {
    pub fn new(session: StoreSession) -> Self {
        Self { session }
    }

    pub fn get_by_key(
        &self,
        ticker: &str,
        quarter: Quarter,
        fiscal_year: i32,
    ) -> Result<Option<Transcript>, CoreError> {
        self.session
            .conn
            .query_row(
                "SELECT ticker, quarter, fiscal_year, text, source_tag, fetched_at, word_count \
                 FROM mcp_transcripts WHERE ticker = ?1 AND quarter = ?2 AND fiscal_year = ?3",
                params![ticker, quarter.as_str(), fiscal_year],
                row_to_transcript,
            )
            .optional()
            .map_err(map_sqlite_err)
    }

    /// Refuses to overwrite an existing row unless `force=true` (spec §4.3,
    /// §8 property 5 "transcript immutability").
    pub fn upsert(&self, transcript: &Transcript, force: bool) -> Result<(), CoreError> {
        let existing = self.get_by_key(
            &transcript.ticker,
            Quarter::parse(&transcript.quarter)?,
            transcript.fiscal_year,
        )?;

        if existing.is_some() && !force {
            return Err(CoreError::InvalidInput(format!(
                "transcript for {}/{}/{} already exists; pass force=true to overwrite",
                transcript.ticker, transcript.quarter, transcript.fiscal_year
            )));
        }

        let now = now_rfc3339();
        self.session
            .conn
            .execute(
                "INSERT INTO mcp_transcripts (ticker, quarter, fiscal_year, text, source_tag, fetched_at, word_count, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8) \
                 ON CONFLICT(ticker, quarter, fiscal_year) DO UPDATE SET \
                   text = excluded.text, source_tag = excluded.source_tag, \
                   fetched_at = excluded.fetched_at, word_count = excluded.word_count, \
                   updated_at = excluded.updated_at",
                params![
                    transcript.ticker,
                    transcript.quarter,
                    transcript.fiscal_year,
                    transcript.text,
                    transcript.source_tag,
                    transcript.fetched_at,
                    transcript.word_count,
                    now,
                ],
            )
            .map_err(map_sqlite_err)?;
        Ok(())
    }

    pub fn query_by_ticker(&self, ticker: &str) -> Result<Vec<Transcript>, CoreError> {
        let mut stmt = self
            .session
            .conn
            .prepare(
                "SELECT ticker, quarter, fiscal_year, text, source_tag, fetched_at, word_count \
                 FROM mcp_transcripts WHERE ticker = ?1 ORDER BY fiscal_year DESC, quarter DESC",
            )
            .map_err(map_sqlite_err)?;
        let rows = stmt
            .query_map(params![ticker], row_to_transcript)
            .map_err(map_sqlite_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(map_sqlite_err)
    }
}

fn row_to_transcript(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transcript> {
    Ok(Transcript {
        ticker: row.get(0)?,
        quarter: row.get(1)?,
        fiscal_year: row.get(2)?,
        text: row.get(3)?,
        source_tag: row.get(4)?,
        fetched_at: row.get(5)?,
        word_count: row.get(6)?,
    })
}
