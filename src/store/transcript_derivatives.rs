//! `mcp_transcript_derivatives` repository (spec §3
//! `StoredRecord::TranscriptDerivative`).
//!
//! Keyed by `(transcript_id, kind)` where `kind` is e.g. `"summary"` or
//! `"sentiment"`. The cache-authority policy (spec §4.6: a derivative row
//! is authoritative and never re-derived once the model tag matches) is
//! enforced by the resolver, not this repository.

use rusqlite::{params, OptionalExtension};

use super::{map_sqlite_err, now_rfc3339, StoreSession};
use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptDerivative {
    pub transcript_id: String,
    pub kind: String,
    pub payload: String,
    pub model_tag: String,
}

pub struct TranscriptDerivativesRepo {
    session: StoreSession,
}

impl TranscriptDerivativesRepo {
    pub fn new(session: StoreSession) -> Self {
        Self { session }
    }

    pub fn get(
        &self,
        transcript_id: &str,
        kind: &str,
    ) -> Result<Option<TranscriptDerivative>, CoreError> {
        self.session
            .conn
            .query_row(
                "SELECT transcript_id, kind, payload, model_tag \
                 FROM mcp_transcript_derivatives WHERE transcript_id = ?1 AND kind = ?2",
                params![transcript_id, kind],
                row_to_derivative,
            )
            .optional()
            .map_err(map_sqlite_err)
    }

    pub fn upsert(&self, derivative: &TranscriptDerivative) -> Result<(), CoreError> {
        let now = now_rfc3339();
        self.session
            .conn
            .execute(
                "INSERT INTO mcp_transcript_derivatives (transcript_id, kind, payload, model_tag, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
                 ON CONFLICT(transcript_id, kind) DO UPDATE SET \
                   payload = excluded.payload, model_tag = excluded.model_tag, updated_at = excluded.updated_at",
                params![
                    derivative.transcript_id,
                    derivative.kind,
                    derivative.payload,
                    derivative.model_tag,
                    now,
                ],
            )
            .map_err(map_sqlite_err)?;
        Ok(())
    }
}

fn row_to_derivative(row: &rusqlite::Row<'_>) -> rusqlite::Result<TranscriptDerivative> {
    Ok(TranscriptDerivative {
        transcript_id: row.get(0)?,
        kind: row.get(1)?,
        payload: row.get(2)?,
        model_tag: row.get(3)?,
    })
}
