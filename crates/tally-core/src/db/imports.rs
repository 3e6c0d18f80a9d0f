//! Import job operations

use rusqlite::{params, Connection, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{ImportJob, ImportJobSummary, ImportStatus, SourceKind};

const IMPORT_COLUMNS: &str = "id, user_id, source_kind, filename, status, notes, created_at";

/// Open a new import job. Status starts as `ok` and is settled once rows are processed.
pub(crate) fn create_import_on(
    conn: &Connection,
    user_id: i64,
    kind: SourceKind,
    filename: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO imports (user_id, source_kind, filename, status) VALUES (?, ?, ?, ?)",
        params![user_id, kind.as_str(), filename, ImportStatus::Ok.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn update_import_on(
    conn: &Connection,
    id: i64,
    status: ImportStatus,
    notes: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE imports SET status = ?, notes = ? WHERE id = ?",
        params![status.as_str(), notes, id],
    )?;
    Ok(())
}

pub(crate) fn get_import_on(
    conn: &Connection,
    user_id: i64,
    id: i64,
) -> rusqlite::Result<Option<ImportJob>> {
    let sql = format!(
        "SELECT {} FROM imports WHERE id = ? AND user_id = ?",
        IMPORT_COLUMNS
    );
    conn.query_row(&sql, params![id, user_id], Database::row_to_import)
        .optional()
}

impl Database {
    /// Record an import job
    pub fn create_import(&self, user_id: i64, kind: SourceKind, filename: &str) -> Result<i64> {
        let conn = self.conn()?;
        Ok(create_import_on(&conn, user_id, kind, filename)?)
    }

    /// Set an import job's status and notes
    pub fn update_import(&self, id: i64, status: ImportStatus, notes: Option<&str>) -> Result<()> {
        let conn = self.conn()?;
        Ok(update_import_on(&conn, id, status, notes)?)
    }

    /// Get an import job, only if it belongs to the user
    pub fn get_import(&self, user_id: i64, id: i64) -> Result<Option<ImportJob>> {
        let conn = self.conn()?;
        Ok(get_import_on(&conn, user_id, id)?)
    }

    /// List a user's import jobs, newest first
    pub fn list_imports(&self, user_id: i64, limit: i64) -> Result<Vec<ImportJob>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM imports WHERE user_id = ? ORDER BY id DESC LIMIT ?",
            IMPORT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let jobs = stmt
            .query_map(params![user_id, limit], Self::row_to_import)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    /// Import job with its transaction and review counters
    pub fn get_import_summary(&self, user_id: i64, id: i64) -> Result<Option<ImportJobSummary>> {
        let conn = self.conn()?;
        let Some(job) = get_import_on(&conn, user_id, id)? else {
            return Ok(None);
        };

        let transaction_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE import_id = ?",
            params![id],
            |row| row.get(0),
        )?;

        let (pending_count, resolved_count, duplicate_count): (i64, i64, i64) = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'resolved' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'duplicate' THEN 1 ELSE 0 END), 0)
            FROM import_review_items
            WHERE import_id = ?
            "#,
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(Some(ImportJobSummary {
            job,
            transaction_count,
            pending_count,
            resolved_count,
            duplicate_count,
        }))
    }

    fn row_to_import(row: &rusqlite::Row) -> rusqlite::Result<ImportJob> {
        let kind_str: String = row.get(2)?;
        let status_str: String = row.get(4)?;
        let created_at: String = row.get(6)?;

        Ok(ImportJob {
            id: row.get(0)?,
            user_id: row.get(1)?,
            source_kind: kind_str.parse().unwrap_or(SourceKind::Csv),
            filename: row.get(3)?,
            status: status_str.parse().unwrap_or_default(),
            notes: row.get(5)?,
            created_at: parse_datetime(&created_at),
        })
    }
}
