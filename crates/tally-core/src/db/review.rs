//! Import review queue operations

use rusqlite::{params, Connection, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{ImportReviewItem, PendingReview, ReviewStatus};

const REVIEW_COLUMNS: &str = "id, import_id, user_id, row_number, raw_data, error, status, \
     suggested_account_id, resolved_date, resolved_description, resolved_amount_cents, \
     resolved_category_id, resolved_account_id, created_at, updated_at";

/// The values a review item was resolved with
#[derive(Debug, Clone)]
pub(crate) struct ReviewSnapshot {
    pub date: String,
    pub description: String,
    pub amount_cents: i64,
    pub category_id: Option<i64>,
    pub account_id: Option<i64>,
}

pub(crate) fn insert_review_item_on(
    conn: &Connection,
    import_id: i64,
    user_id: i64,
    row_number: i64,
    raw_data: &str,
    error: &str,
    suggested_account_id: Option<i64>,
) -> rusqlite::Result<i64> {
    conn.execute(
        r#"
        INSERT INTO import_review_items
            (import_id, user_id, row_number, raw_data, error, status, suggested_account_id)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            import_id,
            user_id,
            row_number,
            raw_data,
            error,
            ReviewStatus::Pending.as_str(),
            suggested_account_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn get_review_item_on(
    conn: &Connection,
    user_id: i64,
    id: i64,
) -> rusqlite::Result<Option<ImportReviewItem>> {
    let sql = format!(
        "SELECT {} FROM import_review_items WHERE id = ? AND user_id = ?",
        REVIEW_COLUMNS
    );
    conn.query_row(&sql, params![id, user_id], Database::row_to_review_item)
        .optional()
}

/// Move a pending item to its final status. Returns false if it was no longer pending.
pub(crate) fn mark_review_on(
    conn: &Connection,
    id: i64,
    status: ReviewStatus,
    snapshot: Option<&ReviewSnapshot>,
) -> rusqlite::Result<bool> {
    let updated = match snapshot {
        Some(s) => conn.execute(
            r#"
            UPDATE import_review_items
            SET status = ?, resolved_date = ?, resolved_description = ?,
                resolved_amount_cents = ?, resolved_category_id = ?, resolved_account_id = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND status = 'pending'
            "#,
            params![
                status.as_str(),
                s.date,
                s.description,
                s.amount_cents,
                s.category_id,
                s.account_id,
                id,
            ],
        )?,
        None => conn.execute(
            "UPDATE import_review_items SET status = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ? AND status = 'pending'",
            params![status.as_str(), id],
        )?,
    };
    Ok(updated > 0)
}

pub(crate) fn count_pending_for_import_on(conn: &Connection, import_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM import_review_items WHERE import_id = ? AND status = 'pending'",
        params![import_id],
        |row| row.get(0),
    )
}

impl Database {
    /// Pending review items for a user, oldest first
    pub fn list_pending_reviews(&self, user_id: i64) -> Result<Vec<PendingReview>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, import_id, row_number, raw_data, error, suggested_account_id
            FROM import_review_items
            WHERE user_id = ? AND status = 'pending'
            ORDER BY id
            "#,
        )?;

        let items = stmt
            .query_map(params![user_id], |row| {
                Ok(PendingReview {
                    id: row.get(0)?,
                    import_id: row.get(1)?,
                    row_number: row.get(2)?,
                    raw_data: row.get(3)?,
                    error: row.get(4)?,
                    suggested_account_id: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// All review items of one import, in row order
    pub fn list_review_items(&self, user_id: i64, import_id: i64) -> Result<Vec<ImportReviewItem>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM import_review_items WHERE user_id = ? AND import_id = ? ORDER BY row_number",
            REVIEW_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![user_id, import_id], Self::row_to_review_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Get a review item, only if it belongs to the user
    pub fn get_review_item(&self, user_id: i64, id: i64) -> Result<Option<ImportReviewItem>> {
        let conn = self.conn()?;
        Ok(get_review_item_on(&conn, user_id, id)?)
    }

    fn row_to_review_item(row: &rusqlite::Row) -> rusqlite::Result<ImportReviewItem> {
        let status_str: String = row.get(6)?;
        let created_at: String = row.get(13)?;
        let updated_at: String = row.get(14)?;

        Ok(ImportReviewItem {
            id: row.get(0)?,
            import_id: row.get(1)?,
            user_id: row.get(2)?,
            row_number: row.get(3)?,
            raw_data: row.get(4)?,
            error: row.get(5)?,
            status: status_str.parse().unwrap_or_default(),
            suggested_account_id: row.get(7)?,
            resolved_date: row.get(8)?,
            resolved_description: row.get(9)?,
            resolved_amount_cents: row.get(10)?,
            resolved_category_id: row.get(11)?,
            resolved_account_id: row.get(12)?,
            created_at: parse_datetime(&created_at),
            updated_at: parse_datetime(&updated_at),
        })
    }
}
