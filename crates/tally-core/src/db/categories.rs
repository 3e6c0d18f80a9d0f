//! Category operations

use rusqlite::{params, Connection, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Category;

/// Case-insensitive exact lookup. Never creates.
pub(crate) fn find_category_id_by_name(
    conn: &Connection,
    user_id: i64,
    name: &str,
) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM categories WHERE user_id = ? AND name = ?",
        params![user_id, name.trim()],
        |row| row.get(0),
    )
    .optional()
}

/// Existing category ID for `name`, creating the category if needed
pub(crate) fn resolve_or_create_category(
    conn: &Connection,
    user_id: i64,
    name: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO categories (user_id, name) VALUES (?, ?)",
        params![user_id, name.trim()],
    )?;
    conn.query_row(
        "SELECT id FROM categories WHERE user_id = ? AND name = ?",
        params![user_id, name.trim()],
        |row| row.get(0),
    )
}

impl Database {
    /// Create a category; an existing one with the same name (any case) is returned instead
    pub fn create_category(&self, user_id: i64, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("category name is required".to_string()));
        }

        let conn = self.conn()?;
        let id = resolve_or_create_category(&conn, user_id, name)?;
        let category = conn.query_row(
            "SELECT id, user_id, name, created_at FROM categories WHERE id = ?",
            params![id],
            Self::row_to_category,
        )?;
        Ok(category)
    }

    /// List a user's categories
    pub fn list_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, created_at FROM categories WHERE user_id = ? ORDER BY name",
        )?;

        let categories = stmt
            .query_map(params![user_id], Self::row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Get a category by ID, only if it belongs to the user
    pub fn get_category(&self, user_id: i64, id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT id, user_id, name, created_at FROM categories WHERE id = ? AND user_id = ?",
                params![id, user_id],
                Self::row_to_category,
            )
            .optional()?;
        Ok(category)
    }

    /// Find a category ID by name (case-insensitive exact match)
    pub fn find_category_by_name(&self, user_id: i64, name: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        Ok(find_category_id_by_name(&conn, user_id, name)?)
    }

    /// Attach a suggested category to uncategorized transactions, creating
    /// the category if needed. Transactions categorized in the meantime are
    /// left alone. Returns the number of transactions updated.
    pub fn assign_suggested_category(
        &self,
        user_id: i64,
        transaction_ids: &[i64],
        name: &str,
    ) -> Result<usize> {
        self.write_transaction(|tx| {
            let category_id = resolve_or_create_category(tx, user_id, name)?;
            let mut updated = 0;
            for id in transaction_ids {
                updated += tx.execute(
                    "UPDATE transactions SET category_id = ?
                     WHERE id = ? AND user_id = ? AND category_id IS NULL",
                    params![category_id, id, user_id],
                )?;
            }
            Ok(updated)
        })
    }

    fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
        let created_at: String = row.get(3)?;
        Ok(Category {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            created_at: parse_datetime(&created_at),
        })
    }
}
