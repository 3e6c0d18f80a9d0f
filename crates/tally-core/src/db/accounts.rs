//! Account operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Account;

impl Database {
    /// Create an account, or return the existing one with the same name
    pub fn create_account(&self, user_id: i64, name: &str) -> Result<Account> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("account name is required".to_string()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO accounts (user_id, name) VALUES (?, ?)",
            params![user_id, name],
        )?;

        let account = conn.query_row(
            "SELECT id, user_id, name, created_at FROM accounts WHERE user_id = ? AND name = ?",
            params![user_id, name],
            Self::row_to_account,
        )?;
        Ok(account)
    }

    /// List a user's accounts
    pub fn list_accounts(&self, user_id: i64) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, created_at FROM accounts WHERE user_id = ? ORDER BY name",
        )?;

        let accounts = stmt
            .query_map(params![user_id], Self::row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Get an account by ID, only if it belongs to the user
    pub fn get_account(&self, user_id: i64, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT id, user_id, name, created_at FROM accounts WHERE id = ? AND user_id = ?",
                params![id, user_id],
                Self::row_to_account,
            )
            .optional()?;
        Ok(account)
    }

    /// Find an account by name (case-insensitive)
    pub fn find_account_by_name(&self, user_id: i64, name: &str) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT id, user_id, name, created_at FROM accounts WHERE user_id = ? AND name = ?",
                params![user_id, name.trim()],
                Self::row_to_account,
            )
            .optional()?;
        Ok(account)
    }

    fn row_to_account(row: &rusqlite::Row) -> rusqlite::Result<Account> {
        let created_at: String = row.get(3)?;
        Ok(Account {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            created_at: parse_datetime(&created_at),
        })
    }
}
