//! User operations

use rusqlite::{params, OptionalExtension};

use super::{is_unique_violation, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::User;

impl Database {
    /// Create a user with an already-hashed password
    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        let conn = self.conn()?;
        let email = email.trim();

        match conn.execute(
            "INSERT INTO users (email, password_hash) VALUES (?, ?)",
            params![email, password_hash],
        ) {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::Conflict(format!("email already registered: {}", email)))
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        self.get_user(id)?
            .ok_or_else(|| Error::NotFound(format!("user {}", id)))
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, email, created_at FROM users WHERE id = ?",
                params![id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get a user by email (case-insensitive)
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, email, created_at FROM users WHERE email = ?",
                params![email.trim()],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get the stored password hash for an email, with the user ID
    pub fn get_password_hash(&self, email: &str) -> Result<Option<(i64, String)>> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT id, password_hash FROM users WHERE email = ?",
                params![email.trim()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(found)
    }

    /// Delete a user and, by cascade, everything they own
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM users WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let created_at: String = row.get(2)?;
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            created_at: parse_datetime(&created_at),
        })
    }
}
