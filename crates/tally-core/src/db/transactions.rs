//! Transaction operations

use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;

use super::transaction_filter::TransactionFilter;
use super::{is_unique_violation, parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::import::normalize::{normalize_date, normalize_description};
use crate::models::{NewTransaction, Transaction, TransactionSource, TransactionUpdate};

/// Result of inserting a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionInsertResult {
    /// Transaction was inserted successfully, contains new transaction ID
    Inserted(i64),
    /// Transaction was a duplicate, contains existing transaction ID
    Duplicate(i64),
}

/// A manually entered transaction, as submitted by a user
#[derive(Debug, Clone, Deserialize)]
pub struct ManualTransaction {
    pub date: String,
    pub description: String,
    /// Signed: negative for expenses
    pub amount_cents: i64,
    pub category_id: Option<i64>,
    pub account_id: Option<i64>,
}

const TRANSACTION_COLUMNS: &str = "t.id, t.user_id, t.date, t.description, t.amount_cents, \
     t.category_id, t.account_id, t.source, t.import_id, t.dedupe_hash, \
     t.installment_group_id, t.installment_number, t.installment_total, t.created_at";

/// Existing transaction with the same uniqueness key
fn find_duplicate(
    conn: &Connection,
    user_id: i64,
    account_scope: &str,
    dedupe_hash: &str,
) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM transactions WHERE user_id = ? AND account_scope = ? AND dedupe_hash = ?",
        params![user_id, account_scope, dedupe_hash],
        |row| row.get(0),
    )
    .optional()
}

/// Insert unless the uniqueness key already exists.
///
/// The pre-check covers the common case; a UNIQUE violation from the insert
/// itself means another writer got there first and is also a duplicate.
pub(crate) fn insert_transaction_on(
    conn: &Connection,
    user_id: i64,
    tx: &NewTransaction,
) -> rusqlite::Result<TransactionInsertResult> {
    let hash = tx.dedupe_hash();
    let scope = tx.account_scope();

    if let Some(existing_id) = find_duplicate(conn, user_id, &scope, &hash)? {
        return Ok(TransactionInsertResult::Duplicate(existing_id));
    }

    insert_or_duplicate(conn, user_id, tx, &scope, &hash)
}

fn insert_or_duplicate(
    conn: &Connection,
    user_id: i64,
    tx: &NewTransaction,
    scope: &str,
    hash: &str,
) -> rusqlite::Result<TransactionInsertResult> {
    let inserted = conn.execute(
        r#"
        INSERT INTO transactions (user_id, date, description, amount_cents, category_id, account_id,
                                  account_scope, source, import_id, dedupe_hash, installment_group_id,
                                  installment_number, installment_total)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            user_id,
            tx.date.to_string(),
            tx.description,
            tx.amount_cents,
            tx.category_id,
            tx.account_id,
            scope,
            tx.source.as_str(),
            tx.import_id,
            hash,
            tx.installment_group_id,
            tx.installment_number,
            tx.installment_total,
        ],
    );

    match inserted {
        Ok(_) => Ok(TransactionInsertResult::Inserted(conn.last_insert_rowid())),
        Err(e) if is_unique_violation(&e) => match find_duplicate(conn, user_id, scope, hash)? {
            Some(existing_id) => Ok(TransactionInsertResult::Duplicate(existing_id)),
            None => Err(e),
        },
        Err(e) => Err(e),
    }
}

/// True if the account exists and belongs to the user
pub(crate) fn account_belongs_to(conn: &Connection, user_id: i64, id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM accounts WHERE id = ? AND user_id = ?",
            params![id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// True if the category exists and belongs to the user
pub(crate) fn category_belongs_to(conn: &Connection, user_id: i64, id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM categories WHERE id = ? AND user_id = ?",
            params![id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Reject references to another user's category or account
pub(crate) fn check_references(
    conn: &Connection,
    user_id: i64,
    category_id: Option<i64>,
    account_id: Option<i64>,
) -> Result<()> {
    if let Some(id) = category_id {
        if !category_belongs_to(conn, user_id, id)? {
            return Err(Error::InvalidData(format!("category {} not found", id)));
        }
    }
    if let Some(id) = account_id {
        if !account_belongs_to(conn, user_id, id)? {
            return Err(Error::InvalidData(format!("account {} not found", id)));
        }
    }
    Ok(())
}

fn get_transaction_on(conn: &Connection, user_id: i64, id: i64) -> Result<Option<Transaction>> {
    let sql = format!(
        "SELECT {} FROM transactions t WHERE t.id = ? AND t.user_id = ?",
        TRANSACTION_COLUMNS
    );
    let tx = conn
        .query_row(&sql, params![id, user_id], Database::row_to_transaction)
        .optional()?;
    Ok(tx)
}

impl Database {
    /// Insert a transaction (duplicates by dedupe key are reported, not inserted)
    pub fn insert_transaction(
        &self,
        user_id: i64,
        tx: &NewTransaction,
    ) -> Result<TransactionInsertResult> {
        let conn = self.conn()?;
        Ok(insert_transaction_on(&conn, user_id, tx)?)
    }

    /// Record a manual transaction. A duplicate of an existing one is a conflict.
    pub fn create_manual_transaction(
        &self,
        user_id: i64,
        input: &ManualTransaction,
    ) -> Result<Transaction> {
        let date = normalize_date(&input.date).map_err(|e| Error::InvalidData(e.to_string()))?;
        let new_tx = NewTransaction {
            date,
            description: normalize_description(&input.description),
            amount_cents: input.amount_cents,
            category_id: input.category_id,
            account_id: input.account_id,
            source: TransactionSource::Manual,
            ..Default::default()
        };

        self.write_transaction(|tx| {
            check_references(tx, user_id, new_tx.category_id, new_tx.account_id)?;
            match insert_transaction_on(tx, user_id, &new_tx)? {
                TransactionInsertResult::Inserted(id) => get_transaction_on(tx, user_id, id)?
                    .ok_or_else(|| Error::NotFound(format!("transaction {}", id))),
                TransactionInsertResult::Duplicate(id) => Err(Error::Conflict(format!(
                    "duplicate of existing transaction {}",
                    id
                ))),
            }
        })
    }

    /// Get a transaction by ID, only if it belongs to the user
    pub fn get_transaction(&self, user_id: i64, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        get_transaction_on(&conn, user_id, id)
    }

    /// List a user's transactions, newest first
    pub fn list_transactions(
        &self,
        user_id: i64,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let built = filter.build(user_id);

        let sql = format!(
            "SELECT {} FROM transactions t {} {}",
            TRANSACTION_COLUMNS, built.where_clause, built.tail_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(built.param_refs().as_slice(), Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// List the transactions created by one import
    pub fn list_import_transactions(&self, user_id: i64, import_id: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM transactions t WHERE t.user_id = ? AND t.import_id = ? ORDER BY t.id",
            TRANSACTION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params![user_id, import_id], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    /// Edit a transaction. The dedupe hash is recomputed from the new values;
    /// colliding with another transaction is a conflict and nothing changes.
    pub fn update_transaction(
        &self,
        user_id: i64,
        id: i64,
        update: &TransactionUpdate,
    ) -> Result<Transaction> {
        self.write_transaction(|tx| {
            let current = get_transaction_on(tx, user_id, id)?
                .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))?;

            let date = match update.date.as_deref() {
                Some(raw) => normalize_date(raw).map_err(|e| Error::InvalidData(e.to_string()))?,
                None => current.date,
            };
            let edited = NewTransaction {
                date,
                description: update
                    .description
                    .as_deref()
                    .map(normalize_description)
                    .unwrap_or(current.description),
                amount_cents: update.amount_cents.unwrap_or(current.amount_cents),
                category_id: update.category_id.unwrap_or(current.category_id),
                account_id: update.account_id.unwrap_or(current.account_id),
                ..Default::default()
            };
            check_references(tx, user_id, edited.category_id, edited.account_id)?;

            let hash = edited.dedupe_hash();
            let scope = edited.account_scope();
            if let Some(other) = find_duplicate(tx, user_id, &scope, &hash)? {
                if other != id {
                    return Err(Error::Conflict(format!(
                        "duplicate of existing transaction {}",
                        other
                    )));
                }
            }

            let result = tx.execute(
                r#"
                UPDATE transactions
                SET date = ?, description = ?, amount_cents = ?, category_id = ?, account_id = ?,
                    account_scope = ?, dedupe_hash = ?
                WHERE id = ? AND user_id = ?
                "#,
                params![
                    edited.date.to_string(),
                    edited.description,
                    edited.amount_cents,
                    edited.category_id,
                    edited.account_id,
                    scope,
                    hash,
                    id,
                    user_id,
                ],
            );
            match result {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    return Err(Error::Conflict("duplicate of existing transaction".to_string()))
                }
                Err(e) => return Err(e.into()),
            }

            get_transaction_on(tx, user_id, id)?
                .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))
        })
    }

    /// Delete a transaction
    pub fn delete_transaction(&self, user_id: i64, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM transactions WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }

    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(2)?;
        let source_str: String = row.get(7)?;
        let created_at: String = row.get(13)?;

        Ok(Transaction {
            id: row.get(0)?,
            user_id: row.get(1)?,
            date: parse_date(&date_str),
            description: row.get(3)?,
            amount_cents: row.get(4)?,
            category_id: row.get(5)?,
            account_id: row.get(6)?,
            source: source_str.parse().unwrap_or_default(),
            import_id: row.get(8)?,
            dedupe_hash: row.get(9)?,
            installment_group_id: row.get(10)?,
            installment_number: row.get(11)?,
            installment_total: row.get(12)?,
            created_at: parse_datetime(&created_at),
        })
    }
}
