//! Installment group operations

use rusqlite::{params, OptionalExtension};
use serde::Deserialize;
use tracing::info;

use super::transactions::{check_references, insert_transaction_on, TransactionInsertResult};
use super::{parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::import::installments::{add_months, installment_description};
use crate::import::normalize::{normalize_date, normalize_description};
use crate::models::{InstallmentGroup, NewTransaction, Transaction, TransactionSource};

fn default_interval() -> i64 {
    1
}

/// A purchase to be split into installments
#[derive(Debug, Clone, Deserialize)]
pub struct NewInstallmentGroup {
    pub start_date: String,
    pub base_description: String,
    /// Signed total; either this or `amount_per_installment_cents` is required
    pub total_cents: Option<i64>,
    pub amount_per_installment_cents: Option<i64>,
    pub installments: i64,
    #[serde(default = "default_interval")]
    pub interval_months: i64,
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
}

impl NewInstallmentGroup {
    /// Amount of each installment; the truncation remainder goes on the last one
    fn split(&self, total_cents: i64) -> Vec<i64> {
        let n = self.installments;
        let each = total_cents / n;
        let remainder = total_cents - each * n;
        (1..=n)
            .map(|i| if i == n { each + remainder } else { each })
            .collect()
    }
}

impl Database {
    /// Create a group and all its transactions. A dedupe collision on any
    /// installment rejects the whole group.
    pub fn create_installment_group(
        &self,
        user_id: i64,
        input: &NewInstallmentGroup,
    ) -> Result<InstallmentGroup> {
        if input.installments <= 0 {
            return Err(Error::InvalidData("installments must be positive".to_string()));
        }
        if input.interval_months < 1 {
            return Err(Error::InvalidData("interval_months must be at least 1".to_string()));
        }
        let total_cents = match (input.total_cents, input.amount_per_installment_cents) {
            (Some(total), _) => total,
            (None, Some(each)) => each * input.installments,
            (None, None) => {
                return Err(Error::InvalidData(
                    "total_cents or amount_per_installment_cents is required".to_string(),
                ))
            }
        };
        let start =
            normalize_date(&input.start_date).map_err(|e| Error::InvalidData(e.to_string()))?;
        let base = normalize_description(&input.base_description);
        let total = u32::try_from(input.installments)
            .map_err(|_| Error::InvalidData("too many installments".to_string()))?;
        let interval = u32::try_from(input.interval_months)
            .map_err(|_| Error::InvalidData("interval_months out of range".to_string()))?;

        let group_id = self.write_transaction(|tx| {
            check_references(tx, user_id, input.category_id, input.account_id)?;

            tx.execute(
                r#"
                INSERT INTO installment_groups (user_id, base_description, total_cents, installments,
                                                interval_months, start_date, account_id, category_id)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    user_id,
                    base,
                    total_cents,
                    input.installments,
                    input.interval_months,
                    start.to_string(),
                    input.account_id,
                    input.category_id,
                ],
            )?;
            let group_id = tx.last_insert_rowid();

            for (i, amount) in (1..=total).zip(input.split(total_cents)) {
                let installment = NewTransaction {
                    date: add_months(start, (i - 1) * interval),
                    description: installment_description(&base, i, total),
                    amount_cents: amount,
                    category_id: input.category_id,
                    account_id: input.account_id,
                    source: TransactionSource::Manual,
                    installment_group_id: Some(group_id),
                    installment_number: Some(i64::from(i)),
                    installment_total: Some(i64::from(total)),
                    ..Default::default()
                };
                if let TransactionInsertResult::Duplicate(existing) =
                    insert_transaction_on(tx, user_id, &installment)?
                {
                    return Err(Error::Conflict(format!(
                        "installment {}/{} duplicates transaction {}",
                        i, total, existing
                    )));
                }
            }

            Ok(group_id)
        })?;

        info!(group_id, installments = total, "Created installment group");

        self.get_installment_group(user_id, group_id)?
            .ok_or_else(|| Error::NotFound(format!("installment group {}", group_id)))
    }

    /// Get a group, only if it belongs to the user
    pub fn get_installment_group(&self, user_id: i64, id: i64) -> Result<Option<InstallmentGroup>> {
        let conn = self.conn()?;
        let group = conn
            .query_row(
                r#"
                SELECT id, user_id, base_description, total_cents, installments, interval_months,
                       start_date, account_id, category_id, created_at
                FROM installment_groups
                WHERE id = ? AND user_id = ?
                "#,
                params![id, user_id],
                |row| {
                    let start_date: String = row.get(6)?;
                    let created_at: String = row.get(9)?;
                    Ok(InstallmentGroup {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        base_description: row.get(2)?,
                        total_cents: row.get(3)?,
                        installments: row.get(4)?,
                        interval_months: row.get(5)?,
                        start_date: parse_date(&start_date),
                        account_id: row.get(7)?,
                        category_id: row.get(8)?,
                        created_at: parse_datetime(&created_at),
                    })
                },
            )
            .optional()?;
        Ok(group)
    }

    /// Transactions of a group, in installment order
    pub fn list_group_transactions(&self, user_id: i64, group_id: i64) -> Result<Vec<Transaction>> {
        if self.get_installment_group(user_id, group_id)?.is_none() {
            return Err(Error::NotFound(format!("installment group {}", group_id)));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.user_id, t.date, t.description, t.amount_cents, t.category_id,
                   t.account_id, t.source, t.import_id, t.dedupe_hash, t.installment_group_id,
                   t.installment_number, t.installment_total, t.created_at
            FROM transactions t
            WHERE t.user_id = ? AND t.installment_group_id = ?
            ORDER BY t.installment_number
            "#,
        )?;
        let transactions = stmt
            .query_map(params![user_id, group_id], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    /// Delete a group; its transactions go with it
    pub fn delete_installment_group(&self, user_id: i64, group_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM installment_groups WHERE id = ? AND user_id = ?",
            params![group_id, user_id],
        )?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(total: Option<i64>, each: Option<i64>, n: i64) -> NewInstallmentGroup {
        NewInstallmentGroup {
            start_date: "2026-01-31".to_string(),
            base_description: "Notebook".to_string(),
            total_cents: total,
            amount_per_installment_cents: each,
            installments: n,
            interval_months: 1,
            account_id: None,
            category_id: None,
        }
    }

    #[test]
    fn test_split_puts_remainder_on_last() {
        assert_eq!(group(Some(-1000), None, 3).split(-1000), vec![-333, -333, -334]);
        assert_eq!(group(Some(900), None, 3).split(900), vec![300, 300, 300]);
    }

    #[test]
    fn test_interval_defaults_to_one() {
        let parsed: NewInstallmentGroup = serde_json::from_str(
            r#"{"start_date":"2026-01-01","base_description":"TV","total_cents":-300,"installments":3}"#,
        )
        .unwrap();
        assert_eq!(parsed.interval_months, 1);
    }
}
