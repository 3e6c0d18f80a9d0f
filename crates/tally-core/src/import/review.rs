//! Review queue: rows that failed to import, resolved by hand

use serde::{Deserialize, Serialize};
use tracing::info;

use super::normalize::{normalize_date, normalize_description};
use crate::db::{
    check_references, count_pending_for_import_on, get_import_on, get_review_item_on,
    insert_transaction_on, mark_review_on, update_import_on, Database, ReviewSnapshot,
    TransactionInsertResult,
};
use crate::error::{Error, Result};
use crate::models::{ImportStatus, NewTransaction, PendingReview, ReviewStatus, TransactionSource};

/// Corrected values for a pending row
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveReview {
    pub date: String,
    pub description: String,
    /// Signed: negative for expenses
    pub amount_cents: i64,
    pub category_id: Option<i64>,
    pub account_id: Option<i64>,
}

/// How a confirmation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ReviewOutcome {
    /// A new transaction was created
    Resolved { transaction_id: i64 },
    /// An identical transaction already existed; nothing was inserted
    Duplicate { transaction_id: i64 },
}

impl ReviewOutcome {
    pub fn transaction_id(&self) -> i64 {
        match self {
            Self::Resolved { transaction_id } | Self::Duplicate { transaction_id } => {
                *transaction_id
            }
        }
    }
}

/// Review queue operations for one database
pub struct ReviewQueue<'a> {
    db: &'a Database,
}

impl<'a> ReviewQueue<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Pending items of the owner, oldest first
    pub fn list_pending(&self, user_id: i64) -> Result<Vec<PendingReview>> {
        self.db.list_pending_reviews(user_id)
    }

    /// Resolve a pending item into a transaction (or a duplicate of one).
    ///
    /// When the last pending item of a job is settled, a `needs_review` or
    /// `partial` job becomes `ok`.
    pub fn confirm(&self, user_id: i64, item_id: i64, input: &ResolveReview) -> Result<ReviewOutcome> {
        let date = normalize_date(&input.date).map_err(|e| Error::InvalidData(e.to_string()))?;
        let description = normalize_description(&input.description);

        let outcome = self.db.write_transaction(|tx| {
            let item = get_review_item_on(tx, user_id, item_id)?
                .filter(|item| item.status == ReviewStatus::Pending)
                .ok_or_else(|| Error::NotFound(format!("pending review item {}", item_id)))?;

            check_references(tx, user_id, input.category_id, input.account_id)?;
            let account_id = input.account_id.or(item.suggested_account_id);

            let candidate = NewTransaction {
                date,
                description: description.clone(),
                amount_cents: input.amount_cents,
                category_id: input.category_id,
                account_id,
                source: TransactionSource::ImportReview,
                import_id: Some(item.import_id),
                ..Default::default()
            };

            let outcome = match insert_transaction_on(tx, user_id, &candidate)? {
                TransactionInsertResult::Duplicate(existing) => {
                    mark_review_on(tx, item.id, ReviewStatus::Duplicate, None)?;
                    ReviewOutcome::Duplicate {
                        transaction_id: existing,
                    }
                }
                TransactionInsertResult::Inserted(id) => {
                    let snapshot = ReviewSnapshot {
                        date: date.to_string(),
                        description: description.clone(),
                        amount_cents: input.amount_cents,
                        category_id: input.category_id,
                        account_id,
                    };
                    mark_review_on(tx, item.id, ReviewStatus::Resolved, Some(&snapshot))?;
                    ReviewOutcome::Resolved { transaction_id: id }
                }
            };

            if count_pending_for_import_on(tx, item.import_id)? == 0 {
                if let Some(job) = get_import_on(tx, user_id, item.import_id)? {
                    if matches!(job.status, ImportStatus::NeedsReview | ImportStatus::Partial) {
                        update_import_on(tx, job.id, ImportStatus::Ok, job.notes.as_deref())?;
                        info!(import_id = job.id, "Import fully reviewed");
                    }
                }
            }

            Ok(outcome)
        })?;

        info!(item_id, outcome = ?outcome, "Review item confirmed");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&ReviewOutcome::Resolved { transaction_id: 7 }).unwrap();
        assert_eq!(json, r#"{"status":"resolved","transaction_id":7}"#);

        let json = serde_json::to_string(&ReviewOutcome::Duplicate { transaction_id: 3 }).unwrap();
        assert_eq!(json, r#"{"status":"duplicate","transaction_id":3}"#);
        assert_eq!(ReviewOutcome::Duplicate { transaction_id: 3 }.transaction_id(), 3);
    }
}
