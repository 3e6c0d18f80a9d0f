//! Runs one statement file through parsing, normalization, dedupe and storage
//!
//! Two phases:
//! 1. Synchronous: job row, parse, per-row fold inside one IMMEDIATE
//!    transaction, final status. Each row gets its own savepoint so a row
//!    that fails halfway (e.g. one installment of several) leaves nothing.
//! 2. After commit, optional category suggestions for uncategorized expenses,
//!    each oracle call bounded by a timeout. Failures here are logged only.

use std::time::Duration;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::headers::{resolve_columns, ColumnMap, ColumnMapping};
use super::installments::{add_months, detect_installment, installment_description};
use super::normalize::{normalize_date_cell, normalize_description, parse_amount_to_cents};
use super::parser::parse_statement;
use super::{Cell, StatementRow};
use crate::db::{
    account_belongs_to, create_import_on, find_category_id_by_name, insert_review_item_on,
    insert_transaction_on, update_import_on, Database, TransactionInsertResult,
};
use crate::error::{Error, Result, RowError};
use crate::models::{ImportStatus, NewTransaction, SourceKind};
use crate::oracle::{
    allowed_category_names, validate_suggestion, CategoryOracle, OracleClient, DEFAULT_TIMEOUT,
};

/// One statement upload
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub user_id: i64,
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Workbook password, for protected `.xlsx` files
    pub password: Option<String>,
    /// Explicit column mapping; inferred from headers when absent
    pub mapping: Option<ColumnMapping>,
    /// Account every row is attached to (and deduped within)
    pub account_id: Option<i64>,
}

/// Counters returned to the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub import_id: i64,
    pub inserted: usize,
    pub duplicates: usize,
    pub pending: usize,
}

/// An inserted expense without a category, to offer to the oracle
#[derive(Debug, Clone)]
struct Uncategorized {
    transaction_id: i64,
    description: String,
    amount_cents: i64,
}

/// What one successfully folded row contributed
#[derive(Debug, Default)]
struct RowOutcome {
    inserted: Vec<(i64, NewTransaction)>,
    duplicates: usize,
}

/// Statement importer
pub struct Importer<'a> {
    db: &'a Database,
    oracle: Option<&'a OracleClient>,
    timeout: Duration,
}

impl<'a> Importer<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            oracle: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Suggest categories for uncategorized expenses after each import
    pub fn with_oracle(mut self, oracle: Option<&'a OracleClient>, timeout: Duration) -> Self {
        self.oracle = oracle;
        self.timeout = timeout;
        self
    }

    /// Import a statement, then ask the oracle (if any) for categories
    pub async fn import(&self, request: &ImportRequest) -> Result<ImportReport> {
        let (report, uncategorized) = self.store_rows(request)?;

        if let Some(oracle) = self.oracle {
            self.suggest_categories(oracle, request.user_id, uncategorized)
                .await;
        }

        Ok(report)
    }

    /// Import a statement without the oracle phase
    pub fn store(&self, request: &ImportRequest) -> Result<ImportReport> {
        self.store_rows(request).map(|(report, _)| report)
    }

    fn store_rows(&self, request: &ImportRequest) -> Result<(ImportReport, Vec<Uncategorized>)> {
        let user_id = request.user_id;
        if let Some(account_id) = request.account_id {
            let conn = self.db.conn()?;
            if !account_belongs_to(&conn, user_id, account_id)? {
                return Err(Error::InvalidData(format!("account {} not found", account_id)));
            }
        }

        let kind = SourceKind::from_filename(&request.filename);
        let import_id = {
            let conn = self.db.conn()?;
            create_import_on(&conn, user_id, kind, &request.filename)?
        };
        info!(
            import_id,
            kind = %kind,
            filename = %request.filename,
            "Import started"
        );

        let statement = match parse_statement(kind, &request.bytes, request.password.as_deref()) {
            Ok(statement) => statement,
            Err(e) => {
                let message = e.to_string();
                let conn = self.db.conn()?;
                update_import_on(
                    &conn,
                    import_id,
                    ImportStatus::NeedsReview,
                    Some(&format!("parse_error: {}", message)),
                )?;
                warn!(import_id, error = %message, "Could not parse statement");
                return Err(Error::Parse { import_id, message });
            }
        };

        let columns = resolve_columns(&statement.headers, request.mapping.as_ref());
        if let Err(ref e) = columns {
            debug!(import_id, headers = ?statement.headers, "Column resolution failed: {}", e);
        }

        let mut report = ImportReport {
            import_id,
            ..Default::default()
        };
        let mut uncategorized = Vec::new();

        let status = self.db.write_transaction(|tx| {
            let mut notes: Vec<String> = Vec::new();

            for (i, row) in statement.rows.iter().enumerate() {
                let idx = i + 1;
                let result = columns.clone().and_then(|map| {
                    let sp = tx.savepoint()?;
                    let outcome = store_row(&sp, user_id, import_id, kind, request, map, row)?;
                    sp.commit()?;
                    Ok(outcome)
                });

                match result {
                    Ok(outcome) => {
                        report.duplicates += outcome.duplicates;
                        report.inserted += outcome.inserted.len();
                        debug!(
                            row = idx,
                            inserted = outcome.inserted.len(),
                            duplicates = outcome.duplicates,
                            "Row imported"
                        );
                        for (id, t) in outcome.inserted {
                            if t.category_id.is_none() && t.amount_cents < 0 {
                                uncategorized.push(Uncategorized {
                                    transaction_id: id,
                                    description: t.description,
                                    amount_cents: t.amount_cents,
                                });
                            }
                        }
                    }
                    Err(e) => {
                        let message = e.to_string();
                        debug!(row = idx, error = %message, "Row sent to review");
                        report.pending += 1;
                        notes.push(format!("row {}: {}", idx, message));
                        insert_review_item_on(
                            tx,
                            import_id,
                            user_id,
                            idx as i64,
                            &row.to_json(),
                            &message,
                            request.account_id,
                        )?;
                    }
                }
            }

            let status = ImportStatus::from_counts(report.inserted, report.pending);
            let notes = (!notes.is_empty()).then(|| notes.join("\n"));
            update_import_on(tx, import_id, status, notes.as_deref())?;
            Ok(status)
        })?;

        info!(
            import_id,
            inserted = report.inserted,
            duplicates = report.duplicates,
            pending = report.pending,
            status = %status,
            "Import finished"
        );

        Ok((report, uncategorized))
    }

    async fn suggest_categories(
        &self,
        oracle: &OracleClient,
        user_id: i64,
        items: Vec<Uncategorized>,
    ) {
        if items.is_empty() {
            return;
        }

        let existing: Vec<String> = match self.db.list_categories(user_id) {
            Ok(categories) => categories.into_iter().map(|c| c.name).collect(),
            Err(e) => {
                warn!("Failed to load categories for oracle: {}", e);
                return;
            }
        };
        let allowed = allowed_category_names(&existing);

        for item in items {
            let call = oracle.suggest_category(&item.description, item.amount_cents, &allowed);
            let suggested = match tokio::time::timeout(self.timeout, call).await {
                Ok(Ok(Some(name))) => validate_suggestion(&name, &allowed),
                Ok(Ok(None)) => {
                    debug!(transaction_id = item.transaction_id, "Oracle had no suggestion");
                    continue;
                }
                Ok(Err(e)) => {
                    warn!(
                        transaction_id = item.transaction_id,
                        model = oracle.model(),
                        "Category oracle failed: {}",
                        e
                    );
                    continue;
                }
                Err(_) => {
                    warn!(
                        transaction_id = item.transaction_id,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Category oracle timed out"
                    );
                    continue;
                }
            };

            match self
                .db
                .assign_suggested_category(user_id, &[item.transaction_id], &suggested)
            {
                Ok(_) => debug!(
                    transaction_id = item.transaction_id,
                    category = %suggested,
                    "Applied oracle category"
                ),
                Err(e) => warn!("Failed to apply oracle category: {}", e),
            }
        }
    }
}

/// Normalize one row and write its transaction(s)
fn store_row(
    conn: &Connection,
    user_id: i64,
    import_id: i64,
    kind: SourceKind,
    request: &ImportRequest,
    columns: ColumnMap,
    row: &StatementRow,
) -> std::result::Result<RowOutcome, RowError> {
    let category_id = match row.cell(columns.category) {
        Cell::Empty => None,
        cell => {
            let name = cell.to_string();
            if name.trim().is_empty() {
                None
            } else {
                find_category_id_by_name(conn, user_id, &name)?
            }
        }
    };

    let mut outcome = RowOutcome::default();
    for mut candidate in candidates(row, columns)? {
        candidate.category_id = category_id;
        candidate.account_id = request.account_id;
        candidate.source = kind.transaction_source();
        candidate.import_id = Some(import_id);

        match insert_transaction_on(conn, user_id, &candidate)? {
            TransactionInsertResult::Inserted(id) => outcome.inserted.push((id, candidate)),
            TransactionInsertResult::Duplicate(_) => outcome.duplicates += 1,
        }
    }
    Ok(outcome)
}

/// The transaction(s) a row stands for: one, or one per installment
fn candidates(
    row: &StatementRow,
    columns: ColumnMap,
) -> std::result::Result<Vec<NewTransaction>, RowError> {
    let date = normalize_date_cell(row.cell(columns.date))?;
    let description = normalize_description(&row.cell(columns.description).to_string());
    let amount_cents = parse_amount_to_cents(row.cell(columns.amount))?;

    let Some(installment) = detect_installment(&description) else {
        return Ok(vec![NewTransaction {
            date,
            description,
            amount_cents,
            ..Default::default()
        }]);
    };

    let total = installment.total;
    Ok((1..=total)
        .map(|index| NewTransaction {
            date: add_months(date, index - 1),
            description: installment_description(&installment.base, index, total),
            amount_cents,
            installment_number: Some(i64::from(index)),
            installment_total: Some(i64::from(total)),
            ..Default::default()
        })
        .collect())
}
