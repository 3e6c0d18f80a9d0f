//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{AppError, AppState, CurrentUser, SuccessResponse, MAX_PAGE_LIMIT};
use tally_core::models::{Transaction, TransactionUpdate};
use tally_core::{ManualTransaction, TransactionFilter};

/// Query parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    /// Inclusive lower bound (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// Inclusive upper bound (YYYY-MM-DD)
    pub end_date: Option<String>,
    pub category_id: Option<i64>,
    pub account_id: Option<i64>,
    /// Case-insensitive description search
    pub query: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    500
}

fn parse_query_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, AppError> {
    value
        .filter(|s| !s.trim().is_empty())
        .map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d"))
        .transpose()
        .map_err(|_| AppError::bad_request(&format!("Invalid {} (use YYYY-MM-DD)", field)))
}

/// GET /api/transactions - List transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<TransactionQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    // Input validation: clamp pagination parameters
    let limit = params.limit.max(1).min(MAX_PAGE_LIMIT);
    let offset = params.offset.max(0);

    let filter = TransactionFilter::new()
        .start_date(parse_query_date(params.start_date.as_deref(), "start_date")?)
        .end_date(parse_query_date(params.end_date.as_deref(), "end_date")?)
        .category_id(params.category_id)
        .account_id(params.account_id)
        .search(params.query.as_deref())
        .page(Some(limit), Some(offset));

    let transactions = state.db.list_transactions(user.0, filter)?;
    Ok(Json(transactions))
}

/// POST /api/transactions - Record a manual transaction
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<ManualTransaction>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let transaction = state.db.create_manual_transaction(user.0, &body)?;

    state.db.log_audit(
        &user.actor(),
        "create",
        Some("transaction"),
        Some(transaction.id),
        Some(&format!("amount_cents={}", transaction.amount_cents)),
    )?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// GET /api/transactions/:id - Get a single transaction
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state
        .db
        .get_transaction(user.0, id)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;
    Ok(Json(transaction))
}

/// PATCH /api/transactions/:id - Edit a transaction (409 when the edit makes it a duplicate)
pub async fn update_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<TransactionUpdate>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state.db.update_transaction(user.0, id, &body)?;

    state
        .db
        .log_audit(&user.actor(), "update", Some("transaction"), Some(id), None)?;

    Ok(Json(transaction))
}

/// DELETE /api/transactions/:id - Delete a transaction
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.db.delete_transaction(user.0, id)? {
        return Err(AppError::not_found("Transaction not found"));
    }

    state
        .db
        .log_audit(&user.actor(), "delete", Some("transaction"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}
