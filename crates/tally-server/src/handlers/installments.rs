//! Installment group handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;

use crate::{AppError, AppState, CurrentUser};
use tally_core::models::{InstallmentGroup, Transaction};
use tally_core::NewInstallmentGroup;

/// POST /api/installments/groups - Create a group and all its installments
pub async fn create_installment_group(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<NewInstallmentGroup>,
) -> Result<(StatusCode, Json<InstallmentGroup>), AppError> {
    let group = state.db.create_installment_group(user.0, &body)?;

    state.db.log_audit(
        &user.actor(),
        "create",
        Some("installment_group"),
        Some(group.id),
        Some(&format!(
            "installments={}, total_cents={}",
            group.installments, group.total_cents
        )),
    )?;

    Ok((StatusCode::CREATED, Json(group)))
}

/// GET /api/installments/groups/:id
pub async fn get_installment_group(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<InstallmentGroup>, AppError> {
    let group = state
        .db
        .get_installment_group(user.0, id)?
        .ok_or_else(|| AppError::not_found("Installment group not found"))?;
    Ok(Json(group))
}

/// GET /api/installments/groups/:id/transactions
pub async fn list_group_transactions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    Ok(Json(state.db.list_group_transactions(user.0, id)?))
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// DELETE /api/installments/groups/:id - Delete a group with its transactions
pub async fn delete_installment_group(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, AppError> {
    if !state.db.delete_installment_group(user.0, id)? {
        return Err(AppError::not_found("Installment group not found"));
    }

    state.db.log_audit(
        &user.actor(),
        "delete",
        Some("installment_group"),
        Some(id),
        None,
    )?;

    Ok(Json(DeletedResponse { deleted: true }))
}
