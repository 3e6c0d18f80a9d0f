//! Account and category handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;

use crate::{AppError, AppState, CurrentUser};
use tally_core::models::{Account, Category};

/// Request body for creating an account or a category
#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

impl NameRequest {
    fn validated(&self, what: &str) -> Result<&str, AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request(&format!("{} name is required", what)));
        }
        Ok(name)
    }
}

/// GET /api/accounts - List the user's accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<Account>>, AppError> {
    let accounts = state.db.list_accounts(user.0)?;
    Ok(Json(accounts))
}

/// POST /api/accounts - Create an account (returns the existing one on a name match)
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<NameRequest>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let name = body.validated("Account")?;
    let account = state.db.create_account(user.0, name)?;

    state.db.log_audit(
        &user.actor(),
        "create",
        Some("account"),
        Some(account.id),
        Some(&format!("name={}", account.name)),
    )?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /api/categories - List the user's categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<Category>>, AppError> {
    let categories = state.db.list_categories(user.0)?;
    Ok(Json(categories))
}

/// POST /api/categories - Create a category (case-insensitive name match returns the existing one)
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<NameRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let name = body.validated("Category")?;
    let category = state.db.create_category(user.0, name)?;

    state.db.log_audit(
        &user.actor(),
        "create",
        Some("category"),
        Some(category.id),
        Some(&format!("name={}", category.name)),
    )?;

    Ok((StatusCode::CREATED, Json(category)))
}
