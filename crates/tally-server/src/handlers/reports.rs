//! Report handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Datelike, Local};
use serde::Deserialize;

use crate::{AppError, AppState, CurrentUser};
use tally_core::models::{CategoryTotal, InstallmentScope, InstallmentSummary, MonthlySummary};

/// Query parameters for month reports. Missing parts default to the current month.
#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl MonthQuery {
    fn resolve(&self) -> (i32, u32) {
        let today = Local::now().date_naive();
        (
            self.year.unwrap_or_else(|| today.year()),
            self.month.unwrap_or_else(|| today.month()),
        )
    }
}

/// GET /api/reports/monthly - Expenses, income and balance for a month
pub async fn report_monthly(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<MonthQuery>,
) -> Result<Json<MonthlySummary>, AppError> {
    let (year, month) = params.resolve();
    Ok(Json(state.db.monthly_summary(user.0, year, month)?))
}

/// GET /api/reports/by-category - Expense totals per category for a month
pub async fn report_by_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<MonthQuery>,
) -> Result<Json<Vec<CategoryTotal>>, AppError> {
    let period = params.resolve();
    Ok(Json(state.db.spending_by_category(user.0, Some(period))?))
}

/// GET /api/reports/by-category-total - Expense totals per category, all time
pub async fn report_by_category_total(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<CategoryTotal>>, AppError> {
    Ok(Json(state.db.spending_by_category(user.0, None)?))
}

#[derive(Debug, Deserialize)]
pub struct InstallmentsQuery {
    /// `this_month` (default), `next_month` or `total`
    pub scope: Option<String>,
}

/// GET /api/reports/installments-summary - Installment expenses due in a window
pub async fn report_installments_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<InstallmentsQuery>,
) -> Result<Json<InstallmentSummary>, AppError> {
    let scope = match params.scope.as_deref() {
        Some(raw) => raw
            .parse::<InstallmentScope>()
            .map_err(|e| AppError::bad_request(&e))?,
        None => InstallmentScope::default(),
    };
    let today = Local::now().date_naive();
    Ok(Json(state.db.installments_summary(user.0, scope, today)?))
}
