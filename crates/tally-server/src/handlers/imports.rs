//! Statement import, import history and review queue handlers

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;

use crate::{AppError, AppState, CurrentUser, MAX_PAGE_LIMIT, MAX_UPLOAD_SIZE};
use tally_core::models::{ImportJob, ImportJobSummary, ImportReviewItem, PendingReview, Transaction};
use tally_core::{
    ColumnMapping, ImportReport, ImportRequest, Importer, ResolveReview, ReviewOutcome,
    ReviewQueue,
};

fn too_large() -> AppError {
    AppError::bad_request(&format!(
        "File too large. Maximum size is {} MB",
        MAX_UPLOAD_SIZE / 1024 / 1024
    ))
}

fn parse_mapping(raw: Option<&str>) -> Result<Option<ColumnMapping>, AppError> {
    raw.filter(|s| !s.trim().is_empty())
        .map(serde_json::from_str::<ColumnMapping>)
        .transpose()
        .map_err(|e| AppError::bad_request(&format!("Invalid mapping_json: {}", e)))
}

/// POST /api/imports/tabular - Import a statement uploaded as multipart form
///
/// Fields: `file` (required), `password`, `mapping_json`, `account_id`.
pub async fn import_tabular(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Json<ImportReport>, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut password: Option<String> = None;
    let mut mapping_json: Option<String> = None;
    let mut account_id: Option<i64> = None;

    // Extract fields from multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("unknown").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file data"))?;
                if bytes.len() > MAX_UPLOAD_SIZE {
                    return Err(too_large());
                }
                file = Some((filename, bytes.to_vec()));
            }
            "password" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read password"))?;
                if !value.is_empty() {
                    password = Some(value);
                }
            }
            "mapping_json" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read mapping_json"))?;
                mapping_json = Some(value);
            }
            "account_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read account_id"))?;
                let value = value.trim();
                if !value.is_empty() {
                    account_id = Some(value.parse().map_err(|_| {
                        AppError::bad_request(&format!("Invalid account_id: {}", value))
                    })?);
                }
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or_else(|| AppError::bad_request("Missing file field"))?;

    let request = ImportRequest {
        user_id: user.0,
        filename,
        bytes,
        password,
        mapping: parse_mapping(mapping_json.as_deref())?,
        account_id,
    };
    import_tabular_core(&state, user, request).await
}

/// JSON variant of the statement upload
#[derive(Debug, Deserialize)]
pub struct ImportTabularJsonRequest {
    pub filename: String,
    /// File contents, base64-encoded
    pub file_data: String,
    pub password: Option<String>,
    pub mapping: Option<ColumnMapping>,
    pub account_id: Option<i64>,
}

/// POST /api/imports/tabular/json - Import a statement sent as base64 JSON
pub async fn import_tabular_json(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<ImportTabularJsonRequest>,
) -> Result<Json<ImportReport>, AppError> {
    use base64::Engine;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(body.file_data.trim())
        .map_err(|e| AppError::bad_request(&format!("Invalid base64 data: {}", e)))?;
    if bytes.len() > MAX_UPLOAD_SIZE {
        return Err(too_large());
    }

    let request = ImportRequest {
        user_id: user.0,
        filename: body.filename,
        bytes,
        password: body.password.filter(|p| !p.is_empty()),
        mapping: body.mapping,
        account_id: body.account_id,
    };
    import_tabular_core(&state, user, request).await
}

/// Core import logic shared by the multipart and JSON uploads
async fn import_tabular_core(
    state: &AppState,
    user: CurrentUser,
    request: ImportRequest,
) -> Result<Json<ImportReport>, AppError> {
    let report = Importer::new(&state.db)
        .with_oracle(state.oracle.as_ref(), state.oracle_timeout)
        .import(&request)
        .await?;

    info!(
        import_id = report.import_id,
        inserted = report.inserted,
        duplicates = report.duplicates,
        pending = report.pending,
        "Statement imported"
    );

    state.db.log_audit(
        &user.actor(),
        "import",
        Some("import"),
        Some(report.import_id),
        Some(&format!(
            "filename={}, inserted={}, duplicates={}, pending={}",
            request.filename, report.inserted, report.duplicates, report.pending
        )),
    )?;

    Ok(Json(report))
}

/// Query parameters for listing imports
#[derive(Debug, Deserialize)]
pub struct ImportsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// GET /api/imports - Import history, newest first
pub async fn list_imports(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ImportsQuery>,
) -> Result<Json<Vec<ImportJob>>, AppError> {
    let limit = params.limit.max(1).min(MAX_PAGE_LIMIT);
    Ok(Json(state.db.list_imports(user.0, limit)?))
}

/// GET /api/imports/:id - One import with its review counters
pub async fn get_import(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<ImportJobSummary>, AppError> {
    let summary = state
        .db
        .get_import_summary(user.0, id)?
        .ok_or_else(|| AppError::not_found("Import not found"))?;
    Ok(Json(summary))
}

/// GET /api/imports/:id/transactions - Transactions created by an import
pub async fn get_import_transactions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    state
        .db
        .get_import(user.0, id)?
        .ok_or_else(|| AppError::not_found("Import not found"))?;

    Ok(Json(state.db.list_import_transactions(user.0, id)?))
}

/// GET /api/imports/:id/review - Every review item of an import, whatever its status
pub async fn get_import_review_items(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ImportReviewItem>>, AppError> {
    state
        .db
        .get_import(user.0, id)?
        .ok_or_else(|| AppError::not_found("Import not found"))?;

    Ok(Json(state.db.list_review_items(user.0, id)?))
}

/// GET /api/imports/pending - Pending review items, oldest first
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<PendingReview>>, AppError> {
    Ok(Json(ReviewQueue::new(&state.db).list_pending(user.0)?))
}

/// PATCH /api/imports/pending/:id/confirm - Resolve a pending row
pub async fn confirm_pending(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<ResolveReview>,
) -> Result<Json<ReviewOutcome>, AppError> {
    let outcome = ReviewQueue::new(&state.db).confirm(user.0, id, &body)?;

    state.db.log_audit(
        &user.actor(),
        "confirm",
        Some("review_item"),
        Some(id),
        Some(&format!("transaction_id={}", outcome.transaction_id())),
    )?;

    Ok(Json(outcome))
}
