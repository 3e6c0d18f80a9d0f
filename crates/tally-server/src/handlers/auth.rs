//! Authentication-related handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState, CurrentUser};
use tally_core::models::User;
use tally_core::{IdentityProvider, TokenKind, TokenPair};

/// Liveness response
#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// Email/password body for register and login
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Response for a newly registered user
#[derive(Serialize)]
pub struct RegisterResponse {
    pub id: i64,
    pub email: String,
}

/// POST /api/auth/register - Create a user
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Credentials>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let user = state.identity.register(&body.email, &body.password)?;

    state.db.log_audit(
        &CurrentUser(user.id).actor(),
        "register",
        Some("user"),
        Some(user.id),
        None,
    )?;
    info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            email: user.email,
        }),
    ))
}

/// POST /api/auth/login - Exchange credentials for a token pair
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Credentials>,
) -> Result<Json<TokenPair>, AppError> {
    let user_id = state.identity.authenticate(&body.email, &body.password)?;
    let tokens = state.identity.issue_tokens(user_id)?;

    state
        .db
        .log_audit(&CurrentUser(user_id).actor(), "login", Some("user"), Some(user_id), None)?;

    Ok(Json(tokens))
}

/// Refresh token body
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /api/auth/refresh - Exchange a refresh token for a new pair
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let user_id = state
        .identity
        .validate(&body.refresh_token, TokenKind::Refresh)?;
    Ok(Json(state.identity.issue_tokens(user_id)?))
}

/// GET /api/me - The authenticated user
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<User>, AppError> {
    let found = state
        .db
        .get_user(user.0)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(found))
}
