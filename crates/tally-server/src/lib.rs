//! Tally Web Server
//!
//! Axum-based REST API for the Tally ledger backend.
//!
//! Security features:
//! - Bearer token authentication on everything but `/api/health` and `/api/auth/*`
//! - Every query scoped to the authenticated owner
//! - Restrictive CORS policy
//! - Input validation (pagination limits, upload size limits)
//! - Audit logging for API access
//! - Sanitized error responses

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use tally_core::oracle::{timeout_from_env, CategoryOracle};
use tally_core::{Database, IdentityProvider, LocalIdentity, OracleClient, TokenKind};

mod handlers;

/// Maximum file upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Room for multipart framing and the base64 expansion of JSON uploads
const MAX_BODY_SIZE: usize = MAX_UPLOAD_SIZE * 4 / 3 + 64 * 1024;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub identity: LocalIdentity,
    /// Category oracle, when one is configured
    pub oracle: Option<OracleClient>,
    /// Upper bound for a single oracle call during import
    pub oracle_timeout: Duration,
}

impl AppState {
    pub fn new(db: Database, identity: LocalIdentity) -> Self {
        Self {
            db,
            identity,
            oracle: None,
            oracle_timeout: timeout_from_env(),
        }
    }

    pub fn with_oracle(mut self, oracle: Option<OracleClient>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }
}

/// The authenticated owner of a request, set by [`auth_middleware`]
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub i64);

impl CurrentUser {
    /// Actor name recorded in the audit log
    pub fn actor(&self) -> String {
        format!("user:{}", self.0)
    }
}

/// Authentication middleware - validates the bearer access token and records
/// the owner in the request extensions
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        warn!(path = %request.uri().path(), "Unauthorized request - no bearer token");
        return unauthorized();
    };

    match state.identity.validate(token, TokenKind::Access) {
        Ok(user_id) => {
            request.extensions_mut().insert(CurrentUser(user_id));
            next.run(request).await
        }
        Err(e) => {
            warn!(error = %e, path = %request.uri().path(), "Invalid bearer token");
            unauthorized()
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(state: AppState, config: ServerConfig) -> Router {
    if let Some(ref oracle) = state.oracle {
        info!(
            "Category oracle configured: {} (model: {}, timeout: {:?})",
            oracle.host(),
            oracle.model(),
            state.oracle_timeout
        );
    } else {
        info!("Category oracle not configured (set TALLY_ORACLE_HOST to enable suggestions)");
    }

    let state = Arc::new(state);

    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh));

    let protected_routes = Router::new()
        // Auth
        .route("/me", get(handlers::get_me))
        // Accounts and categories
        .route(
            "/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(handlers::get_transaction)
                .patch(handlers::update_transaction)
                .delete(handlers::delete_transaction),
        )
        // Import
        .route("/imports/tabular", post(handlers::import_tabular))
        .route("/imports/tabular/json", post(handlers::import_tabular_json))
        // Import history
        .route("/imports", get(handlers::list_imports))
        .route("/imports/:id", get(handlers::get_import))
        .route(
            "/imports/:id/transactions",
            get(handlers::get_import_transactions),
        )
        .route("/imports/:id/review", get(handlers::get_import_review_items))
        // Review queue
        .route("/imports/pending", get(handlers::list_pending))
        .route(
            "/imports/pending/:id/confirm",
            patch(handlers::confirm_pending),
        )
        // Installment groups
        .route(
            "/installments/groups",
            post(handlers::create_installment_group),
        )
        .route(
            "/installments/groups/:id",
            get(handlers::get_installment_group).delete(handlers::delete_installment_group),
        )
        .route(
            "/installments/groups/:id/transactions",
            get(handlers::list_group_transactions),
        )
        // Reports
        .route("/reports/monthly", get(handlers::report_monthly))
        .route("/reports/by-category", get(handlers::report_by_category))
        .route(
            "/reports/by-category-total",
            get(handlers::report_by_category_total),
        )
        .route(
            "/reports/installments-summary",
            get(handlers::report_installments_summary),
        )
        // Audit log
        .route("/audit", get(handlers::list_audit_log))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = public_routes.merge(protected_routes);

    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server
pub async fn serve(
    state: AppState,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let app = create_router(state, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn conflict(msg: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Client-facing mapping of core errors; None for server-side failures
    fn from_core(err: &tally_core::Error) -> Option<Self> {
        use tally_core::Error;

        match err {
            Error::Parse { .. } => Some(Self::bad_request("Could not parse file")),
            Error::InvalidData(msg) => Some(Self::bad_request(msg)),
            Error::NotFound(msg) => Some(Self::not_found(&format!("Not found: {}", msg))),
            Error::Conflict(msg) => Some(Self::conflict(msg)),
            Error::Auth(_) => Some(Self::unauthorized("Invalid credentials")),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        if let Some(mapped) = err.downcast_ref::<tally_core::Error>().and_then(Self::from_core) {
            return mapped;
        }
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
