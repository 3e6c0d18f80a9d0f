//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Datelike, Local};
use http_body_util::BodyExt;
use tally_core::{MockOracle, OracleClient};
use tower::ServiceExt;

const SECRET: &[u8] = b"server-test-secret-server-test-secret";
const BOUNDARY: &str = "tally-test-boundary";

struct TestApp {
    app: Router,
    db: Database,
    token: String,
}

fn build_app(db: &Database, oracle: Option<OracleClient>) -> Router {
    let identity = LocalIdentity::new(db.clone(), SECRET);
    let state = AppState::new(db.clone(), identity)
        .with_oracle(oracle)
        .with_oracle_timeout(Duration::from_millis(500));
    create_router(state, ServerConfig::default())
}

fn access_token(db: &Database, email: &str) -> String {
    let identity = LocalIdentity::new(db.clone(), SECRET);
    let user = identity.register(email, "segredo123").unwrap();
    identity.issue_tokens(user.id).unwrap().access_token
}

fn setup_test_app() -> TestApp {
    setup_test_app_with_oracle(None)
}

fn setup_test_app_with_oracle(oracle: Option<OracleClient>) -> TestApp {
    let db = Database::in_memory().unwrap();
    let token = access_token(&db, "ana@example.com");
    TestApp {
        app: build_app(&db, oracle),
        db,
        token,
    }
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

/// Multipart body with a `file` part plus plain text fields
fn multipart_body(filename: &str, contents: &[u8], fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn upload(
    t: &TestApp,
    filename: &str,
    contents: &str,
    fields: &[(&str, &str)],
) -> axum::response::Response {
    let request = Request::builder()
        .method("POST")
        .uri("/api/imports/tabular")
        .header("authorization", format!("Bearer {}", t.token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(
            filename,
            contents.as_bytes(),
            fields,
        )))
        .unwrap();
    t.app.clone().oneshot(request).await.unwrap()
}

const STATEMENT: &str = "date,description,amount\n\
                         2026-02-01,PADARIA REAL,-12.50\n\
                         2026-02-03,UBER *TRIP,-23.00\n\
                         2026-02-05,SALARIO,5000.00\n";

// ========== Health & Auth ==========

#[tokio::test]
async fn test_health_needs_no_auth() {
    let t = setup_test_app();

    let response = send(&t.app, "GET", "/api/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["ok"], true);
}

#[tokio::test]
async fn test_protected_routes_require_bearer_token() {
    let t = setup_test_app();

    let response = send(&t.app, "GET", "/api/transactions", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&t.app, "GET", "/api/transactions", Some("garbage"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&t.app, "GET", "/api/transactions", Some(&t.token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_login_refresh_flow() {
    let t = setup_test_app();
    let credentials = serde_json::json!({"email": "bia@example.com", "password": "outrasenha"});

    let response = send(&t.app, "POST", "/api/auth/register", None, Some(credentials.clone())).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let registered = get_body_json(response).await;
    assert_eq!(registered["email"], "bia@example.com");

    // Same email again
    let response = send(&t.app, "POST", "/api/auth/register", None, Some(credentials.clone())).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(&t.app, "POST", "/api/auth/login", None, Some(credentials)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let tokens = get_body_json(response).await;
    assert_eq!(tokens["token_type"], "bearer");
    let access = tokens["access_token"].as_str().unwrap().to_string();
    let refresh = tokens["refresh_token"].as_str().unwrap().to_string();

    let response = send(&t.app, "GET", "/api/me", Some(&access), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["id"], registered["id"]);

    // A refresh token is not an access token
    let response = send(&t.app, "GET", "/api/me", Some(&refresh), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &t.app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(serde_json::json!({"refresh_token": refresh})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(get_body_json(response).await["access_token"].is_string());

    let response = send(
        &t.app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(serde_json::json!({"refresh_token": access})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_and_register_validation() {
    let t = setup_test_app();

    let response = send(
        &t.app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({"email": "ana@example.com", "password": "errada"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &t.app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({"email": "caio@example.com", "password": "123"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Accounts & Categories ==========

#[tokio::test]
async fn test_accounts_and_categories_are_idempotent() {
    let t = setup_test_app();

    let response = send(&t.app, "POST", "/api/accounts", Some(&t.token), Some(serde_json::json!({"name": "Nubank"}))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = get_body_json(response).await;
    let second = get_body_json(
        send(&t.app, "POST", "/api/accounts", Some(&t.token), Some(serde_json::json!({"name": "Nubank"}))).await,
    )
    .await;
    assert_eq!(first["id"], second["id"]);

    let response = send(&t.app, "POST", "/api/categories", Some(&t.token), Some(serde_json::json!({"name": "Mercado"}))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = get_body_json(response).await;
    let second = get_body_json(
        send(&t.app, "POST", "/api/categories", Some(&t.token), Some(serde_json::json!({"name": "mercado"}))).await,
    )
    .await;
    assert_eq!(first["id"], second["id"]);

    let response = send(&t.app, "GET", "/api/categories", Some(&t.token), None).await;
    assert_eq!(get_body_json(response).await.as_array().unwrap().len(), 1);

    let response = send(
        &t.app,
        "POST",
        "/api/accounts",
        Some(&t.token),
        Some(serde_json::json!({"name": "   "})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Import ==========

#[tokio::test]
async fn test_multipart_import_is_idempotent() {
    let t = setup_test_app();

    let response = upload(&t, "fev.csv", STATEMENT, &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = get_body_json(response).await;
    assert_eq!(report["inserted"], 3);
    assert_eq!(report["duplicates"], 0);
    assert_eq!(report["pending"], 0);

    let response = upload(&t, "fev.csv", STATEMENT, &[]).await;
    let report = get_body_json(response).await;
    assert_eq!(report["inserted"], 0);
    assert_eq!(report["duplicates"], 3);

    let response = send(&t.app, "GET", "/api/imports", Some(&t.token), None).await;
    assert_eq!(get_body_json(response).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_multipart_import_with_mapping_and_account() {
    let t = setup_test_app();
    let account = get_body_json(
        send(&t.app, "POST", "/api/accounts", Some(&t.token), Some(serde_json::json!({"name": "Itau"}))).await,
    )
    .await;
    let account_id = account["id"].as_i64().unwrap().to_string();

    let csv = "quando;o que;quanto\n10/02/2026;FARMACIA;-45,90\n";
    let mapping = r#"{"date":"quando","description":"o que","value":"quanto"}"#;
    let response = upload(
        &t,
        "itau.csv",
        csv,
        &[("mapping_json", mapping), ("account_id", account_id.as_str()), ("password", "")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = get_body_json(response).await;
    assert_eq!(report["inserted"], 1);

    let uri = format!("/api/transactions?account_id={}", account_id);
    let transactions = get_body_json(send(&t.app, "GET", &uri, Some(&t.token), None).await).await;
    let transactions = transactions.as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["amount_cents"], -4590);
    assert_eq!(transactions[0]["date"], "2026-02-10");
}

#[tokio::test]
async fn test_import_rejects_bad_form_values() {
    let t = setup_test_app();

    let response = upload(&t, "x.csv", STATEMENT, &[("mapping_json", "{not json")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = upload(&t, "x.csv", STATEMENT, &[("account_id", "abc")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Someone else's (or a missing) account
    let response = upload(&t, "x.csv", STATEMENT, &[("account_id", "999")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unparseable_file_returns_400_and_keeps_job() {
    let t = setup_test_app();

    let response = upload(&t, "fatura.xlsx", "definitely not a workbook", &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_body_json(response).await["error"], "Could not parse file");

    let jobs = get_body_json(send(&t.app, "GET", "/api/imports", Some(&t.token), None).await).await;
    let jobs = jobs.as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["status"], "needs_review");
    assert!(jobs[0]["notes"].as_str().unwrap().starts_with("parse_error: "));
}

#[tokio::test]
async fn test_json_import_decodes_base64() {
    use base64::Engine;

    let t = setup_test_app();
    let body = serde_json::json!({
        "filename": "fev.csv",
        "file_data": base64::engine::general_purpose::STANDARD.encode(STATEMENT),
    });

    let response = send(&t.app, "POST", "/api/imports/tabular/json", Some(&t.token), Some(body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["inserted"], 3);

    let body = serde_json::json!({"filename": "fev.csv", "file_data": "***"});
    let response = send(&t.app, "POST", "/api/imports/tabular/json", Some(&t.token), Some(body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_with_oracle_categorizes_expenses() {
    let t = setup_test_app_with_oracle(Some(OracleClient::mock(MockOracle::fixed("Transporte"))));

    let response = upload(&t, "fev.csv", STATEMENT, &[]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let categories = get_body_json(send(&t.app, "GET", "/api/categories", Some(&t.token), None).await).await;
    let transporte = categories
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "Transporte")
        .expect("oracle category created")["id"]
        .clone();

    let transactions =
        get_body_json(send(&t.app, "GET", "/api/transactions", Some(&t.token), None).await).await;
    for tx in transactions.as_array().unwrap() {
        if tx["amount_cents"].as_i64().unwrap() < 0 {
            assert_eq!(tx["category_id"], transporte);
        } else {
            assert!(tx["category_id"].is_null());
        }
    }
}

// ========== Review Queue ==========

#[tokio::test]
async fn test_review_confirm_closes_import() {
    let t = setup_test_app();
    let csv = "date,description,amount\n\
               2026-02-01,PADARIA,-12.50\n\
               ontem,MERCADO,-80.00\n";

    let report = get_body_json(upload(&t, "fev.csv", csv, &[]).await).await;
    assert_eq!(report["pending"], 1);
    let import_id = report["import_id"].as_i64().unwrap();

    let pending = get_body_json(send(&t.app, "GET", "/api/imports/pending", Some(&t.token), None).await).await;
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["row_number"], 2);
    let item_id = pending[0]["id"].as_i64().unwrap();

    let fix = serde_json::json!({
        "date": "2026-02-02",
        "description": "MERCADO",
        "amount_cents": -8000
    });
    let uri = format!("/api/imports/pending/{}/confirm", item_id);
    let response = send(&t.app, "PATCH", &uri, Some(&t.token), Some(fix.clone())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = get_body_json(response).await;
    assert_eq!(outcome["status"], "resolved");
    assert!(outcome["transaction_id"].is_i64());

    let uri_job = format!("/api/imports/{}", import_id);
    let job = get_body_json(send(&t.app, "GET", &uri_job, Some(&t.token), None).await).await;
    assert_eq!(job["status"], "ok");
    assert_eq!(job["pending_count"], 0);
    assert_eq!(job["resolved_count"], 1);

    let uri_tx = format!("/api/imports/{}/transactions", import_id);
    let transactions = get_body_json(send(&t.app, "GET", &uri_tx, Some(&t.token), None).await).await;
    assert_eq!(transactions.as_array().unwrap().len(), 2);

    // Already resolved
    let response = send(&t.app, "PATCH", &uri, Some(&t.token), Some(fix)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_review_confirm_of_existing_row_is_duplicate() {
    let t = setup_test_app();
    let csv = "date,description,amount\n\
               2026-02-01,PADARIA,-12.50\n\
               2026-02-01,PADARIA,abc\n";

    let report = get_body_json(upload(&t, "fev.csv", csv, &[]).await).await;
    assert_eq!(report["inserted"], 1);
    assert_eq!(report["pending"], 1);

    let pending = get_body_json(send(&t.app, "GET", "/api/imports/pending", Some(&t.token), None).await).await;
    let item_id = pending[0]["id"].as_i64().unwrap();

    let fix = serde_json::json!({
        "date": "01/02/2026",
        "description": "padaria",
        "amount_cents": -1250
    });
    let uri = format!("/api/imports/pending/{}/confirm", item_id);
    let outcome = get_body_json(send(&t.app, "PATCH", &uri, Some(&t.token), Some(fix)).await).await;
    assert_eq!(outcome["status"], "duplicate");
}

// ========== Transactions ==========

#[tokio::test]
async fn test_manual_transaction_edit_and_conflicts() {
    let t = setup_test_app();
    let lunch = serde_json::json!({"date": "2026-03-01", "description": "Almoco", "amount_cents": -3500});
    let dinner = serde_json::json!({"date": "2026-03-01", "description": "Jantar", "amount_cents": -5000});

    let response = send(&t.app, "POST", "/api/transactions", Some(&t.token), Some(lunch.clone())).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let lunch_id = get_body_json(response).await["id"].as_i64().unwrap();

    let response = send(&t.app, "POST", "/api/transactions", Some(&t.token), Some(lunch)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(&t.app, "POST", "/api/transactions", Some(&t.token), Some(dinner)).await;
    let dinner_id = get_body_json(response).await["id"].as_i64().unwrap();

    // Editing dinner into a copy of lunch collides
    let uri = format!("/api/transactions/{}", dinner_id);
    let edit = serde_json::json!({"description": "ALMOCO", "amount_cents": -3500});
    let response = send(&t.app, "PATCH", &uri, Some(&t.token), Some(edit)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let edit = serde_json::json!({"amount_cents": -5500});
    let response = send(&t.app, "PATCH", &uri, Some(&t.token), Some(edit)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["amount_cents"], -5500);

    let uri = format!("/api/transactions/{}", lunch_id);
    let response = send(&t.app, "DELETE", &uri, Some(&t.token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&t.app, "DELETE", &uri, Some(&t.token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_transaction_filters_and_bad_dates() {
    let t = setup_test_app();
    upload(&t, "fev.csv", STATEMENT, &[]).await;

    let response = send(
        &t.app,
        "GET",
        "/api/transactions?start_date=2026-02-02&end_date=2026-02-04",
        Some(&t.token),
        None,
    )
    .await;
    let transactions = get_body_json(response).await;
    assert_eq!(transactions.as_array().unwrap().len(), 1);
    assert_eq!(transactions[0]["description"], "UBER *TRIP");

    let response = send(&t.app, "GET", "/api/transactions?query=salario", Some(&t.token), None).await;
    assert_eq!(get_body_json(response).await.as_array().unwrap().len(), 1);

    let response = send(&t.app, "GET", "/api/transactions?start_date=02/2026", Some(&t.token), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_users_cannot_see_each_other() {
    let t = setup_test_app();
    let other = access_token(&t.db, "bia@example.com");

    let tx = serde_json::json!({"date": "2026-03-01", "description": "Almoco", "amount_cents": -3500});
    let response = send(&t.app, "POST", "/api/transactions", Some(&t.token), Some(tx)).await;
    let id = get_body_json(response).await["id"].as_i64().unwrap();
    let uri = format!("/api/transactions/{}", id);

    let response = send(&t.app, "GET", &uri, Some(&other), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(&t.app, "DELETE", &uri, Some(&other), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&t.app, "GET", "/api/transactions", Some(&other), None).await;
    assert!(get_body_json(response).await.as_array().unwrap().is_empty());

    let response = send(&t.app, "GET", &uri, Some(&t.token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ========== Installments & Reports ==========

#[tokio::test]
async fn test_installment_group_lifecycle_and_summary() {
    let t = setup_test_app();
    let today = Local::now().date_naive();
    let start = format!("{}-{:02}-01", today.year(), today.month());

    let body = serde_json::json!({
        "start_date": start,
        "base_description": "Geladeira",
        "total_cents": -300000,
        "installments": 3
    });
    let response = send(&t.app, "POST", "/api/installments/groups", Some(&t.token), Some(body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let group_id = get_body_json(response).await["id"].as_i64().unwrap();

    let uri = format!("/api/installments/groups/{}/transactions", group_id);
    let transactions = get_body_json(send(&t.app, "GET", &uri, Some(&t.token), None).await).await;
    let transactions = transactions.as_array().unwrap();
    assert_eq!(transactions.len(), 3);
    assert_eq!(transactions[0]["description"], "Geladeira (1/3)");
    assert_eq!(transactions[2]["amount_cents"], -100000);

    let summary = get_body_json(
        send(&t.app, "GET", "/api/reports/installments-summary?scope=this_month", Some(&t.token), None).await,
    )
    .await;
    assert_eq!(summary["total_cents"], 100000);

    let summary = get_body_json(
        send(&t.app, "GET", "/api/reports/installments-summary?scope=total", Some(&t.token), None).await,
    )
    .await;
    assert_eq!(summary["total_cents"], 300000);
    assert_eq!(summary["count"], 3);

    let response = send(
        &t.app,
        "GET",
        "/api/reports/installments-summary?scope=forever",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let uri_group = format!("/api/installments/groups/{}", group_id);
    let response = send(&t.app, "DELETE", &uri_group, Some(&t.token), None).await;
    assert_eq!(get_body_json(response).await["deleted"], true);
    let response = send(&t.app, "GET", &uri, Some(&t.token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_installment_group_validation() {
    let t = setup_test_app();

    let body = serde_json::json!({
        "start_date": "2026-01-10",
        "base_description": "TV",
        "total_cents": -100000,
        "installments": 0
    });
    let response = send(&t.app, "POST", "/api/installments/groups", Some(&t.token), Some(body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_monthly_and_category_reports() {
    let t = setup_test_app();
    upload(&t, "fev.csv", STATEMENT, &[]).await;

    let monthly = get_body_json(
        send(&t.app, "GET", "/api/reports/monthly?year=2026&month=2", Some(&t.token), None).await,
    )
    .await;
    assert_eq!(monthly["expenses_cents"], 3550);
    assert_eq!(monthly["income_cents"], 500000);
    assert_eq!(monthly["balance_cents"], 496450);

    let by_category = get_body_json(
        send(&t.app, "GET", "/api/reports/by-category?year=2026&month=2", Some(&t.token), None).await,
    )
    .await;
    let by_category = by_category.as_array().unwrap();
    assert_eq!(by_category.len(), 1);
    assert!(by_category[0]["category_id"].is_null());
    assert_eq!(by_category[0]["total_cents"], 3550);

    let all_time = get_body_json(
        send(&t.app, "GET", "/api/reports/by-category-total", Some(&t.token), None).await,
    )
    .await;
    assert_eq!(all_time, serde_json::Value::Array(by_category.clone()));

    let response = send(&t.app, "GET", "/api/reports/monthly?year=2026&month=13", Some(&t.token), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Audit ==========

#[tokio::test]
async fn test_audit_log_records_own_actions() {
    let t = setup_test_app();
    upload(&t, "fev.csv", STATEMENT, &[]).await;

    let entries = get_body_json(send(&t.app, "GET", "/api/audit", Some(&t.token), None).await).await;
    let entries = entries.as_array().unwrap();
    assert!(entries.iter().any(|e| e["action"] == "import"));

    let other = access_token(&t.db, "bia@example.com");
    let entries = get_body_json(send(&t.app, "GET", "/api/audit", Some(&other), None).await).await;
    assert!(entries.as_array().unwrap().is_empty());
}
