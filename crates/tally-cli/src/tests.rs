//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::path::PathBuf;

use chrono::{Datelike, Local};
use tally_core::db::{Database, NewInstallmentGroup, TransactionFilter};
use tally_core::import::ReviewOutcome;
use tally_core::oracle::{MockOracle, OracleClient};

use crate::commands::{self, format_cents, truncate, ImportOptions, ReviewFix};

const EMAIL: &str = "ana@example.com";

const STATEMENT: &str = "date,description,amount\n\
                         2026-02-01,PADARIA REAL,-12.50\n\
                         2026-02-03,UBER *TRIP,-23.00\n\
                         2026-02-05,SALARIO,5000.00\n";

fn setup_test_db() -> Database {
    let db = Database::in_memory().unwrap();
    commands::cmd_user_add(&db, EMAIL, Some("segredo123")).unwrap();
    db
}

fn user_id(db: &Database) -> i64 {
    db.get_user_by_email(EMAIL).unwrap().unwrap().id
}

/// Write a statement to a temp dir, returning the dir guard and the file path
fn statement_file(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    (dir, path)
}

fn offline() -> ImportOptions<'static> {
    ImportOptions {
        use_oracle: false,
        ..Default::default()
    }
}

// ========== Utility Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("PADARIA", 10), "PADARIA");
    assert_eq!(truncate("SUPERMERCADO EXTRA", 10), "SUPERME...");
    assert_eq!(truncate("AÇÚCAR UNIÃO", 8), "AÇÚCA...");
}

#[test]
fn test_format_cents() {
    assert_eq!(format_cents(0), "0.00");
    assert_eq!(format_cents(-4590), "-45.90");
    assert_eq!(format_cents(500000), "5000.00");
    assert_eq!(format_cents(-5), "-0.05");
}

#[test]
fn test_open_db_unencrypted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tally.db");
    commands::cmd_init(&path, true).unwrap();
    assert!(path.exists());

    let db = commands::open_db(&path, true).unwrap();
    assert!(!db.is_encrypted().unwrap());
}

// ========== User Command Tests ==========

#[test]
fn test_cmd_user_add_and_duplicate() {
    let db = setup_test_db();
    assert!(db.get_user_by_email(EMAIL).unwrap().is_some());

    let result = commands::cmd_user_add(&db, EMAIL, Some("outrasenha"));
    assert!(result.is_err());
}

#[test]
fn test_cmd_user_add_validation() {
    let db = Database::in_memory().unwrap();
    assert!(commands::cmd_user_add(&db, "bia@example.com", Some("123")).is_err());
    assert!(commands::cmd_user_add(&db, "not-an-email", Some("segredo123")).is_err());
    assert!(db.get_user_by_email("bia@example.com").unwrap().is_none());
}

#[test]
fn test_cmd_user_delete_requires_yes() {
    let db = setup_test_db();

    commands::cmd_user_delete(&db, EMAIL, false).unwrap();
    assert!(db.get_user_by_email(EMAIL).unwrap().is_some());

    commands::cmd_user_delete(&db, EMAIL, true).unwrap();
    assert!(db.get_user_by_email(EMAIL).unwrap().is_none());
}

#[test]
fn test_unknown_user_is_an_error() {
    let db = setup_test_db();
    assert!(commands::cmd_imports(&db, "nobody@example.com", 10).is_err());
    assert!(commands::cmd_review_list(&db, "nobody@example.com").is_err());
}

// ========== Import Command Tests ==========

#[tokio::test]
async fn test_cmd_import_is_idempotent() {
    let db = setup_test_db();
    let (_dir, path) = statement_file("fev.csv", STATEMENT);

    let first = commands::import_file(&db, EMAIL, &path, offline(), None)
        .await
        .unwrap();
    assert_eq!(first.inserted, 3);
    assert_eq!(first.pending, 0);

    let second = commands::import_file(&db, EMAIL, &path, offline(), None)
        .await
        .unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 3);

    let transactions = db
        .list_transactions(user_id(&db), TransactionFilter::new())
        .unwrap();
    assert_eq!(transactions.len(), 3);

    commands::cmd_imports(&db, EMAIL, 10).unwrap();
    assert_eq!(db.list_imports(user_id(&db), 10).unwrap().len(), 2);
}

#[tokio::test]
async fn test_cmd_import_with_account_and_mapping() {
    let db = setup_test_db();
    let csv = "Data;Historico;Valor\n01/03/2026;MERCADO;-45,90\n";
    let (_dir, path) = statement_file("marco.csv", csv);

    let options = ImportOptions {
        account: Some("Nubank"),
        mapping: Some(r#"{"date":"Data","description":"Historico","value":"Valor"}"#),
        ..offline()
    };
    let report = commands::import_file(&db, EMAIL, &path, options, None)
        .await
        .unwrap();
    assert_eq!(report.inserted, 1);

    let account = db
        .find_account_by_name(user_id(&db), "Nubank")
        .unwrap()
        .expect("account created");
    let transactions = db
        .list_import_transactions(user_id(&db), report.import_id)
        .unwrap();
    assert_eq!(transactions[0].amount_cents, -4590);
    assert_eq!(transactions[0].account_id, Some(account.id));
}

#[tokio::test]
async fn test_cmd_import_rejects_bad_mapping_json() {
    let db = setup_test_db();
    let (_dir, path) = statement_file("fev.csv", STATEMENT);

    let options = ImportOptions {
        mapping: Some("{not json"),
        ..offline()
    };
    let result = commands::import_file(&db, EMAIL, &path, options, None).await;
    assert!(result.is_err());
    assert!(db.list_imports(user_id(&db), 10).unwrap().is_empty());
}

#[tokio::test]
async fn test_cmd_import_missing_file() {
    let db = setup_test_db();
    let path = PathBuf::from("/nonexistent/extrato.csv");
    let result = commands::cmd_import(&db, EMAIL, &path, offline()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_import_with_oracle_categorizes_expenses() {
    let db = setup_test_db();
    let (_dir, path) = statement_file("fev.csv", STATEMENT);
    let oracle = OracleClient::mock(MockOracle::fixed("Transporte"));

    commands::import_file(&db, EMAIL, &path, offline(), Some(&oracle))
        .await
        .unwrap();

    let uid = user_id(&db);
    let transporte = db
        .list_categories(uid)
        .unwrap()
        .into_iter()
        .find(|c| c.name == "Transporte")
        .expect("oracle category created");
    for tx in db.list_transactions(uid, TransactionFilter::new()).unwrap() {
        if tx.amount_cents < 0 {
            assert_eq!(tx.category_id, Some(transporte.id));
        } else {
            assert_eq!(tx.category_id, None);
        }
    }
}

// ========== Review Command Tests ==========

#[tokio::test]
async fn test_cmd_review_confirm() {
    let db = setup_test_db();
    let csv = "date,description,amount\n\
               2026-02-01,PADARIA,-12.50\n\
               ontem,MERCADO,-80.00\n";
    let (_dir, path) = statement_file("fev.csv", csv);

    let report = commands::import_file(&db, EMAIL, &path, offline(), None)
        .await
        .unwrap();
    assert_eq!(report.pending, 1);
    commands::cmd_review_list(&db, EMAIL).unwrap();

    let uid = user_id(&db);
    let item_id = db.list_pending_reviews(uid).unwrap()[0].id;
    let fix = ReviewFix {
        date: "02/02/2026",
        description: "MERCADO",
        amount: "80,00 DR",
        category_id: None,
        account_id: None,
    };
    let outcome = commands::cmd_review_confirm(&db, EMAIL, item_id, fix).unwrap();
    assert!(matches!(outcome, ReviewOutcome::Resolved { .. }));

    let transactions = db.list_import_transactions(uid, report.import_id).unwrap();
    let mercado = transactions
        .iter()
        .find(|t| t.id == outcome.transaction_id())
        .unwrap();
    assert_eq!(mercado.amount_cents, -8000);
    assert!(db.list_pending_reviews(uid).unwrap().is_empty());

    // Already resolved
    assert!(commands::cmd_review_confirm(&db, EMAIL, item_id, fix).is_err());
}

#[tokio::test]
async fn test_cmd_review_confirm_rejects_bad_amount() {
    let db = setup_test_db();
    let csv = "date,description,amount\n2026-02-01,PADARIA,abc\n";
    let (_dir, path) = statement_file("fev.csv", csv);
    commands::import_file(&db, EMAIL, &path, offline(), None)
        .await
        .unwrap();

    let item_id = db.list_pending_reviews(user_id(&db)).unwrap()[0].id;
    let fix = ReviewFix {
        date: "2026-02-01",
        description: "PADARIA",
        amount: "doze reais",
        category_id: None,
        account_id: None,
    };
    assert!(commands::cmd_review_confirm(&db, EMAIL, item_id, fix).is_err());
    assert_eq!(db.list_pending_reviews(user_id(&db)).unwrap().len(), 1);
}

// ========== Report Command Tests ==========

#[tokio::test]
async fn test_cmd_reports() {
    let db = setup_test_db();
    let (_dir, path) = statement_file("fev.csv", STATEMENT);
    commands::import_file(&db, EMAIL, &path, offline(), None)
        .await
        .unwrap();

    commands::cmd_report_monthly(&db, EMAIL, Some(2026), Some(2)).unwrap();
    commands::cmd_report_monthly(&db, EMAIL, None, None).unwrap();
    assert!(commands::cmd_report_monthly(&db, EMAIL, Some(2026), Some(13)).is_err());

    commands::cmd_report_by_category(&db, EMAIL, Some(2026), Some(2), false).unwrap();
    commands::cmd_report_by_category(&db, EMAIL, None, None, true).unwrap();

    let summary = db.monthly_summary(user_id(&db), 2026, 2).unwrap();
    assert_eq!(summary.expenses_cents, 3550);
    assert_eq!(summary.income_cents, 500000);
}

#[test]
fn test_cmd_report_installments() {
    let db = setup_test_db();
    let today = Local::now().date_naive();
    let group = NewInstallmentGroup {
        start_date: format!("{}-{:02}-01", today.year(), today.month()),
        base_description: "Geladeira".to_string(),
        total_cents: Some(-300000),
        amount_per_installment_cents: None,
        installments: 3,
        interval_months: 1,
        account_id: None,
        category_id: None,
    };
    db.create_installment_group(user_id(&db), &group).unwrap();

    commands::cmd_report_installments(&db, EMAIL, "this_month").unwrap();
    commands::cmd_report_installments(&db, EMAIL, "total").unwrap();
    assert!(commands::cmd_report_installments(&db, EMAIL, "someday").is_err());
}
