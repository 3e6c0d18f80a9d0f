//! Statement import and import history commands

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{
    db::Database,
    import::{ColumnMapping, ImportReport, ImportRequest, Importer},
    oracle::{self, CategoryOracle, OracleClient},
};

use super::{find_user, truncate};

/// Flags of `tally import` besides the owner and file
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions<'a> {
    pub account: Option<&'a str>,
    pub password: Option<&'a str>,
    pub mapping: Option<&'a str>,
    pub use_oracle: bool,
}

pub async fn cmd_import(
    db: &Database,
    user_email: &str,
    file: &Path,
    options: ImportOptions<'_>,
) -> Result<()> {
    let oracle = if options.use_oracle {
        OracleClient::from_env()
    } else {
        None
    };
    match &oracle {
        Some(client) => println!(
            "🤖 Category suggestions: {} ({})",
            client.model(),
            client.host()
        ),
        None if options.use_oracle => {
            println!("   Category suggestions disabled (no oracle configured)")
        }
        None => {}
    }

    import_file(db, user_email, file, options, oracle.as_ref()).await?;
    Ok(())
}

/// Run one import with an already-resolved oracle
pub async fn import_file(
    db: &Database,
    user_email: &str,
    file: &Path,
    options: ImportOptions<'_>,
    oracle: Option<&OracleClient>,
) -> Result<ImportReport> {
    let user = find_user(db, user_email)?;

    let mapping = options
        .mapping
        .map(|raw| serde_json::from_str::<ColumnMapping>(raw))
        .transpose()
        .context("Invalid --mapping JSON")?;

    let account_id = options
        .account
        .map(|name| db.create_account(user.id, name))
        .transpose()?
        .map(|account| account.id);

    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read file: {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    println!("📥 Importing {}...", file.display());

    let request = ImportRequest {
        user_id: user.id,
        filename,
        bytes,
        password: options.password.map(str::to_string),
        mapping,
        account_id,
    };

    let report = Importer::new(db)
        .with_oracle(oracle, oracle::timeout_from_env())
        .import(&request)
        .await
        .with_context(|| format!("Import of {} failed", file.display()))?;

    db.log_audit(
        &format!("user:{}", user.id),
        "import",
        Some("import"),
        Some(report.import_id),
        Some(&format!(
            "filename={}, inserted={}, duplicates={}, pending={}",
            request.filename, report.inserted, report.duplicates, report.pending
        )),
    )?;

    println!("✅ Import #{} complete", report.import_id);
    println!("   Inserted:   {}", report.inserted);
    println!("   Duplicates: {}", report.duplicates);
    if report.pending > 0 {
        println!("   ⚠️  Needs review: {}", report.pending);
        println!("      Run: tally review list --user {}", user.email);
    }

    Ok(report)
}

pub fn cmd_imports(db: &Database, user_email: &str, limit: i64) -> Result<()> {
    let user = find_user(db, user_email)?;
    let imports = db.list_imports(user.id, limit)?;

    if imports.is_empty() {
        println!("No imports yet.");
        return Ok(());
    }

    println!(
        "{:>5}  {:<16}  {:<6}  {:<12}  {:<30}",
        "ID", "Date", "Kind", "Status", "File"
    );
    println!("{}", "-".repeat(77));
    for job in imports {
        println!(
            "{:>5}  {:<16}  {:<6}  {:<12}  {:<30}",
            job.id,
            job.created_at.format("%Y-%m-%d %H:%M"),
            job.source_kind,
            job.status,
            truncate(&job.filename, 30)
        );
        if let Some(notes) = job.notes {
            println!("       {}", truncate(&notes, 70));
        }
    }

    Ok(())
}
