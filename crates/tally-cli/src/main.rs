//! Tally CLI - statement-import ledger
//!
//! Usage:
//!   tally init                                   Initialize database
//!   tally user add ana@example.com               Register a user
//!   tally import --user EMAIL --file FILE        Import a bank statement
//!   tally review list --user EMAIL               Show rows waiting for review
//!   tally serve --port 3000                      Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            allowed_origins,
        } => commands::cmd_serve(&cli.db, &host, port, allowed_origins, cli.no_encrypt).await,
        Commands::User { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                UserAction::Add { email, password } => {
                    commands::cmd_user_add(&db, &email, password.as_deref())
                }
                UserAction::Delete { email, yes } => commands::cmd_user_delete(&db, &email, yes),
            }
        }
        Commands::Import {
            user,
            file,
            account,
            password,
            mapping,
            no_oracle,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let options = commands::ImportOptions {
                account: account.as_deref(),
                password: password.as_deref(),
                mapping: mapping.as_deref(),
                use_oracle: !no_oracle,
            };
            commands::cmd_import(&db, &user, &file, options).await
        }
        Commands::Imports { user, limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_imports(&db, &user, limit)
        }
        Commands::Review { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                ReviewAction::List { user } => commands::cmd_review_list(&db, &user),
                ReviewAction::Confirm {
                    user,
                    id,
                    date,
                    description,
                    amount,
                    category_id,
                    account_id,
                } => commands::cmd_review_confirm(
                    &db,
                    &user,
                    id,
                    commands::ReviewFix {
                        date: &date,
                        description: &description,
                        amount: &amount,
                        category_id,
                        account_id,
                    },
                )
                .map(|_| ()),
            }
        }
        Commands::Report { report_type } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match report_type {
                ReportType::Monthly { user, year, month } => {
                    commands::cmd_report_monthly(&db, &user, year, month)
                }
                ReportType::ByCategory {
                    user,
                    year,
                    month,
                    all,
                } => commands::cmd_report_by_category(&db, &user, year, month, all),
                ReportType::Installments { user, scope } => {
                    commands::cmd_report_installments(&db, &user, &scope)
                }
            }
        }
    }
}
