//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - statement-import ledger
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Personal finance ledger with bank statement import", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Allowed CORS origin (repeatable)
        #[arg(long = "allow-origin")]
        allowed_origins: Vec<String>,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Import a bank statement (.csv or .xlsx)
    Import {
        /// Owner email
        #[arg(short, long)]
        user: String,

        /// Statement file
        #[arg(short, long)]
        file: PathBuf,

        /// Account name (created if missing); rows are deduped within it
        #[arg(short, long)]
        account: Option<String>,

        /// Password of an encrypted workbook
        #[arg(long)]
        password: Option<String>,

        /// Explicit column mapping as JSON, e.g. '{"date":"Data","value":"Valor"}'
        #[arg(long)]
        mapping: Option<String>,

        /// Skip category suggestions even if an oracle is configured
        #[arg(long)]
        no_oracle: bool,
    },

    /// Import history
    Imports {
        /// Owner email
        #[arg(short, long)]
        user: String,

        /// Number of imports to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Work through rows that failed to import
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },

    /// Generate reports
    Report {
        #[command(subcommand)]
        report_type: ReportType,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a user
    Add {
        email: String,

        /// Password (read from TALLY_USER_PASSWORD when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Delete a user and everything they own
    Delete {
        email: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ReviewAction {
    /// List pending rows
    List {
        /// Owner email
        #[arg(short, long)]
        user: String,
    },

    /// Resolve a pending row with corrected values
    Confirm {
        /// Owner email
        #[arg(short, long)]
        user: String,

        /// Review item ID
        id: i64,

        /// Date (any accepted statement format)
        #[arg(long)]
        date: String,

        /// Description
        #[arg(long)]
        description: String,

        /// Signed amount, e.g. "-45.90" or "45,90 DR"
        #[arg(long, allow_hyphen_values = true)]
        amount: String,

        #[arg(long)]
        category_id: Option<i64>,

        /// Account ID (defaults to the account of the original upload)
        #[arg(long)]
        account_id: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum ReportType {
    /// Expenses, income and balance for a month
    Monthly {
        #[arg(short, long)]
        user: String,

        /// Year (defaults to current)
        #[arg(long)]
        year: Option<i32>,

        /// Month 1-12 (defaults to current)
        #[arg(long)]
        month: Option<u32>,
    },

    /// Expense totals per category
    ByCategory {
        #[arg(short, long)]
        user: String,

        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        month: Option<u32>,

        /// All time instead of one month
        #[arg(long, conflicts_with_all = ["year", "month"])]
        all: bool,
    },

    /// Installment expenses due: this_month, next_month or total
    Installments {
        #[arg(short, long)]
        user: String,

        #[arg(long, default_value = "this_month")]
        scope: String,
    },
}
