//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `users` - Registered users and password hashes
//! - `accounts` / `categories` - Owner-scoped reference data
//! - `transactions` - Transaction CRUD and dedupe-aware inserts
//! - `imports` - Import jobs
//! - `review` - Import review queue items
//! - `installments` - Manual installment groups
//! - `reports` - Monthly, per-category and installment reports
//! - `audit` - API access audit log

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use tempfile::TempPath;

use crate::error::{Error, Result};

mod accounts;
mod audit;
mod categories;
mod imports;
mod installments;
mod reports;
mod review;
mod transaction_filter;
mod transactions;
mod users;

pub use audit::AuditEntry;
pub use installments::NewInstallmentGroup;
pub use transaction_filter::{FilterResult, TransactionFilter};
pub use transactions::{ManualTransaction, TransactionInsertResult};

pub(crate) use categories::{find_category_id_by_name, resolve_or_create_category};
pub(crate) use imports::{create_import_on, get_import_on, update_import_on};
pub(crate) use review::{
    count_pending_for_import_on, get_review_item_on, insert_review_item_on, mark_review_on,
    ReviewSnapshot,
};
pub(crate) use transactions::{
    account_belongs_to, category_belongs_to, check_references, insert_transaction_on,
};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "TALLY_DB_KEY";

/// How long a writer waits for another writer's lock before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path. This allows moving/renaming/restoring the database freely.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Fixed application salt - changing this would invalidate all existing encrypted databases
    const APP_SALT: &[u8; 16] = b"tally-salt-v1-fx";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    // Extract the hash portion for use as SQLCipher key (hex encoded)
    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a stored ISO date
pub(crate) fn parse_date(s: &str) -> chrono::NaiveDate {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

/// True when a statement failed on a UNIQUE or PRIMARY KEY constraint
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
    /// Backing file of a test database, removed when the last clone drops
    _temp: Option<Arc<TempPath>>,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `TALLY_DB_KEY` environment variable to be set.
    /// The database will be encrypted using SQLCipher with a key derived
    /// from the passphrase via Argon2.
    ///
    /// Returns an error if `TALLY_DB_KEY` is not set. Use `new_unencrypted()`
    /// for development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        let encryption_key = std::env::var(DB_KEY_ENV).ok();
        match encryption_key {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    ///
    /// WARNING: This creates an unencrypted database. Only use for development
    /// or testing. For production, use `new()` with `TALLY_DB_KEY` set.
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let key_pragma = match passphrase {
            Some(pass) => Some(format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?)),
            None => None,
        };

        // Runs on every new pooled connection: key first, then per-connection pragmas
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            if let Some(ref pragma) = key_pragma {
                conn.execute_batch(pragma)?;
            }
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
            _temp: None,
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because SQLCipher
    /// has issues with in-memory databases in the connection pool, and each
    /// pooled connection would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix("tally_test_")
            .suffix(".db")
            .tempfile()?
            .into_temp_path();
        let path = temp.to_string_lossy().to_string();

        let mut db = Self::new_unencrypted(&path)?;
        db._temp = Some(Arc::new(temp));
        Ok(db)
    }

    /// Check if the database is encrypted
    pub fn is_encrypted(&self) -> Result<bool> {
        let conn = self.conn()?;
        // SQLCipher sets cipher_version if encryption is active
        let result: rusqlite::Result<String> =
            conn.query_row("PRAGMA cipher_version;", [], |row| row.get(0));
        Ok(result.is_ok() && std::env::var(DB_KEY_ENV).is_ok())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run `f` inside an IMMEDIATE transaction, committing on success.
    ///
    /// IMMEDIATE takes the write lock up front, so concurrent writers queue on
    /// `busy_timeout` instead of failing mid-transaction on lock upgrade.
    pub fn write_transaction<T>(
        &self,
        f: impl FnOnce(&mut Transaction) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn()?;
        let mut tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        migrate(&conn)
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- WAL mode: readers don't block the single writer
        -- Note: creates -wal and -shm sidecar files alongside the database
        PRAGMA journal_mode = WAL;

        -- Synchronous NORMAL: good balance of safety and performance
        PRAGMA synchronous = NORMAL;

        -- Store temp tables in memory (faster for report queries)
        PRAGMA temp_store = MEMORY;

        -- Users
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        -- Accounts (bank accounts, credit cards)
        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL COLLATE NOCASE,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(user_id, name)
        );

        -- Categories
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL COLLATE NOCASE,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(user_id, name)
        );

        -- Import jobs (one per uploaded statement)
        CREATE TABLE IF NOT EXISTS imports (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            source_kind TEXT NOT NULL,                 -- csv, xlsx
            filename TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'ok',         -- ok, partial, needs_review
            notes TEXT,                                -- newline-joined row errors
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_imports_user ON imports(user_id);

        -- Installment groups (manual payment plans)
        CREATE TABLE IF NOT EXISTS installment_groups (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            base_description TEXT NOT NULL,
            total_cents INTEGER NOT NULL,
            installments INTEGER NOT NULL,
            interval_months INTEGER NOT NULL DEFAULT 1,
            start_date DATE NOT NULL,
            account_id INTEGER REFERENCES accounts(id),
            category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        -- Transactions
        -- account_scope mirrors account_id as text ('none' when unassigned) so the
        -- uniqueness key also covers accountless transactions (NULLs never collide)
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            date DATE NOT NULL,
            description TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,             -- signed, expenses negative
            category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
            account_id INTEGER REFERENCES accounts(id),
            account_scope TEXT NOT NULL,
            source TEXT NOT NULL DEFAULT 'manual',     -- manual, csv, xlsx, import_review
            import_id INTEGER REFERENCES imports(id) ON DELETE SET NULL,
            dedupe_hash TEXT NOT NULL,
            installment_group_id INTEGER REFERENCES installment_groups(id) ON DELETE CASCADE,
            installment_number INTEGER,
            installment_total INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(user_id, account_scope, dedupe_hash)
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_user_date ON transactions(user_id, date);
        CREATE INDEX IF NOT EXISTS idx_transactions_import ON transactions(import_id);
        CREATE INDEX IF NOT EXISTS idx_transactions_group ON transactions(installment_group_id);
        CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category_id);

        -- Review queue (rows that failed to import)
        CREATE TABLE IF NOT EXISTS import_review_items (
            id INTEGER PRIMARY KEY,
            import_id INTEGER NOT NULL REFERENCES imports(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            row_number INTEGER NOT NULL,               -- 1-based data row
            raw_data TEXT NOT NULL,                    -- JSON of the row as read
            error TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',    -- pending, resolved, duplicate
            suggested_account_id INTEGER REFERENCES accounts(id),
            resolved_date DATE,
            resolved_description TEXT,
            resolved_amount_cents INTEGER,
            resolved_category_id INTEGER,
            resolved_account_id INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_review_user_status ON import_review_items(user_id, status);
        CREATE INDEX IF NOT EXISTS idx_review_import ON import_review_items(import_id);

        -- Audit log (tracks all API access)
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY,
            timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
            actor TEXT NOT NULL,
            action TEXT NOT NULL,
            entity_type TEXT,
            entity_id INTEGER,
            details TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_audit_log_actor ON audit_log(actor);
        CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp ON audit_log(timestamp);
        "#,
    )?;

    Ok(())
}
