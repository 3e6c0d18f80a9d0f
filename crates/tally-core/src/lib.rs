//! Tally Core Library
//!
//! Shared functionality for the Tally ledger backend:
//! - Database access and migrations (SQLCipher, pooled)
//! - Statement import pipeline: parsing, normalization, dedupe, review queue
//! - Category oracle backends
//! - Local identity provider (Argon2id passwords, JWT bearer tokens)

pub mod db;
pub mod error;
pub mod identity;
pub mod import;
pub mod models;
pub mod oracle;

/// Test utilities including a mock oracle server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use db::{AuditEntry, Database, ManualTransaction, NewInstallmentGroup, TransactionFilter};
pub use error::{Error, Result, RowError};
pub use identity::{IdentityProvider, LocalIdentity, TokenKind, TokenPair};
pub use import::{
    ColumnMapping, ImportReport, ImportRequest, Importer, ResolveReview, ReviewOutcome,
    ReviewQueue,
};
pub use oracle::{CategoryOracle, MockOracle, OpenAICompatibleOracle, OracleClient};
