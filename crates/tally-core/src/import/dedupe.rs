//! Transaction dedupe key

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use super::normalize::normalize_description;

/// Account scope literal for transactions without an account
pub const NO_ACCOUNT_SCOPE: &str = "none";

/// Account component of the uniqueness key
pub fn account_scope(account_id: Option<i64>) -> String {
    account_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| NO_ACCOUNT_SCOPE.to_string())
}

/// SHA-256 over `date|description|amount|scope`, hex encoded.
///
/// The description is whitespace-collapsed and lowercased first, so case
/// and spacing differences between statement exports do not defeat dedupe.
pub fn build_dedupe_hash(
    date: NaiveDate,
    description: &str,
    amount_cents: i64,
    account_scope: &str,
) -> String {
    let key = format!(
        "{}|{}|{}|{}",
        date.format("%Y-%m-%d"),
        normalize_description(description).to_lowercase(),
        amount_cents,
        account_scope
    );
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}
