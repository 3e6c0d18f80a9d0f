//! Domain models for Tally

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::import::dedupe::{account_scope, build_dedupe_hash};

/// A registered user. Every other entity is scoped to one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A bank or card account transactions can be attached to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A spending category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ========== Transactions ==========

/// Where a transaction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    #[default]
    Manual,
    Csv,
    Xlsx,
    ImportReview,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::ImportReview => "import_review",
        }
    }
}

impl std::str::FromStr for TransactionSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            "import_review" => Ok(Self::ImportReview),
            _ => Err(format!("Unknown transaction source: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ledger transaction.
///
/// `amount_cents` is signed: expenses are negative, income positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub category_id: Option<i64>,
    pub account_id: Option<i64>,
    pub source: TransactionSource,
    pub import_id: Option<i64>,
    pub dedupe_hash: String,
    pub installment_group_id: Option<i64>,
    pub installment_number: Option<i64>,
    pub installment_total: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A transaction ready to be written. Description must already be normalized.
#[derive(Debug, Clone, Default)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub category_id: Option<i64>,
    pub account_id: Option<i64>,
    pub source: TransactionSource,
    pub import_id: Option<i64>,
    pub installment_group_id: Option<i64>,
    pub installment_number: Option<i64>,
    pub installment_total: Option<i64>,
}

impl NewTransaction {
    /// Dedupe hash for this transaction, scoped to its account
    pub fn dedupe_hash(&self) -> String {
        build_dedupe_hash(
            self.date,
            &self.description,
            self.amount_cents,
            &self.account_scope(),
        )
    }

    /// The account component of the uniqueness key (`none` when unassigned)
    pub fn account_scope(&self) -> String {
        account_scope(self.account_id)
    }
}

/// Editable fields of an existing transaction
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionUpdate {
    pub date: Option<String>,
    pub description: Option<String>,
    pub amount_cents: Option<i64>,
    #[serde(default, with = "double_option")]
    pub category_id: Option<Option<i64>>,
    #[serde(default, with = "double_option")]
    pub account_id: Option<Option<i64>>,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

// ========== Import Models ==========

/// Final (or provisional) state of an import job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    #[default]
    Ok,
    Partial,
    NeedsReview,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Partial => "partial",
            Self::NeedsReview => "needs_review",
        }
    }

    /// Status of a finished import given its row counters
    pub fn from_counts(inserted: usize, pending: usize) -> Self {
        match (pending, inserted) {
            (0, _) => Self::Ok,
            (_, 0) => Self::NeedsReview,
            _ => Self::Partial,
        }
    }
}

impl std::str::FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ok" => Ok(Self::Ok),
            "partial" => Ok(Self::Partial),
            "needs_review" => Ok(Self::NeedsReview),
            _ => Err(format!("Unknown import status: {}", s)),
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Statement file flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Csv,
    Xlsx,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    /// Pick the parser from the file name. Only `.xlsx` is special-cased;
    /// everything else goes through the delimited parser.
    pub fn from_filename(filename: &str) -> Self {
        if filename.to_lowercase().ends_with(".xlsx") {
            Self::Xlsx
        } else {
            Self::Csv
        }
    }

    pub fn transaction_source(&self) -> TransactionSource {
        match self {
            Self::Csv => TransactionSource::Csv,
            Self::Xlsx => TransactionSource::Xlsx,
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            _ => Err(format!("Unknown source kind: {}", s)),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One statement upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: i64,
    pub user_id: i64,
    pub source_kind: SourceKind,
    pub filename: String,
    pub status: ImportStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Import job plus review queue counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJobSummary {
    #[serde(flatten)]
    pub job: ImportJob,
    pub transaction_count: i64,
    pub pending_count: i64,
    pub resolved_count: i64,
    pub duplicate_count: i64,
}

/// Review item lifecycle: `pending` moves once to `resolved` or `duplicate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Resolved,
    Duplicate,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Duplicate => "duplicate",
        }
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "resolved" => Ok(Self::Resolved),
            "duplicate" => Ok(Self::Duplicate),
            _ => Err(format!("Unknown review status: {}", s)),
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A statement row that could not be imported automatically
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReviewItem {
    pub id: i64,
    pub import_id: i64,
    pub user_id: i64,
    pub row_number: i64,
    /// The row as read from the file, JSON-encoded header -> cell
    pub raw_data: String,
    pub error: String,
    pub status: ReviewStatus,
    /// Account the row was uploaded against, offered as the default on confirm
    pub suggested_account_id: Option<i64>,
    pub resolved_date: Option<String>,
    pub resolved_description: Option<String>,
    pub resolved_amount_cents: Option<i64>,
    pub resolved_category_id: Option<i64>,
    pub resolved_account_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pending review item as shown to the user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingReview {
    pub id: i64,
    pub import_id: i64,
    pub row_number: i64,
    pub raw_data: String,
    pub error: String,
    pub suggested_account_id: Option<i64>,
}

// ========== Installments ==========

/// A purchase split into monthly (or every-N-months) installments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallmentGroup {
    pub id: i64,
    pub user_id: i64,
    pub base_description: String,
    pub total_cents: i64,
    pub installments: i64,
    pub interval_months: i64,
    pub start_date: NaiveDate,
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// ========== Reports ==========

/// Month totals. `expenses_cents` is the absolute sum of negative amounts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub expenses_cents: i64,
    pub income_cents: i64,
    pub balance_cents: i64,
}

/// Expense total for one category in a month
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub total_cents: i64,
}

/// Window for the installments summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentScope {
    #[default]
    ThisMonth,
    NextMonth,
    Total,
}

impl std::str::FromStr for InstallmentScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "this_month" => Ok(Self::ThisMonth),
            "next_month" => Ok(Self::NextMonth),
            "total" => Ok(Self::Total),
            _ => Err(format!("Unknown installment scope: {}", s)),
        }
    }
}

/// Sum of installment expenses in a window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallmentSummary {
    pub scope: InstallmentScope,
    pub total_cents: i64,
    pub count: i64,
}
