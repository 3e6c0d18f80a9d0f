//! Statement import pipeline
//!
//! Leaf-first:
//! - `normalize` - locale-tolerant date/amount/description normalization
//! - `headers` - column inference over unknown header labels
//! - `installments` - "parcela N de M" / "(N/M)" markers and month arithmetic
//! - `dedupe` - content hash used as the transaction uniqueness key
//! - `parser` - delimited text and spreadsheet readers
//! - `orchestrator` - runs a file through all of the above
//! - `review` - manual correction of rows that failed to import

use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

pub mod dedupe;
pub mod headers;
pub mod installments;
pub mod normalize;
pub mod orchestrator;
pub mod parser;
pub mod review;

pub use headers::{ColumnMap, ColumnMapping};
pub use orchestrator::{ImportReport, ImportRequest, Importer};
pub use review::{ResolveReview, ReviewOutcome, ReviewQueue};

/// A single cell as read from a statement file
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Cell::Empty => serializer.serialize_str(""),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Int(v) => serializer.serialize_i64(*v),
            Cell::Float(v) => serializer.serialize_f64(*v),
            Cell::Bool(v) => serializer.serialize_bool(*v),
        }
    }
}

/// One data row of a statement, paired with the file's header row
#[derive(Debug, Clone)]
pub struct StatementRow {
    headers: Arc<[String]>,
    cells: Vec<Cell>,
}

impl StatementRow {
    pub fn new(headers: Arc<[String]>, cells: Vec<Cell>) -> Self {
        Self { headers, cells }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Cell at `index`, or `Cell::Empty` for short rows and unmapped columns
    pub fn cell(&self, index: Option<usize>) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        index.and_then(|i| self.cells.get(i)).unwrap_or(&EMPTY)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_blank)
    }

    /// The row as a JSON object keyed by header, in file order
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Serialize for StatementRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.headers.len()))?;
        for (i, header) in self.headers.iter().enumerate() {
            map.serialize_entry(header, self.cell(Some(i)))?;
        }
        map.end()
    }
}

/// All data rows of a statement file
#[derive(Debug, Clone, Default)]
pub struct Statement {
    pub headers: Vec<String>,
    pub rows: Vec<StatementRow>,
}
