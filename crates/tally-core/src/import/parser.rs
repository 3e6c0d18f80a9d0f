//! Tabular statement readers
//!
//! Both readers return a [`Statement`]: the first row as headers and every
//! non-blank row after it. Any error here is a file-level failure.

use std::borrow::Cow;
use std::io::Cursor;
use std::sync::Arc;

use calamine::{Data, Reader, Xlsx};
use chrono::{Duration, NaiveDate};
use csv::ReaderBuilder;
use tracing::debug;

use super::{Cell, Statement, StatementRow};
use crate::error::{Error, Result};
use crate::models::SourceKind;

/// How much of a delimited file is inspected to pick the delimiter
const SNIFF_BYTES: usize = 4096;

const DELIMITERS: &[u8] = b",;\t";

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Read a statement file according to its kind
pub fn parse_statement(
    kind: SourceKind,
    bytes: &[u8],
    password: Option<&str>,
) -> Result<Statement> {
    match kind {
        SourceKind::Csv => parse_delimited(bytes),
        SourceKind::Xlsx => parse_spreadsheet(bytes, password),
    }
}

/// Parse UTF-8 delimited text (optional BOM), sniffing `,`, `;` or tab.
/// Invalid byte sequences are dropped rather than failing the file.
pub fn parse_delimited(bytes: &[u8]) -> Result<Statement> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = decode_lossy(bytes);
    let text = text.as_ref();

    let delimiter = sniff_delimiter(text);
    debug!("Detected delimiter {:?}", delimiter as char);

    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(Error::InvalidData("file has no header row".to_string()));
    }
    let shared: Arc<[String]> = headers.clone().into();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let cells = record.iter().map(|v| Cell::Text(v.to_string())).collect();
        let row = StatementRow::new(Arc::clone(&shared), cells);
        if !row.is_blank() {
            rows.push(row);
        }
    }

    Ok(Statement { headers, rows })
}

/// Pick the delimiter whose per-line count (outside quotes) is the same on
/// every sampled line, preferring the most frequent. Falls back to the most
/// frequent in the header line, then to a comma.
fn sniff_delimiter(text: &str) -> u8 {
    let mut end = text.len().min(SNIFF_BYTES);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let sample = &text[..end];

    let mut lines: Vec<&str> = sample.lines().filter(|l| !l.trim().is_empty()).collect();
    // A truncated sample ends mid-line
    if end < text.len() && lines.len() > 1 {
        lines.pop();
    }
    if lines.is_empty() {
        return b',';
    }

    let counts: Vec<(u8, Vec<usize>)> = DELIMITERS
        .iter()
        .map(|&d| (d, lines.iter().map(|l| count_unquoted(l, d)).collect()))
        .collect();

    let consistent = counts
        .iter()
        .filter(|(_, per_line)| per_line[0] > 0 && per_line.iter().all(|&c| c == per_line[0]))
        .max_by_key(|(_, per_line)| per_line[0]);
    if let Some((d, _)) = consistent {
        return *d;
    }

    counts
        .iter()
        .filter(|(_, per_line)| per_line[0] > 0)
        .max_by_key(|(_, per_line)| per_line[0])
        .map(|(d, _)| *d)
        .unwrap_or(b',')
}

fn decode_lossy(bytes: &[u8]) -> Cow<'_, str> {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(text) => Cow::Borrowed(text),
        Cow::Owned(text) => {
            debug!("Dropping invalid UTF-8 sequences");
            Cow::Owned(text.replace(char::REPLACEMENT_CHARACTER, ""))
        }
    }
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for b in line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Parse the first sheet of an .xlsx workbook, decrypting it first when a
/// password is given
pub fn parse_spreadsheet(bytes: &[u8], password: Option<&str>) -> Result<Statement> {
    let data = match password.filter(|p| !p.is_empty()) {
        Some(password) => office_crypto::decrypt_from_bytes(bytes.to_vec(), password)
            .map_err(|e| Error::Spreadsheet(format!("could not decrypt workbook: {:?}", e)))?,
        None => bytes.to_vec(),
    };

    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(data))
        .map_err(|e| Error::Spreadsheet(format!("could not open workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Spreadsheet("workbook has no sheets".to_string()))?
        .map_err(|e| Error::Spreadsheet(format!("could not read sheet: {}", e)))?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(first) => first.iter().map(|c| to_cell(c).to_string()).collect(),
        None => return Ok(Statement::default()),
    };
    let shared: Arc<[String]> = headers.clone().into();

    let rows = sheet_rows
        .map(|r| StatementRow::new(Arc::clone(&shared), r.iter().map(to_cell).collect()))
        .filter(|row| !row.is_blank())
        .collect();

    Ok(Statement { headers, rows })
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Float(*f),
        Data::Int(i) => Cell::Int(*i),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Text(excel_serial_to_date(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("{:?}", e)),
    }
}

/// Excel serial day number to ISO date (epoch 1899-12-30, which absorbs the
/// 1900 leap year bug)
fn excel_serial_to_date(serial: f64) -> String {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|base| base.checked_add_signed(Duration::days(serial.floor() as i64)))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| serial.to_string())
}
