//! Transaction filter builder for constructing dynamic SQL queries
//!
//! This module provides a builder pattern for constructing WHERE clauses
//! and related SQL components for transaction queries.

use chrono::NaiveDate;

/// Builder for constructing transaction query filters
///
/// The lifetime `'query` represents how long borrowed filter parameters
/// (the search text) must remain valid.
#[derive(Default)]
pub struct TransactionFilter<'query> {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category_id: Option<i64>,
    pub account_id: Option<i64>,
    pub search: Option<&'query str>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Result of building a filter - contains SQL components and parameters
pub struct FilterResult {
    /// WHERE clause including "WHERE" keyword (always scoped to the owner)
    pub where_clause: String,
    /// ORDER BY / LIMIT / OFFSET tail
    pub tail_clause: String,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl<'query> TransactionFilter<'query> {
    /// Create a new filter builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Only transactions on or after this date
    pub fn start_date(mut self, date: Option<NaiveDate>) -> Self {
        self.start_date = date;
        self
    }

    /// Only transactions on or before this date
    pub fn end_date(mut self, date: Option<NaiveDate>) -> Self {
        self.end_date = date;
        self
    }

    /// Set category_id filter
    pub fn category_id(mut self, id: Option<i64>) -> Self {
        self.category_id = id;
        self
    }

    /// Set account_id filter
    pub fn account_id(mut self, id: Option<i64>) -> Self {
        self.account_id = id;
        self
    }

    /// Set search query (case-insensitive substring of the description)
    pub fn search(mut self, query: Option<&'query str>) -> Self {
        self.search = query;
        self
    }

    /// Set pagination
    pub fn page(mut self, limit: Option<i64>, offset: Option<i64>) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Build the filter components for one owner
    pub fn build(self, user_id: i64) -> FilterResult {
        let mut conditions = vec!["t.user_id = ?".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

        if let Some(from_date) = self.start_date {
            conditions.push("t.date >= ?".to_string());
            params.push(Box::new(from_date.to_string()));
        }

        if let Some(to_date) = self.end_date {
            conditions.push("t.date <= ?".to_string());
            params.push(Box::new(to_date.to_string()));
        }

        if let Some(cid) = self.category_id {
            conditions.push("t.category_id = ?".to_string());
            params.push(Box::new(cid));
        }

        if let Some(aid) = self.account_id {
            conditions.push("t.account_id = ?".to_string());
            params.push(Box::new(aid));
        }

        if let Some(q) = self.search {
            if !q.trim().is_empty() {
                conditions.push("t.description LIKE ? COLLATE NOCASE".to_string());
                params.push(Box::new(format!("%{}%", q.trim())));
            }
        }

        let mut tail_clause = "ORDER BY t.date DESC, t.id DESC".to_string();
        if let Some(limit) = self.limit {
            tail_clause.push_str(" LIMIT ?");
            params.push(Box::new(limit));
            if let Some(offset) = self.offset {
                tail_clause.push_str(" OFFSET ?");
                params.push(Box::new(offset));
            }
        }

        FilterResult {
            where_clause: format!("WHERE {}", conditions.join(" AND ")),
            tail_clause,
            params,
        }
    }
}

impl FilterResult {
    /// Get parameter references for query execution
    pub fn param_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}
