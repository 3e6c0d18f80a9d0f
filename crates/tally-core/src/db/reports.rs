//! Monthly, per-category and installment reports
//!
//! Amounts are signed in storage. Reports present expenses as positive
//! magnitudes.

use chrono::{Datelike, NaiveDate};
use rusqlite::params;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{CategoryTotal, InstallmentScope, InstallmentSummary, MonthlySummary};

/// First day of the month and first day of the following month
fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::InvalidData(format!("invalid month: {}-{}", year, month)))?;
    Ok((start, next_month_start(start)))
}

fn next_month_start(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

impl Database {
    /// Expense, income and balance for one month
    pub fn monthly_summary(&self, user_id: i64, year: i32, month: u32) -> Result<MonthlySummary> {
        let (start, end) = month_bounds(year, month)?;
        let conn = self.conn()?;

        let (expenses_cents, income_cents): (i64, i64) = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN amount_cents < 0 THEN -amount_cents ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN amount_cents > 0 THEN amount_cents ELSE 0 END), 0)
            FROM transactions
            WHERE user_id = ? AND date >= ? AND date < ?
            "#,
            params![user_id, start.to_string(), end.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(MonthlySummary {
            year,
            month,
            expenses_cents,
            income_cents,
            balance_cents: income_cents - expenses_cents,
        })
    }

    /// Expense totals per category for one month, or for all time when
    /// `month` is None. Uncategorized spending is one entry with no category.
    pub fn spending_by_category(
        &self,
        user_id: i64,
        month: Option<(i32, u32)>,
    ) -> Result<Vec<CategoryTotal>> {
        let (start, end) = match month {
            Some((y, m)) => {
                let (s, e) = month_bounds(y, m)?;
                (s.to_string(), e.to_string())
            }
            None => ("0000-01-01".to_string(), "9999-12-31".to_string()),
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT t.category_id, c.name, SUM(-t.amount_cents) AS total
            FROM transactions t
            LEFT JOIN categories c ON c.id = t.category_id
            WHERE t.user_id = ? AND t.amount_cents < 0 AND t.date >= ? AND t.date < ?
            GROUP BY t.category_id
            ORDER BY total DESC, c.name
            "#,
        )?;

        let totals = stmt
            .query_map(params![user_id, start, end], |row| {
                Ok(CategoryTotal {
                    category_id: row.get(0)?,
                    category_name: row.get(1)?,
                    total_cents: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(totals)
    }

    /// Installment expenses due in a window relative to `today`.
    ///
    /// Covers both installment groups and installments detected on import.
    pub fn installments_summary(
        &self,
        user_id: i64,
        scope: InstallmentScope,
        today: NaiveDate,
    ) -> Result<InstallmentSummary> {
        let this_month = today.with_day(1).unwrap_or(today);
        let next_month = next_month_start(this_month);
        let (start, end) = match scope {
            InstallmentScope::ThisMonth => (this_month, Some(next_month)),
            InstallmentScope::NextMonth => (next_month, Some(next_month_start(next_month))),
            InstallmentScope::Total => (this_month, None),
        };
        let end = end.map(|d| d.to_string()).unwrap_or_else(|| "9999-12-31".to_string());

        let conn = self.conn()?;
        let (total_cents, count): (i64, i64) = conn.query_row(
            r#"
            SELECT COALESCE(SUM(-amount_cents), 0), COUNT(*)
            FROM transactions
            WHERE user_id = ?
              AND amount_cents < 0
              AND installment_number IS NOT NULL
              AND date >= ? AND date < ?
            "#,
            params![user_id, start.to_string(), end],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(InstallmentSummary {
            scope,
            total_cents,
            count,
        })
    }
}
