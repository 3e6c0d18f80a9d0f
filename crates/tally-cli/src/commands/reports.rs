//! Report command implementations

use anyhow::{anyhow, bail, Result};
use chrono::{Datelike, Local};
use tally_core::{db::Database, models::InstallmentScope};

use super::{find_user, format_cents, truncate};

/// Fill in the current year or month for whichever is missing
fn resolve_month(year: Option<i32>, month: Option<u32>) -> Result<(i32, u32)> {
    let today = Local::now().date_naive();
    let year = year.unwrap_or_else(|| today.year());
    let month = month.unwrap_or_else(|| today.month());
    if !(1..=12).contains(&month) {
        bail!("Month must be between 1 and 12, got {}", month);
    }
    Ok((year, month))
}

pub fn cmd_report_monthly(
    db: &Database,
    user_email: &str,
    year: Option<i32>,
    month: Option<u32>,
) -> Result<()> {
    let user = find_user(db, user_email)?;
    let (year, month) = resolve_month(year, month)?;
    let summary = db.monthly_summary(user.id, year, month)?;

    println!("📊 {:04}-{:02}", summary.year, summary.month);
    println!("   Income:   {:>12}", format_cents(summary.income_cents));
    println!("   Expenses: {:>12}", format_cents(summary.expenses_cents));
    println!("   Balance:  {:>12}", format_cents(summary.balance_cents));

    Ok(())
}

pub fn cmd_report_by_category(
    db: &Database,
    user_email: &str,
    year: Option<i32>,
    month: Option<u32>,
    all: bool,
) -> Result<()> {
    let user = find_user(db, user_email)?;
    let window = if all {
        None
    } else {
        Some(resolve_month(year, month)?)
    };
    let totals = db.spending_by_category(user.id, window)?;

    match window {
        Some((y, m)) => println!("📊 Spending by category, {:04}-{:02}", y, m),
        None => println!("📊 Spending by category, all time"),
    }

    if totals.is_empty() {
        println!("   No expenses.");
        return Ok(());
    }

    let grand_total: i64 = totals.iter().map(|t| t.total_cents).sum();
    for total in &totals {
        let name = total.category_name.as_deref().unwrap_or("(uncategorized)");
        let share = if grand_total > 0 {
            total.total_cents as f64 * 100.0 / grand_total as f64
        } else {
            0.0
        };
        println!(
            "   {:<24} {:>12}  {:>5.1}%",
            truncate(name, 24),
            format_cents(total.total_cents),
            share
        );
    }
    println!("   {}", "-".repeat(45));
    println!("   {:<24} {:>12}", "Total", format_cents(grand_total));

    Ok(())
}

pub fn cmd_report_installments(db: &Database, user_email: &str, scope: &str) -> Result<()> {
    let user = find_user(db, user_email)?;
    let scope: InstallmentScope = scope.parse().map_err(|e: String| anyhow!(e))?;
    let today = Local::now().date_naive();
    let summary = db.installments_summary(user.id, scope, today)?;

    let label = match summary.scope {
        InstallmentScope::ThisMonth => "this month",
        InstallmentScope::NextMonth => "next month",
        InstallmentScope::Total => "from this month on",
    };
    println!(
        "💳 Installments due {}: {} across {} payment(s)",
        label,
        format_cents(summary.total_cents),
        summary.count
    );

    Ok(())
}
