//! Review queue commands

use anyhow::{anyhow, Result};
use tally_core::{
    db::Database,
    import::{normalize::parse_amount_text, ResolveReview, ReviewOutcome, ReviewQueue},
};

use super::{find_user, truncate};

/// Corrected values typed on the command line
#[derive(Debug, Clone, Copy)]
pub struct ReviewFix<'a> {
    pub date: &'a str,
    pub description: &'a str,
    pub amount: &'a str,
    pub category_id: Option<i64>,
    pub account_id: Option<i64>,
}

pub fn cmd_review_list(db: &Database, user_email: &str) -> Result<()> {
    let user = find_user(db, user_email)?;
    let pending = ReviewQueue::new(db).list_pending(user.id)?;

    if pending.is_empty() {
        println!("✅ Nothing to review.");
        return Ok(());
    }

    println!("🔍 {} row(s) need review:", pending.len());
    println!();
    for item in &pending {
        println!(
            "  #{} (import {}, row {}): {}",
            item.id, item.import_id, item.row_number, item.error
        );
        println!("      {}", truncate(&item.raw_data, 100));
    }
    println!();
    println!(
        "Resolve with: tally review confirm --user {} <ID> --date ... --description ... --amount ...",
        user.email
    );

    Ok(())
}

pub fn cmd_review_confirm(
    db: &Database,
    user_email: &str,
    item_id: i64,
    fix: ReviewFix<'_>,
) -> Result<ReviewOutcome> {
    let user = find_user(db, user_email)?;
    let amount_cents =
        parse_amount_text(fix.amount).map_err(|e| anyhow!("Invalid --amount: {}", e))?;

    let input = ResolveReview {
        date: fix.date.to_string(),
        description: fix.description.to_string(),
        amount_cents,
        category_id: fix.category_id,
        account_id: fix.account_id,
    };
    let outcome = ReviewQueue::new(db).confirm(user.id, item_id, &input)?;

    db.log_audit(
        &format!("user:{}", user.id),
        "confirm",
        Some("review_item"),
        Some(item_id),
        Some(&format!("transaction_id={}", outcome.transaction_id())),
    )?;

    match outcome {
        ReviewOutcome::Resolved { transaction_id } => {
            println!("✅ Review #{} resolved as transaction #{}", item_id, transaction_id)
        }
        ReviewOutcome::Duplicate { transaction_id } => println!(
            "ℹ️  Review #{} matched existing transaction #{}; nothing inserted",
            item_id, transaction_id
        ),
    }

    Ok(outcome)
}
