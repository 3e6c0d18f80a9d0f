//! User management commands

use anyhow::{bail, Context, Result};
use tally_core::db::Database;
use tally_core::identity::{hash_password, MIN_PASSWORD_LEN};

use super::find_user;

/// Environment variable consulted when `--password` is not given
const PASSWORD_ENV: &str = "TALLY_USER_PASSWORD";

pub fn cmd_user_add(db: &Database, email: &str, password: Option<&str>) -> Result<()> {
    let password = match password {
        Some(p) => p.to_string(),
        None => std::env::var(PASSWORD_ENV)
            .with_context(|| format!("Pass --password or set {}", PASSWORD_ENV))?,
    };
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("Password must be at least {} characters", MIN_PASSWORD_LEN);
    }
    if !email.contains('@') {
        bail!("Invalid email: {}", email);
    }

    let hash = hash_password(&password)?;
    let user = db
        .create_user(email, &hash)
        .with_context(|| format!("Failed to register {}", email))?;

    println!("✅ Registered {} (id {})", user.email, user.id);
    Ok(())
}

pub fn cmd_user_delete(db: &Database, email: &str, yes: bool) -> Result<()> {
    let user = find_user(db, email)?;

    if !yes {
        println!(
            "⚠️  This deletes {} and all of their accounts, transactions and imports.",
            user.email
        );
        println!("   Re-run with --yes to confirm.");
        return Ok(());
    }

    if db.delete_user(user.id)? {
        println!("🗑️  Deleted {}", user.email);
    }
    Ok(())
}
