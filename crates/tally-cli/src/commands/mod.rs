//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, find_user, money formatting)
//! - `import` - Statement import and import history
//! - `reports` - Report generation commands
//! - `review` - Review queue commands
//! - `serve` - Web server command
//! - `users` - User management commands

pub mod core;
pub mod import;
pub mod reports;
pub mod review;
pub mod serve;
pub mod users;

// Re-export command functions for main.rs
pub use core::*;
pub use import::*;
pub use reports::*;
pub use review::*;
pub use serve::*;
pub use users::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
