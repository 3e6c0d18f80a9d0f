//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{
    identity::{LocalIdentity, JWT_SECRET_ENV},
    oracle::{self, CategoryOracle, OracleClient},
};
use tally_server::{AppState, ServerConfig};

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    allowed_origins: Vec<String>,
    no_encrypt: bool,
) -> Result<()> {
    println!("🚀 Starting Tally web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    let db = open_db(db_path, no_encrypt)?;
    let identity = LocalIdentity::from_env(db.clone())
        .with_context(|| format!("Set {} to a secret of at least 32 bytes", JWT_SECRET_ENV))?;

    let oracle = OracleClient::from_env();
    match &oracle {
        Some(client) => println!(
            "   🤖 Category suggestions: {} ({})",
            client.model(),
            client.host()
        ),
        None => println!("   Category suggestions disabled (set TALLY_ORACLE_HOST to enable)"),
    }
    if !allowed_origins.is_empty() {
        println!("   🌐 CORS origins: {}", allowed_origins.join(", "));
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let state = AppState::new(db, identity)
        .with_oracle(oracle)
        .with_oracle_timeout(oracle::timeout_from_env());
    let config = ServerConfig { allowed_origins };

    tally_server::serve(state, host, port, config).await
}
