//! Category oracle: suggests a category for an imported expense
//!
//! The oracle is advisory. Whatever it returns is validated against the
//! owner's allowed category names; anything unknown becomes [`FALLBACK_CATEGORY`].
//!
//! # Configuration
//!
//! Environment variables:
//! - `TALLY_ORACLE_BACKEND`: `openai_compatible` (default) or `mock`
//! - `TALLY_ORACLE_HOST`: Server URL (required for openai_compatible)
//! - `TALLY_ORACLE_MODEL`: Model name (default: openai/gpt-oss-20b)
//! - `TALLY_ORACLE_API_KEY`: API key if required (optional)
//! - `TALLY_ORACLE_TIMEOUT_MS`: Per-call timeout (default: 3000)

mod mock;
mod openai_compatible;
pub mod parsing;

pub use mock::MockOracle;
pub use openai_compatible::OpenAICompatibleOracle;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Categories offered to the oracle in addition to the owner's own
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Mercado",
    "Restaurante",
    "Transporte",
    "Casa",
    "Saude",
    "Assinaturas",
    "Lazer",
    "Compras",
    "Educacao",
    "Outros",
];

/// Used when the oracle answers with a name outside the allowed list
pub const FALLBACK_CATEGORY: &str = "Outros";

/// Upper bound on the allowed list sent with each prompt
pub const MAX_ALLOWED_CATEGORIES: usize = 30;

/// Default bound on a single oracle call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Interface for category suggestion backends
#[async_trait]
pub trait CategoryOracle: Send + Sync {
    /// Suggest a category name for an expense. `Ok(None)` means no opinion.
    async fn suggest_category(
        &self,
        description: &str,
        amount_cents: i64,
        allowed: &[String],
    ) -> Result<Option<String>>;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete oracle client, constructed once and injected where needed
#[derive(Clone)]
pub enum OracleClient {
    /// Any server exposing `/v1/chat/completions`
    OpenAICompatible(OpenAICompatibleOracle),
    /// Mock oracle for testing
    Mock(MockOracle),
}

impl OracleClient {
    /// Create an oracle client from environment variables.
    ///
    /// Returns None if the selected backend is not configured.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("TALLY_ORACLE_BACKEND")
            .unwrap_or_else(|_| "openai_compatible".to_string());

        match backend.to_lowercase().as_str() {
            "openai_compatible" | "openai" => {
                OpenAICompatibleOracle::from_env().map(OracleClient::OpenAICompatible)
            }
            "mock" => Some(OracleClient::Mock(MockOracle::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown TALLY_ORACLE_BACKEND, oracle disabled");
                None
            }
        }
    }

    /// Create a mock oracle for testing
    pub fn mock(mock: MockOracle) -> Self {
        OracleClient::Mock(mock)
    }
}

#[async_trait]
impl CategoryOracle for OracleClient {
    async fn suggest_category(
        &self,
        description: &str,
        amount_cents: i64,
        allowed: &[String],
    ) -> Result<Option<String>> {
        match self {
            OracleClient::OpenAICompatible(b) => {
                b.suggest_category(description, amount_cents, allowed).await
            }
            OracleClient::Mock(b) => b.suggest_category(description, amount_cents, allowed).await,
        }
    }

    fn model(&self) -> &str {
        match self {
            OracleClient::OpenAICompatible(b) => b.model(),
            OracleClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            OracleClient::OpenAICompatible(b) => b.host(),
            OracleClient::Mock(b) => b.host(),
        }
    }
}

/// Per-call timeout from `TALLY_ORACLE_TIMEOUT_MS`
pub fn timeout_from_env() -> Duration {
    std::env::var("TALLY_ORACLE_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_TIMEOUT)
}

/// Owner categories first, then defaults, without case-insensitive repeats
pub fn allowed_category_names(existing: &[String]) -> Vec<String> {
    let mut allowed: Vec<String> = Vec::new();
    let candidates = existing
        .iter()
        .map(String::as_str)
        .chain(DEFAULT_CATEGORIES.iter().copied());

    for name in candidates {
        let name = name.trim();
        if name.is_empty() || allowed.iter().any(|a| a.eq_ignore_ascii_case(name)) {
            continue;
        }
        allowed.push(name.to_string());
        if allowed.len() == MAX_ALLOWED_CATEGORIES {
            break;
        }
    }
    allowed
}

/// Map an oracle answer onto the allowed list (case-insensitive), or the fallback
pub fn validate_suggestion(suggested: &str, allowed: &[String]) -> String {
    let collapsed = suggested.split_whitespace().collect::<Vec<_>>().join(" ");
    allowed
        .iter()
        .find(|name| name.to_lowercase() == collapsed.to_lowercase())
        .cloned()
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string())
}

/// Prompt sent to chat-completion backends
pub fn category_prompt(description: &str, amount_cents: i64, allowed: &[String]) -> String {
    format!(
        "Classifique a transacao em UMA categoria. \
         Retorne apenas JSON valido no formato {{\"category\":\"Nome\"}}. \
         Categorias permitidas: {}. \
         Descricao: {}. Valor em centavos: {}.",
        allowed.join(", "),
        description,
        amount_cents
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_allowed_names_owner_first_without_repeats() {
        let allowed = allowed_category_names(&names(&["Pets", "mercado", " "]));
        assert_eq!(allowed[0], "Pets");
        assert_eq!(allowed[1], "mercado");
        assert!(!allowed.iter().any(|a| a == "Mercado"));
        assert_eq!(allowed.len(), 1 + DEFAULT_CATEGORIES.len());
    }

    #[test]
    fn test_allowed_names_capped() {
        let many: Vec<String> = (0..40).map(|i| format!("Cat {}", i)).collect();
        let allowed = allowed_category_names(&many);
        assert_eq!(allowed.len(), MAX_ALLOWED_CATEGORIES);
        assert!(!allowed.iter().any(|a| a == "Outros"));
    }

    #[test]
    fn test_validate_suggestion() {
        let allowed = allowed_category_names(&names(&["Pets"]));
        assert_eq!(validate_suggestion("  transporte ", &allowed), "Transporte");
        assert_eq!(validate_suggestion("PETS", &allowed), "Pets");
        assert_eq!(validate_suggestion("Viagem", &allowed), FALLBACK_CATEGORY);
        assert_eq!(validate_suggestion("", &allowed), FALLBACK_CATEGORY);
    }

    #[test]
    fn test_prompt_lists_allowed() {
        let prompt = category_prompt("UBER TRIP", -2300, &names(&["Transporte", "Outros"]));
        assert!(prompt.contains("Categorias permitidas: Transporte, Outros."));
        assert!(prompt.contains(r#"{"category":"Nome"}"#));
        assert!(prompt.contains("Valor em centavos: -2300"));
    }
}
