//! Mock oracle for testing
//!
//! Answers from a small keyword table, a fixed name, an error, or after a delay.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::CategoryOracle;

/// Mock oracle backend
#[derive(Clone, Default)]
pub struct MockOracle {
    /// Answer every call with this name instead of the keyword table
    fixed: Option<String>,
    /// Fail every call
    failing: bool,
    /// Sleep before answering
    delay: Option<Duration>,
}

impl MockOracle {
    /// Keyword-table mock
    pub fn new() -> Self {
        Self::default()
    }

    /// Always suggest `name`
    pub fn fixed(name: &str) -> Self {
        Self {
            fixed: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Always fail
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Answer like `self`, but only after `delay`
    pub fn slow(self, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..self
        }
    }

    fn keyword_answer(description: &str) -> &'static str {
        match description.to_uppercase().as_str() {
            d if d.contains("UBER") || d.contains("99APP") || d.contains("POSTO") => "Transporte",
            d if d.contains("MERCADO") || d.contains("CARREFOUR") => "Mercado",
            d if d.contains("NETFLIX") || d.contains("SPOTIFY") => "Assinaturas",
            d if d.contains("IFOOD") || d.contains("RESTAURANTE") => "Restaurante",
            d if d.contains("FARMACIA") || d.contains("DROGASIL") => "Saude",
            _ => "Outros",
        }
    }
}

#[async_trait]
impl CategoryOracle for MockOracle {
    async fn suggest_category(
        &self,
        description: &str,
        _amount_cents: i64,
        _allowed: &[String],
    ) -> Result<Option<String>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(Error::Oracle("mock oracle failure".to_string()));
        }
        let answer = match &self.fixed {
            Some(name) => name.clone(),
            None => Self::keyword_answer(description).to_string(),
        };
        Ok(Some(answer))
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keyword_table() {
        let oracle = MockOracle::new();
        let answer = oracle.suggest_category("UBER *TRIP", -100, &[]).await.unwrap();
        assert_eq!(answer.as_deref(), Some("Transporte"));
        let answer = oracle.suggest_category("LOJA X", -100, &[]).await.unwrap();
        assert_eq!(answer.as_deref(), Some("Outros"));
    }

    #[tokio::test]
    async fn test_fixed_and_failing() {
        let answer = MockOracle::fixed("Lazer")
            .suggest_category("UBER", -100, &[])
            .await
            .unwrap();
        assert_eq!(answer.as_deref(), Some("Lazer"));

        assert!(MockOracle::failing()
            .suggest_category("UBER", -100, &[])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_slow_exceeds_timeout() {
        let oracle = MockOracle::fixed("Lazer").slow(Duration::from_millis(200));
        let result = tokio::time::timeout(
            Duration::from_millis(20),
            oracle.suggest_category("X", -1, &[]),
        )
        .await;
        assert!(result.is_err());
    }
}
