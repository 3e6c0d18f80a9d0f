//! Test utilities for tally-core
//!
//! Provides a mock OpenAI-compatible server so the real HTTP oracle client can
//! be exercised without network access.

use axum::{extract::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::sync::oneshot;

/// Mock `/v1/chat/completions` server for tests
pub struct MockOracleServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOracleServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new().route("/v1/chat/completions", post(handle_chat));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOracleServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_chat(Json(request): Json<ChatRequest>) -> Json<ChatResponse> {
    let prompt = request
        .messages
        .last()
        .map(|m| m.content.as_str())
        .unwrap_or_default();

    let category = category_for_prompt(prompt);
    // Wrapped in prose, the way chat models tend to answer
    let content = format!("Aqui esta: {{\"category\": \"{}\"}}", category);

    Json(ChatResponse {
        model: request.model,
        choices: vec![Choice {
            message: Message {
                role: "assistant".to_string(),
                content,
            },
        }],
    })
}

/// Keyword classification over the `Descricao:` part of the prompt
fn category_for_prompt(prompt: &str) -> &'static str {
    let description = prompt
        .split("Descricao:")
        .nth(1)
        .and_then(|rest| rest.split(". Valor").next())
        .unwrap_or(prompt)
        .to_uppercase();

    if description.contains("UBER") || description.contains("POSTO") {
        "Transporte"
    } else if description.contains("MERCADO") {
        "Mercado"
    } else if description.contains("NETFLIX") || description.contains("SPOTIFY") {
        "Assinaturas"
    } else if description.contains("IFOOD") {
        "restaurante"
    } else {
        "Categoria Inventada"
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    model: String,
    choices: Vec<Choice>,
}

#[derive(Debug, Serialize)]
struct Choice {
    message: Message,
}
