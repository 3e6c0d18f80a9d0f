//! JSON parsing helpers for oracle responses
//!
//! Models often wrap the JSON payload in prose or code fences, so the
//! outermost `{...}` span is extracted before deserializing.

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct CategoryAnswer {
    category: String,
}

fn truncate(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Extract the category name from a model response
pub fn parse_category_response(response: &str) -> Result<String> {
    let response = response.trim();
    let start = response.find('{');
    let end = response.rfind('}');

    match (start, end) {
        (Some(s), Some(e)) if s < e => {
            let json_str = &response[s..=e];
            let answer: CategoryAnswer = serde_json::from_str(json_str).map_err(|e| {
                Error::Oracle(format!(
                    "Invalid JSON from oracle: {} | Raw: {}",
                    e,
                    truncate(json_str)
                ))
            })?;
            Ok(answer.category)
        }
        _ => Err(Error::Oracle(format!(
            "No JSON found in oracle response | Raw: {}",
            truncate(response)
        ))),
    }
}
