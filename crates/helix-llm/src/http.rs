//! Generic single-call HTTP completion provider.
//!
//! Talks to a Gemini-style `generateContent` endpoint: one prompt, one
//! JSON response with the completion text nested under
//! `candidates[0].content.parts[0].text`. Any provider reachable through
//! that shape (or fronted by a compatible proxy) can be pointed at
//! through `with_base_url`.

use crate::provider::{LlmError, LlmProvider, LlmResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub struct HttpProvider {
    client: Client,
    api_key: String,
    base_url: String,
    models: Vec<String>,
}

impl HttpProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, models: Vec<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            models,
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn models(&self) -> Vec<&str> {
        self.models.iter().map(String::as_str).collect()
    }

    async fn complete(&self, prompt: &str, model: &str, timeout: Duration) -> LlmResult<String> {
        let url = format!("{}/{}:generateContent?key={}", self.base_url, model, self.api_key);
        let payload = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt.to_string() }],
            }],
        };

        debug!("http provider request: model={}", model);

        let response = tokio::time::timeout(timeout, self.client.post(&url).json(&payload).send())
            .await
            .map_err(|_| LlmError::Timeout(timeout))??;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("http provider error {}: {}", status, body);
            return Err(match status.as_u16() {
                401 | 403 => LlmError::AuthFailed(body),
                404 => LlmError::ModelNotFound(model.to_string()),
                429 => LlmError::RateLimited { retry_after_ms: 60_000 },
                _ => LlmError::RequestFailed(format!("{}: {}", status, body)),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| LlmError::InvalidResponse("no candidates in response".to_string()))?;

        Ok(strip_code_fence(&text))
    }
}

/// Strips a leading/trailing ```go or ``` fence, mirroring the original
/// generator's markdown cleanup.
fn strip_code_fence(text: &str) -> String {
    text.replace("```go", "").replace("```", "").trim().to_string()
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_go_fence() {
        let raw = "```go\npackage main\n```";
        assert_eq!(strip_code_fence(raw), "package main");
    }

    #[test]
    fn strips_bare_fence() {
        let raw = "```\nhello\n```";
        assert_eq!(strip_code_fence(raw), "hello");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fence("package main"), "package main");
    }
}
