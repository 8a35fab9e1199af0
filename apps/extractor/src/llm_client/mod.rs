/// LLM Client: the single point of entry for model calls.
///
/// Everything that talks to the model goes through the `LanguageModel` trait so
/// the extraction pipeline and the assistant can run against a scripted double
/// in tests. `OllamaClient` is the production implementation and targets a
/// locally served model over Ollama's `/api/generate` endpoint.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(test)]
pub mod mock;
pub mod prompts;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model server error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model server unreachable at {0}")]
    Connection(String),

    #[error("Gave up after {retries} retries")]
    RetriesExhausted { retries: u32 },

    #[error("Model returned empty content")]
    EmptyContent,

    #[error("No response within {0:?}")]
    Timeout(Duration),
}

/// "Submit prompt, receive text." Implementations must be shareable across tasks.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError>;
}

/// Runs one model call, bounded by `deadline` when set.
pub async fn complete_within(
    llm: &dyn LanguageModel,
    prompt: &str,
    system: &str,
    deadline: Option<Duration>,
) -> Result<String, LlmError> {
    match deadline {
        Some(deadline) => tokio::time::timeout(deadline, llm.complete(prompt, system))
            .await
            .map_err(|_| LlmError::Timeout(deadline))?,
        None => llm.complete(prompt, system).await,
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorBody {
    error: String,
}

/// HTTP client for a local Ollama instance.
/// Wraps `/api/generate` with retry on transient failures.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Result<Self, LlmError> {
        // No client-level timeout: per-call deadlines are applied by callers.
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    /// Retries on connection failures, 429 and 5xx with exponential backoff.
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let request_body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Model call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&url).json(&request_body).send().await {
                Ok(r) => r,
                Err(e) if e.is_connect() => {
                    last_error = Some(LlmError::Connection(self.base_url.clone()));
                    continue;
                }
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Model server returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<OllamaErrorBody>(&body)
                    .map(|e| e.error)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let generated: GenerateResponse = response.json().await?;

            debug!(
                "Model call succeeded: prompt_tokens={:?}, output_tokens={:?}",
                generated.prompt_eval_count, generated.eval_count
            );

            if generated.response.trim().is_empty() {
                return Err(LlmError::EmptyContent);
            }
            return Ok(generated.response);
        }

        Err(last_error.unwrap_or(LlmError::RetriesExhausted {
            retries: MAX_RETRIES,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", "llama3.2:1b").unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model(), "llama3.2:1b");
    }

    #[tokio::test]
    async fn test_complete_returns_generated_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "llama3.2:1b",
                "stream": false
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response":"{\"email\":\"a@b.com\"}","done":true,"eval_count":7}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(&server.url(), "llama3.2:1b").unwrap();
        let text = client.complete("prompt", "system").await.unwrap();

        assert_eq!(text, r#"{"email":"a@b.com"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .with_status(404)
            .with_body(r#"{"error":"model 'missing' not found"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = OllamaClient::new(&server.url(), "missing").unwrap();
        let err = client.complete("prompt", "system").await.unwrap_err();

        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "model 'missing' not found");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_until_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .with_status(503)
            .with_body("overloaded")
            .expect(3)
            .create_async()
            .await;

        let client = OllamaClient::new(&server.url(), "llama3.2:1b").unwrap();
        let err = client.complete("prompt", "system").await.unwrap_err();

        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transient_failure_then_success() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("POST", "/api/generate")
            .with_status(500)
            .with_body("warming up")
            .expect(1)
            .create_async()
            .await;
        let succeeding = server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response":"Advanced","done":true}"#)
            .expect(1)
            .create_async()
            .await;

        let client = OllamaClient::new(&server.url(), "llama3.2:1b").unwrap();
        let text = client.complete("prompt", "system").await.unwrap();

        assert_eq!(text, "Advanced");
        failing.assert_async().await;
        succeeding.assert_async().await;
    }

    #[tokio::test]
    async fn test_blank_response_is_empty_content() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_body(r#"{"response":"   ","done":true}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(&server.url(), "llama3.2:1b").unwrap();
        let err = client.complete("prompt", "system").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }
}
