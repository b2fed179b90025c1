//! Chat-completions client for the model provider.
//!
//! Calls never fail from the caller's point of view: every outcome,
//! including transport errors, comes back as a [`RawModelResult`] with the
//! measured latency.

use crate::models::RawModelResult;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Anything that can send a prompt to a named model.
pub trait ModelCaller: Send + Sync {
    /// Query `model` with `prompt`.
    fn call(&self, model: &str, prompt: &str) -> impl Future<Output = RawModelResult> + Send;
}

/// Why a single model call failed.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("HF_API_KEY not configured")]
    MissingApiKey,

    #[error("Request timeout after {0}s")]
    Timeout(u64),

    #[error("Cannot connect to model API at {0}")]
    Connect(String),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(String),
}

/// Settings for [`HuggingFaceClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "https://router.huggingface.co/v1/chat/completions".to_string(),
            api_key: None,
            temperature: 0.2,
            max_tokens: 512,
            timeout_seconds: 30,
        }
    }
}

/// Message in a chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// OpenAI-compatible chat completions request.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

/// Client for the Hugging Face router (OpenAI-compatible API).
pub struct HuggingFaceClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl HuggingFaceClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Send one chat request and return the assistant text.
    async fn send_chat(&self, model: &str, prompt: &str) -> Result<String, CallError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(CallError::MissingApiKey)?;

        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending chat request to {} for {}", self.config.api_url, model);

        let response = self
            .http_client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            return Err(CallError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(extract_content(&body).unwrap_or(body))
    }

    fn map_transport_error(&self, e: reqwest::Error) -> CallError {
        if e.is_timeout() {
            CallError::Timeout(self.config.timeout_seconds)
        } else if e.is_connect() {
            CallError::Connect(self.config.api_url.clone())
        } else {
            CallError::Transport(e.to_string())
        }
    }
}

impl ModelCaller for HuggingFaceClient {
    fn call(&self, model: &str, prompt: &str) -> impl Future<Output = RawModelResult> + Send {
        async move {
            if !self.has_api_key() {
                return RawModelResult::failure(model, CallError::MissingApiKey.to_string(), 0.0);
            }

            let start = Instant::now();
            let outcome = self.send_chat(model, prompt).await;
            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

            match outcome {
                Ok(text) => RawModelResult::success(model, text, latency_ms),
                Err(e) => RawModelResult::failure(model, e.to_string(), latency_ms),
            }
        }
    }
}

/// Pull `choices[0].message.content` out of a chat completions body.
fn extract_content(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// System message sent with every request.
const SYSTEM_PROMPT: &str = r#"You are an expert software debugging assistant.
Explain the root cause of code errors precisely and suggest concrete fixes.
Respect the programming language named in the request and use its terminology.
Only report real bugs; if the code is correct, say so.
Answer with a single JSON object and nothing else."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert!(config.api_url.starts_with("https://"));
        assert!(config.api_key.is_none());
        assert_eq!(config.max_tokens, 512);
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "{\"score\": 1}"}}]}"#;
        assert_eq!(extract_content(body).as_deref(), Some(r#"{"score": 1}"#));

        assert_eq!(extract_content(r#"{"choices": []}"#), None);
        assert_eq!(
            extract_content(r#"{"choices": [{"message": {"content": ""}}]}"#),
            None
        );
        assert_eq!(extract_content("not json"), None);
    }

    #[test]
    fn test_missing_api_key_short_circuits() {
        let client = HuggingFaceClient::new(ClientConfig::default()).unwrap();
        assert!(!client.has_api_key());

        let result = tokio_test::block_on(client.call("some/model", "prompt"));
        assert_eq!(result.model, "some/model");
        assert!(result.text.is_none());
        assert_eq!(result.latency_ms, 0.0);
        assert_eq!(result.error.as_deref(), Some("HF_API_KEY not configured"));
    }

    #[test]
    fn test_call_error_messages() {
        assert_eq!(CallError::Timeout(30).to_string(), "Request timeout after 30s");
        assert_eq!(
            CallError::Status {
                status: 503,
                body: "busy".to_string()
            }
            .to_string(),
            "API error 503: busy"
        );
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            max_tokens: 64,
            temperature: 0.2,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "m");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 64);
    }
}
