//! Completion client adapter for the OpenRouter chat API
//!
//! Wraps a single OpenAI-compatible chat-completion endpoint. One request
//! per call: no retries, no streaming, transport default timeout. Every
//! failure mode is converted into a typed [`CompletionError`] at this
//! boundary; raw transport errors never reach the caller.

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use tracing::debug;

/// Fixed remote endpoint; not user-editable.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Per-call failure reasons, surfaced to the row processor as diagnostics.
#[derive(ThisError, Debug)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("empty response: no completion text returned")]
    EmptyResponse,
}

/// Seam between the batch pipeline and the network.
///
/// The production implementation is [`CompletionClient`]; tests substitute
/// a scripted backend so the driver runs without a network.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
    ) -> std::result::Result<String, CompletionError>;
}

/// Chat completion request body: one user-role message per call.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Completion client holding the HTTP client and the bearer credential.
///
/// The credential is forwarded verbatim on each request and never logged.
pub struct CompletionClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl CompletionClient {
    /// Create a new client. A blank credential is an initialization
    /// failure, fatal before any row is processed.
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(api_key, OPENROUTER_BASE_URL)
    }

    /// Create a client against a non-default endpoint. Test seam only.
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Init("API key must not be empty".to_string()));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| Error::Init(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn request(
        &self,
        request: &ChatRequest,
    ) -> std::result::Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(format!("API request failed: {}", e)))?;

        match response.status() {
            StatusCode::OK => {
                let body: ChatResponse = response.json().await.map_err(|e| {
                    CompletionError::Malformed(format!("Failed to parse response: {}", e))
                })?;
                extract_content(body)
            }
            StatusCode::UNAUTHORIZED => {
                Err(CompletionError::Auth("Invalid API key".to_string()))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(CompletionError::Api {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
    ) -> std::result::Result<String, CompletionError> {
        debug!("Requesting completion from model {}", model);

        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        self.request(&request).await
    }
}

/// Pull the first generated message's text out of a parsed response.
///
/// A structurally valid body with no choices, or with empty content, is the
/// distinct "empty response" failure rather than a transport error.
fn extract_content(response: ChatResponse) -> std::result::Result<String, CompletionError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    if content.is_empty() {
        return Err(CompletionError::EmptyResponse);
    }

    Ok(content)
}
