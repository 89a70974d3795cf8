//! Ollama chat API client implementation
//!
//! Implements the LlmClient trait against a local Ollama server with
//! support for both blocking and streaming responses. Streaming responses
//! arrive as newline-delimited JSON objects, one delta per line.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{
    CompletionRequest, CompletionResponse, LlmClient, LlmError, ResponseFormat, StreamChunk, TokenUsage,
};
use crate::config::LlmConfig;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 500;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Ollama chat API client
pub struct OllamaClient {
    model: String,
    base_url: String,
    temperature: f32,
    http: Client,
}

impl OllamaClient {
    /// Create a new client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            http,
        })
    }

    /// Build the request body for the Ollama chat endpoint
    fn build_request_body(&self, request: &CompletionRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": request
                .messages
                .iter()
                .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
                .collect::<Vec<_>>(),
            "stream": stream,
            "options": { "temperature": self.temperature },
        });

        if request.format == ResponseFormat::Json {
            body["format"] = serde_json::json!("json");
        }

        body
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    /// POST the request, retrying transient failures with backoff
    async fn send_with_retry(&self, body: &serde_json::Value) -> Result<reqwest::Response, LlmError> {
        let url = self.chat_url();
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "send_with_retry: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self.http.post(&url).json(body).send().await {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "send_with_retry: network error");
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "send_with_retry: retryable error");
                last_error = Some(LlmError::ApiError { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::ApiError { status, message: text });
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(model = %self.model, messages = request.messages.len(), "complete: called");
        let body = self.build_request_body(&request, false);

        let response = self.send_with_retry(&body).await?;
        let api_response: OllamaChatResponse = response.json().await?;

        if let Some(err) = api_response.error {
            return Err(LlmError::InvalidResponse(err));
        }

        let usage = api_response.usage();
        let content = api_response.message.map(|m| m.content).unwrap_or_default();
        debug!(content_len = content.len(), "complete: success");

        Ok(CompletionResponse {
            content,
            usage,
        })
    }

    async fn stream(
        &self,
        request: CompletionRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> Result<CompletionResponse, LlmError> {
        debug!(model = %self.model, messages = request.messages.len(), "stream: called");
        let body = self.build_request_body(&request, true);

        let response = self.send_with_retry(&body).await?;

        let mut byte_stream = response.bytes_stream();
        let mut buf = String::new();
        let mut full_content = String::new();
        let mut usage = None;
        let mut done = false;

        while let Some(chunk) = byte_stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    let _ = chunk_tx.send(StreamChunk::Error(e.to_string())).await;
                    return Err(LlmError::Network(e));
                }
            };
            buf.push_str(&String::from_utf8_lossy(&bytes));

            // Each complete line is one JSON delta object
            while let Some(pos) = buf.find('\n') {
                let line = buf[..pos].trim().to_string();
                buf.drain(..=pos);
                if line.is_empty() {
                    continue;
                }
                if process_stream_line(&line, &chunk_tx, &mut full_content, &mut usage).await? {
                    done = true;
                }
            }
            if done {
                break;
            }
        }

        // Final delta may arrive without a trailing newline
        let leftover = buf.trim();
        if !done && !leftover.is_empty() {
            process_stream_line(leftover, &chunk_tx, &mut full_content, &mut usage).await?;
        }

        debug!(content_len = full_content.len(), "stream: complete");
        let _ = chunk_tx.send(StreamChunk::Done { usage }).await;

        Ok(CompletionResponse {
            content: full_content,
            usage,
        })
    }
}

/// Handle one NDJSON line from the stream; returns true on the final delta
async fn process_stream_line(
    line: &str,
    chunk_tx: &mpsc::Sender<StreamChunk>,
    full_content: &mut String,
    usage: &mut Option<TokenUsage>,
) -> Result<bool, LlmError> {
    let delta: OllamaChatResponse = serde_json::from_str(line)?;

    if let Some(err) = delta.error {
        let _ = chunk_tx.send(StreamChunk::Error(err.clone())).await;
        return Err(LlmError::InvalidResponse(err));
    }

    if let Some(message) = &delta.message
        && !message.content.is_empty()
    {
        full_content.push_str(&message.content);
        let _ = chunk_tx.send(StreamChunk::TextDelta(message.content.clone())).await;
    }

    if delta.done {
        *usage = delta.usage();
        return Ok(true);
    }

    Ok(false)
}

// Ollama API response types

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaChatResponse {
    fn usage(&self) -> Option<TokenUsage> {
        match (self.prompt_eval_count, self.eval_count) {
            (None, None) => None,
            (prompt, completion) => Some(TokenUsage {
                prompt_tokens: prompt.unwrap_or(0),
                completion_tokens: completion.unwrap_or(0),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}
