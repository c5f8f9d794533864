//! Generation client for the OpenRouter chat-completions endpoint.
//!
//! The generation capability is an opaque, non-deterministic, fallible
//! function: retries here cover *request* failures only (transport errors,
//! non-success HTTP status, unusable response envelope). Content-level
//! disagreement is never retried at this boundary — that is the
//! convergence loop's job.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::config::RunnerConfig;
use crate::errors::RunnerError;
use crate::parse;

/// A role-tagged chat message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// Per-call generation parameters.
#[derive(Debug, Clone, Copy)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f64,
    /// Request `response_format: {"type": "json_object"}`.
    pub json_mode: bool,
}

impl GenerationOptions {
    pub fn text(max_tokens: u32, temperature: f64) -> Self {
        Self {
            max_tokens,
            temperature,
            json_mode: false,
        }
    }

    pub fn json(max_tokens: u32, temperature: f64) -> Self {
        Self {
            max_tokens,
            temperature,
            json_mode: true,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: MessageContent,
}

/// Message content arrives either as a plain string or as an array of
/// typed parts; both flatten to text.
#[derive(Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

impl MessageContent {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Parts(parts) => parts
                .into_iter()
                .filter(|p| p.kind == "text")
                .map(|p| p.text)
                .collect(),
        }
    }
}

/// Blocking-style (awaited, sequential) client with bounded retries.
pub struct GenerationClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    retries: u32,
}

impl GenerationClient {
    pub fn new(config: &RunnerConfig) -> Result<Self, RunnerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RunnerError::Configuration(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            retries: config.retries,
        })
    }

    /// Model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// One generation call, retried with backoff on request-level failures.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        opts: GenerationOptions,
    ) -> Result<String, RunnerError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: opts.max_tokens,
            temperature: opts.temperature,
            response_format: opts.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };
        let text = with_retries(self.retries, |_attempt| self.attempt(&body)).await?;
        Ok(text.trim().to_string())
    }

    /// JSON-mode generation call; the response is run through the lenient
    /// structured parser. Parse failures are terminal, never retried.
    pub async fn complete_json(
        &self,
        messages: &[ChatMessage],
        opts: GenerationOptions,
    ) -> Result<Value, RunnerError> {
        let raw = self
            .complete(
                messages,
                GenerationOptions {
                    json_mode: true,
                    ..opts
                },
            )
            .await?;
        parse::json_payload(&raw)
    }

    async fn attempt(&self, body: &CompletionRequest<'_>) -> Result<String, RunnerError> {
        let resp = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "https://local.jacdd")
            .header("X-Title", "LAPC Runner")
            .json(body)
            .send()
            .await
            .map_err(|e| RunnerError::upstream(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_else(|e| e.to_string());
            return Err(RunnerError::Upstream {
                status: Some(status.as_u16()),
                detail,
            });
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| RunnerError::upstream(format!("unusable response envelope: {e}")))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RunnerError::upstream("response contained no choices"))?;
        Ok(choice.message.content.into_text())
    }
}

/// Run `attempt_fn` up to `retries` times with linear-multiple backoff
/// (`attempt * 2` seconds) between failures; the final failure propagates.
async fn with_retries<T, F, Fut>(retries: u32, mut attempt_fn: F) -> Result<T, RunnerError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, RunnerError>>,
{
    for attempt in 1..=retries {
        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < retries => {
                warn!(attempt, error = %err, "generation request failed; backing off");
                tokio::time::sleep(Duration::from_secs(u64::from(attempt) * 2)).await;
            }
            Err(err) => return Err(err),
        }
    }
    Err(RunnerError::upstream("retry loop exited without a result"))
}
