//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! Sends the whole transcript as `messages` and returns the first choice as
//! an assistant [`Turn`]. All OpenAI wire types are private to this module.
//! The provider is stateless: history is owned by the conversation store,
//! and retrying is the [`Gateway`](crate::llm::Gateway)'s job.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::conversation::{Role, Turn};
use crate::llm::ProviderError;

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions`.
///
/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: Option<f32>,
    timeout_seconds: u64,
    api_key: String,
}

// Hand-written so the key never lands in logs.
impl std::fmt::Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatibleProvider {
    /// Build a provider from config values and the API key, sent as
    /// `Authorization: Bearer <key>` on every request.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: Option<f32>,
        timeout_seconds: u64,
        api_key: String,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self { client, api_base_url, model, temperature, timeout_seconds, api_key })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One round-trip: the transcript goes out, one assistant turn comes back.
    pub async fn complete(&self, transcript: &[Turn]) -> Result<Turn, ProviderError> {
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: transcript,
            temperature: self.temperature,
        };

        debug!(
            model = %self.model,
            temperature = ?self.temperature,
            turns = transcript.len(),
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let response = self
            .client
            .post(&self.api_base_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.api_base_url, error = %e, "LLM HTTP request failed (transport)");
                self.transport_error(e)
            })?;

        let response = check_status(response).await?;

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "failed to deserialize LLM response");
            ProviderError::MalformedResponse(format!("failed to parse response body: {e}"))
        })?;

        debug!(choices = parsed.choices.len(), "received LLM response");
        trace!(response = %body, "full LLM response payload");

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ProviderError::MalformedResponse("response contains no choices".into()))?;

        if let Some(role) = message.role.as_deref() {
            if role != "assistant" {
                debug!(%role, "top choice carries a non-assistant role; recording as assistant");
            }
        }

        let content = message
            .content
            .ok_or_else(|| ProviderError::MalformedResponse("top choice has no content".into()))?;

        Ok(Turn { role: Role::Assistant, content })
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout_seconds)
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    /// `Turn` serialises as `{"role": "...", "content": "..."}`.
    messages: &'a [Turn],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Consume the response and return it if successful, or a classified error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&body) {
        let code = env.error.code.map(|v| match v {
            serde_json::Value::String(s) => format!(" [code={s}]"),
            other => format!(" [code={other}]"),
        }).unwrap_or_default();
        format!("{}{code}", env.error.message)
    } else {
        body
    };

    error!(%status, %message, "LLM request returned HTTP error");
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Unauthorized { status: status.as_u16(), message }
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(message),
        _ => ProviderError::Upstream { status: status.as_u16(), message },
    })
}
