//! HTTP client for an OpenAI-compatible chat-completion endpoint.
//!
//! The transport is chosen once, at construction: without an API key the
//! client is permanently disabled and never opens a connection. With a key,
//! each call is retried up to a fixed budget with linear back-off, and each
//! attempt is bounded by the request timeout.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use memescope_core::AppConfig;

use crate::error::LlmError;
use crate::message::{ChatMessage, GenerationParams};
use crate::retry::retry_linear;

/// Anything that can turn a message list into generated text.
///
/// Implementations never fail: an empty string means "no result" and the
/// caller applies its own fallback.
pub trait Completion: Send + Sync {
    fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> impl Future<Output = String> + Send;
}

/// Construction-time settings for [`CompletionClient`].
#[derive(Clone)]
pub struct ClientSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl ClientSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            api_key: config.llm_api_key.clone(),
            base_url: config.llm_base_url.clone(),
            request_timeout: Duration::from_secs(config.llm_request_timeout_secs),
            max_attempts: config.llm_max_attempts,
            backoff_step: Duration::from_secs(config.llm_backoff_step_secs),
        }
    }
}

impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_step", &self.backoff_step)
            .finish()
    }
}

enum Transport {
    Disabled,
    Http {
        client: Client,
        api_key: String,
        endpoint: Url,
    },
}

/// Chat-completion client with a fixed attempt budget.
pub struct CompletionClient {
    transport: Transport,
    max_attempts: u32,
    backoff_step: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl CompletionClient {
    /// Creates a client. A missing or blank API key yields a disabled client.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the underlying `reqwest::Client` cannot be
    /// constructed, or [`LlmError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(settings: &ClientSettings) -> Result<Self, LlmError> {
        let max_attempts = settings.max_attempts.max(1);
        let backoff_step = settings.backoff_step;

        let Some(api_key) = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
        else {
            tracing::warn!("no completion API key configured; completion calls are disabled");
            return Ok(Self {
                transport: Transport::Disabled,
                max_attempts,
                backoff_step,
            });
        };

        let client = Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("memescope/0.1 (trend-report)")
            .build()?;

        let raw = format!(
            "{}/chat/completions",
            settings.base_url.trim_end_matches('/')
        );
        let endpoint = Url::parse(&raw).map_err(|e| LlmError::InvalidBaseUrl {
            url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;

        tracing::info!(endpoint = %endpoint, max_attempts, "completion client ready");

        Ok(Self {
            transport: Transport::Http {
                client,
                api_key: api_key.to_owned(),
                endpoint,
            },
            max_attempts,
            backoff_step,
        })
    }

    /// Whether this client will ever issue a network request.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self.transport, Transport::Http { .. })
    }

    /// Sends one completion request, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - [`LlmError::Disabled`] immediately when no API key was configured.
    /// - The last attempt's error once the attempt budget is exhausted.
    pub async fn try_complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, LlmError> {
        let Transport::Http {
            client,
            api_key,
            endpoint,
        } = &self.transport
        else {
            tracing::warn!("completion skipped: client is disabled");
            return Err(LlmError::Disabled);
        };

        let request = ChatRequest {
            model: &params.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            stream: false,
        };
        let body = serde_json::to_vec(&request).map_err(LlmError::Encode)?;
        let payload_bytes = body.len();
        let max_attempts = self.max_attempts;

        retry_linear(max_attempts, self.backoff_step, |attempt| {
            let body = body.clone();
            async move {
                let result = Self::send_once(client, api_key, endpoint, body).await;
                match &result {
                    Ok(content) => tracing::info!(
                        attempt,
                        max_attempts,
                        payload_bytes,
                        content_len = content.len(),
                        success = true,
                        "completion attempt finished"
                    ),
                    Err(e) => tracing::info!(
                        attempt,
                        max_attempts,
                        payload_bytes,
                        success = false,
                        error = %e,
                        "completion attempt finished"
                    ),
                }
                result
            }
        })
        .await
    }

    async fn send_once(
        client: &Client,
        api_key: &str,
        endpoint: &Url,
        body: Vec<u8>,
    ) -> Result<String, LlmError> {
        let response = client
            .post(endpoint.clone())
            .bearer_auth(api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text.chars().take(300).collect(),
            });
        }

        let envelope: ChatResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Deserialize {
                context: endpoint.to_string(),
                source: e,
            })?;

        envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyChoices)
    }
}

impl Completion for CompletionClient {
    async fn complete(&self, messages: &[ChatMessage], params: &GenerationParams) -> String {
        match self.try_complete(messages, params).await {
            Ok(content) => content,
            Err(LlmError::Disabled) => String::new(),
            Err(e) => {
                tracing::error!(error = %e, model = %params.model, "completion failed");
                String::new()
            }
        }
    }
}
