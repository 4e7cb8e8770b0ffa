use crate::error::{LlmError, Result};
use faultloc_locator::FaultlocConfig;
use faultloc_vector_store::TokenUsage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

const DEFAULT_BACKOFF: Duration = Duration::from_millis(1500);

/// Parsed JSON reply of one chat completion
#[derive(Debug, Clone)]
pub struct ChatJson {
    pub content: Value,
    pub usage: Option<TokenUsage>,
    pub raw_text: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    top_p: f32,
    messages: [Message<'a>; 2],
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: Option<String>,
}

/// OpenAI-compatible chat client that always asks for a JSON object reply.
///
/// Failed attempts are retried up to `max_retries` times, sleeping
/// `backoff * attempt` between them.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
    backoff: Duration,
}

impl ChatClient {
    pub fn new(config: &FaultlocConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.llm_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.llm_model.clone(),
            max_retries: config.llm_max_retries.max(1),
            backoff: DEFAULT_BACKOFF,
        })
    }

    /// Read the credential once, at process start
    pub fn from_env(config: &FaultlocConfig) -> Result<Self> {
        let key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::MissingCredential(API_KEY_VAR))?;
        Self::new(config, key)
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    pub async fn chat_json(&self, system: &str, user: &str, temperature: f32) -> Result<ChatJson> {
        let request = ChatRequest {
            model: &self.model,
            temperature,
            top_p: 1.0,
            messages: [
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let mut last_error = String::new();
        for attempt in 1..=self.max_retries {
            match self.send_once(&request).await {
                Ok(reply) => return Ok(reply),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    log::warn!(
                        "Chat completion attempt {attempt}/{} failed: {e}",
                        self.max_retries
                    );
                    last_error = e.to_string();
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }
        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries,
            last_error,
        })
    }

    async fn send_once(&self, request: &ChatRequest<'_>) -> Result<ChatJson> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        parse_chat_response(&body)
    }
}

/// Extract the JSON object from a chat completion body
pub fn parse_chat_response(body: &str) -> Result<ChatJson> {
    let parsed: ChatResponse = serde_json::from_str(body)?;
    let raw_text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LlmError::InvalidResponse("no message content".to_string()))?;
    let content: Value = serde_json::from_str(&raw_text)
        .map_err(|e| LlmError::InvalidResponse(format!("reply is not JSON: {e}")))?;
    if !content.is_object() {
        return Err(LlmError::InvalidResponse(
            "reply is not a JSON object".to_string(),
        ));
    }

    Ok(ChatJson {
        content,
        usage: parsed.usage,
        raw_text,
    })
}
