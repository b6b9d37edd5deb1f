use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::{
    retry::{
        is_retryable_http_error, new_request_id, parse_retry_after_ms, retry_delay_ms,
        should_retry_status,
    },
    AiError, ChatRequest, ChatResponse, ChatUsage, LlmClient,
};

#[derive(Debug, Clone)]
/// Connection settings for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiConfig {
    pub api_base: String,
    pub api_key: String,
    pub request_timeout_ms: u64,
    pub max_retries: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            request_timeout_ms: 30_000,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone)]
/// OpenAI-compatible chat client with bounded retries.
pub struct OpenAiClient {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, AiError> {
        if config.api_key.trim().is_empty() {
            return Err(AiError::MissingApiKey);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = format!("Bearer {}", config.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer)
                .map_err(|e| AiError::InvalidResponse(format!("invalid API key header: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()?;

        Ok(Self { client, config })
    }

    fn chat_completions_url(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            return base.to_string();
        }

        format!("{base}/chat/completions")
    }
}

fn build_request_body(request: &ChatRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|message| {
            json!({
                "role": message.role.as_str(),
                "content": message.content,
            })
        })
        .collect();

    let mut body = json!({
        "model": request.model,
        "messages": messages,
    });
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    if request.json_mode {
        body["response_format"] = json!({ "type": "json_object" });
    }
    body
}

#[derive(Debug, Deserialize)]
struct WireChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct WireChatResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

fn parse_chat_response(raw: &str) -> Result<ChatResponse, AiError> {
    let parsed: WireChatResponse = serde_json::from_str(raw)?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiError::InvalidResponse("response carried no choices".to_string()))?;
    let usage = parsed.usage.unwrap_or_default();

    Ok(ChatResponse {
        text: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason,
        usage: ChatUsage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        },
    })
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, AiError> {
        let body = build_request_body(&request);
        let url = self.chat_completions_url();
        let max_retries = self.config.max_retries;

        for attempt in 0..=max_retries {
            let response = self
                .client
                .post(&url)
                .header("x-amana-request-id", new_request_id())
                .header("x-amana-retry-attempt", attempt.to_string())
                .json(&body)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let raw = response.text().await?;
                        return parse_chat_response(&raw);
                    }

                    let retry_after_ms = parse_retry_after_ms(response.headers());
                    let raw = response.text().await?;
                    if attempt < max_retries && should_retry_status(status.as_u16()) {
                        let backoff_ms = retry_delay_ms(attempt, retry_after_ms);
                        tracing::debug!(
                            status = status.as_u16(),
                            attempt,
                            backoff_ms,
                            "retrying chat completion after provider error"
                        );
                        sleep(std::time::Duration::from_millis(backoff_ms)).await;
                        continue;
                    }

                    return Err(AiError::HttpStatus {
                        status: status.as_u16(),
                        body: raw,
                    });
                }
                Err(error) => {
                    if attempt < max_retries && is_retryable_http_error(&error) {
                        let backoff_ms = retry_delay_ms(attempt, None);
                        tracing::debug!(
                            attempt,
                            backoff_ms,
                            "retrying chat completion after transport error"
                        );
                        sleep(std::time::Duration::from_millis(backoff_ms)).await;
                        continue;
                    }
                    return Err(AiError::Http(error));
                }
            }
        }

        Err(AiError::InvalidResponse(
            "request retry loop terminated unexpectedly".to_string(),
        ))
    }
}
