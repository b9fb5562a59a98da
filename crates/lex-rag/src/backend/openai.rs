//! OpenAI-compatible `/chat/completions` client.
//!
//! Works with OpenAI, Azure-style proxies, vLLM, and Ollama.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};

use lex_config::LlmConfig;

use super::{CompletionRequest, CompletionResponse, LlmBackend, LlmError};

pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiBackend {
    #[must_use]
    pub fn new(base_url: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.to_string(),
        }
    }

    #[must_use]
    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(&config.base_url, &config.model, Some(config.api_key.clone()))
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<UsageResponse>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageResponse {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    fn id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut messages = Vec::with_capacity(request.turns.len() + 1);
        if let Some(ref system) = request.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        for turn in &request.turns {
            messages.push(ChatMessage {
                role: turn.role.as_str(),
                content: &turn.content,
            });
        }
        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let mut http = self.client.post(self.chat_completions_url()).json(&body);
        if let Some(ref key) = self.api_key {
            http = http.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        let response = http.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                LlmError::Unavailable(e.to_string())
            } else {
                LlmError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if status.is_server_error() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Unavailable(format!("HTTP {status}: {text}")));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed(format!("HTTP {status}: {text}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("no choices in response".into()))?;
        let (prompt_tokens, completion_tokens) = parsed
            .usage
            .map_or((0, 0), |u| (u.prompt_tokens, u.completion_tokens));

        tracing::debug!(model = %self.model, prompt_tokens, completion_tokens, "completion received");
        Ok(CompletionResponse {
            content,
            prompt_tokens,
            completion_tokens,
        })
    }
}
