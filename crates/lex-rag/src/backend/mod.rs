//! Chat-completion backends.

mod mock;
mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use mock::MockBackend;
pub use openai::OpenAiBackend;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// No backend configured, or the backend refused the connection.
    #[error("LLM backend unavailable: {0}")]
    Unavailable(String),

    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    #[error("LLM rate limited")]
    RateLimited,

    #[error("could not parse LLM response: {0}")]
    Parse(String),
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Model name, for logs.
    fn id(&self) -> &str;

    /// # Errors
    ///
    /// Returns `LlmError` on transport, status, or parse failures.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

impl TurnRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message of the conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system_prompt: Option<String>,
    pub turns: Vec<Turn>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::user(content)],
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_system(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}
