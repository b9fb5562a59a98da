//! Language model and retrieval settings for the chat tutor.

use serde::{Deserialize, Serialize};

fn default_base_url() -> String {
    String::from("https://api.openai.com/v1")
}

fn default_model() -> String {
    String::from("gpt-4o-mini")
}

const fn default_temperature() -> f32 {
    0.3
}

const fn default_max_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl LlmConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

const fn default_top_k() -> usize {
    4
}

const fn default_min_score() -> f32 {
    0.2
}

const fn default_chunk_size() -> usize {
    800
}

const fn default_chunk_overlap() -> usize {
    100
}

const fn default_history_window() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RagConfig {
    /// Chunks placed in the prompt per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Chunks scoring below this cosine similarity are dropped.
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Target chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Previous messages replayed to the model.
    #[serde(default = "default_history_window")]
    pub history_window: u32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            history_window: default_history_window(),
        }
    }
}
