//! Answer a tutor chat message with retrieved context and recent history.

use std::fmt::Write as _;
use std::sync::Arc;

use lex_config::{LlmConfig, RagConfig};
use lex_core::enums::ChatRole;
use lex_core::identity::AuthIdentity;
use lex_core::responses::ChatReply;
use lex_db::service::LexService;

use crate::backend::{CompletionRequest, LlmBackend, Turn};
use crate::error::RagError;
use crate::knowledge::{KnowledgeBase, RetrievedChunk};

const SYSTEM_PREAMBLE: &str = "You are Lexora, an English tutor helping learners prepare for the TOEIC. \
Answer clearly and briefly. When the reference material below is relevant, base your answer on it. \
If you do not know, say so.";

pub struct ChatPipeline {
    svc: Arc<LexService>,
    knowledge: Arc<KnowledgeBase>,
    backend: Arc<dyn LlmBackend>,
    rag: RagConfig,
    max_tokens: u32,
    temperature: f32,
}

impl ChatPipeline {
    pub fn new(
        svc: Arc<LexService>,
        knowledge: Arc<KnowledgeBase>,
        backend: Arc<dyn LlmBackend>,
        rag: RagConfig,
        llm: &LlmConfig,
    ) -> Self {
        Self {
            svc,
            knowledge,
            backend,
            rag,
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
        }
    }

    /// Store `message`, ask the model, store and return its answer.
    ///
    /// The user message is kept even when the model call fails.
    ///
    /// # Errors
    ///
    /// Returns `RagError::Database` for a missing or foreign session and
    /// `RagError::Llm` when the backend fails.
    pub async fn reply(
        &self,
        identity: &AuthIdentity,
        session_id: &str,
        message: &str,
    ) -> Result<ChatReply, RagError> {
        self.svc.get_chat_session(identity, session_id).await?;
        let history = self
            .svc
            .recent_messages(session_id, self.rag.history_window)
            .await?;
        let user_message = self
            .svc
            .append_message(session_id, ChatRole::User, message)
            .await?;

        let context = self
            .knowledge
            .retrieve(&user_message.content, self.rag.top_k, self.rag.min_score)
            .await?;

        let mut turns: Vec<Turn> = history
            .into_iter()
            .map(|m| match m.role {
                ChatRole::User => Turn::user(m.content),
                ChatRole::Assistant => Turn::assistant(m.content),
            })
            .collect();
        turns.push(Turn::user(user_message.content.clone()));

        let request = CompletionRequest {
            system_prompt: Some(system_prompt(&context)),
            turns,
            ..Default::default()
        }
        .with_max_tokens(self.max_tokens)
        .with_temperature(self.temperature);

        let completion = self.backend.complete(request).await.inspect_err(|e| {
            tracing::warn!(session_id, model = self.backend.id(), error = %e, "tutor completion failed");
        })?;

        let assistant_message = self
            .svc
            .append_message(session_id, ChatRole::Assistant, &completion.content)
            .await?;

        Ok(ChatReply {
            user_message,
            assistant_message,
            sources: distinct_sources(&context),
        })
    }
}

fn system_prompt(context: &[RetrievedChunk]) -> String {
    let mut prompt = SYSTEM_PREAMBLE.to_string();
    if context.is_empty() {
        return prompt;
    }
    prompt.push_str("\n\nReference material:\n");
    for (i, hit) in context.iter().enumerate() {
        let _ = write!(
            prompt,
            "\n[{}] ({})\n{}\n",
            i + 1,
            hit.chunk.source,
            hit.chunk.content
        );
    }
    prompt
}

/// Sources in rank order, first occurrence wins.
fn distinct_sources(context: &[RetrievedChunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for hit in context {
        if !sources.contains(&hit.chunk.source) {
            sources.push(hit.chunk.source.clone());
        }
    }
    sources
}
