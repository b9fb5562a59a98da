//! Tutor chat sessions and the knowledge base behind them.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use lex_core::entities::{ChatSession, Message};
use lex_core::enums::Role;
use lex_core::responses::{ChatReply, ChatSessionDetail, KnowledgeSourceSummary, Page};

use crate::error::{ApiError, ApiResult};
use crate::extract::{AuthUser, JsonBody, PageQuery};
use crate::state::SharedState;

/// Longest message accepted from a user, in characters.
const MAX_MESSAGE_CHARS: usize = 4000;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/chat/sessions", post(create_session).get(list_sessions))
        .route(
            "/chat/sessions/:id",
            get(get_session).delete(delete_session),
        )
        .route(
            "/chat/sessions/:id/messages",
            get(list_messages).post(send_message),
        )
        .route("/knowledge", post(ingest).get(list_sources))
        .route("/knowledge/:source", delete(delete_source))
}

#[derive(Debug, Default, Deserialize)]
struct CreateSessionRequest {
    #[serde(default)]
    title: Option<String>,
}

async fn create_session(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<ChatSession>)> {
    let session = state
        .svc
        .create_chat_session(user.id(), req.title.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn list_sessions(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<ChatSession>>> {
    let paging = state.paging(page.page, page.page_size);
    Ok(Json(state.svc.list_chat_sessions(user.id(), paging).await?))
}

async fn get_session(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ChatSessionDetail>> {
    Ok(Json(
        state
            .svc
            .get_chat_session_detail(user.identity(), &id)
            .await?,
    ))
}

async fn delete_session(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.svc.delete_chat_session(user.identity(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_messages(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<Message>>> {
    let paging = state.paging(page.page, page.page_size);
    Ok(Json(
        state
            .svc
            .list_messages(user.identity(), &id, paging)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    content: String,
}

fn check_message(content: &str) -> ApiResult<&str> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::bad_request(format!(
            "message is longer than {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(content)
}

async fn send_message(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<ChatReply>)> {
    let content = check_message(&req.content)?;
    let reply = state.chat.reply(user.identity(), &id, content).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

#[derive(Debug, Deserialize)]
struct IngestRequest {
    source: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct IngestResponse {
    source: String,
    chunks: usize,
}

async fn ingest(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(req): JsonBody<IngestRequest>,
) -> ApiResult<(StatusCode, Json<IngestResponse>)> {
    user.require(&[Role::Admin])?;
    let source = req.source.trim();
    if source.is_empty() {
        return Err(ApiError::bad_request("source must not be empty"));
    }
    let chunks = state.knowledge.ingest(source, &req.text).await?;
    tracing::info!(source, chunks = chunks.len(), "knowledge source ingested");
    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            source: source.to_string(),
            chunks: chunks.len(),
        }),
    ))
}

async fn list_sources(
    State(state): State<SharedState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<KnowledgeSourceSummary>>> {
    user.require(&[Role::Admin])?;
    Ok(Json(state.svc.list_knowledge_sources().await?))
}

async fn delete_source(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(source): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(&[Role::Admin])?;
    if state.svc.delete_knowledge_source(&source).await? == 0 {
        return Err(ApiError::NotFound(format!("knowledge source not found: {source}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_trimmed_and_bounded() {
        assert_eq!(check_message("  hello ").unwrap(), "hello");
        assert!(check_message("   ").is_err());
        assert!(check_message(&"a".repeat(MAX_MESSAGE_CHARS + 1)).is_err());
    }
}
