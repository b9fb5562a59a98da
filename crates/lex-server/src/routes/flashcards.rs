use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use lex_core::entities::{Flashcard, FlashcardSet};
use lex_core::responses::{FlashcardSetDetail, Page};
use lex_db::inputs::{NewFlashcard, NewFlashcardSet};
use lex_db::updates::flashcard::FlashcardSetUpdate;

use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody, PageQuery};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/flashcards", post(create).get(list))
        .route(
            "/flashcards/:id",
            get(get_one).patch(update).delete(remove),
        )
        .route("/flashcards/:id/cards", post(add_cards))
        .route("/flashcards/:id/cards/:card_id", delete(remove_card))
}

async fn create(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(input): JsonBody<NewFlashcardSet>,
) -> ApiResult<(StatusCode, Json<FlashcardSetDetail>)> {
    let detail = state.svc.create_flashcard_set(user.id(), input).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// The caller's own sets.
async fn list(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<FlashcardSet>>> {
    let paging = state.paging(page.page, page.page_size);
    Ok(Json(state.svc.list_flashcard_sets(user.id(), paging).await?))
}

async fn get_one(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<FlashcardSetDetail>> {
    Ok(Json(state.svc.get_flashcard_set(user.identity(), &id).await?))
}

async fn update(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<FlashcardSetUpdate>,
) -> ApiResult<Json<FlashcardSet>> {
    Ok(Json(
        state
            .svc
            .update_flashcard_set(user.identity(), &id, update)
            .await?,
    ))
}

async fn remove(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.svc.delete_flashcard_set(user.identity(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct CardsRequest {
    cards: Vec<NewFlashcard>,
}

async fn add_cards(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CardsRequest>,
) -> ApiResult<(StatusCode, Json<Vec<Flashcard>>)> {
    let cards = state
        .svc
        .add_flashcards(user.identity(), &id, req.cards)
        .await?;
    Ok((StatusCode::CREATED, Json(cards)))
}

async fn remove_card(
    State(state): State<SharedState>,
    user: AuthUser,
    Path((id, card_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .svc
        .delete_flashcard(user.identity(), &id, &card_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
