use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use lex_core::entities::Lesson;
use lex_db::updates::lesson::LessonUpdate;

use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new().route(
        "/lessons/:id",
        get(get_one).patch(update).delete(remove),
    )
}

async fn get_one(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Lesson>> {
    Ok(Json(state.svc.get_lesson(user.identity(), &id).await?))
}

async fn update(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<LessonUpdate>,
) -> ApiResult<Json<Lesson>> {
    Ok(Json(
        state.svc.update_lesson(user.identity(), &id, update).await?,
    ))
}

async fn remove(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.svc.delete_lesson(user.identity(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
