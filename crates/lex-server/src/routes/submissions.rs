use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use lex_core::entities::Submission;
use lex_core::responses::{Page, SubmissionDetail};
use lex_db::inputs::AnswerInput;

use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody, PageQuery};
use crate::state::SharedState;
use crate::sweeper;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/submissions/:id", get(get_one))
        .route("/submissions/:id/submit", post(submit))
        .route("/me/submissions", get(mine))
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    answers: Vec<AnswerInput>,
}

async fn submit(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<SubmitRequest>,
) -> ApiResult<Json<SubmissionDetail>> {
    let detail = state.svc.submit_answers(user.id(), &id, req.answers).await?;
    if let Err(error) = sweeper::untrack_session(&state.svc, &id).await {
        // The sweeper skips attempts that are no longer in progress.
        tracing::warn!(submission = %id, %error, "failed to clear test session");
    }
    Ok(Json(detail))
}

async fn get_one(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<SubmissionDetail>> {
    Ok(Json(
        state.svc.get_submission_detail(user.identity(), &id).await?,
    ))
}

async fn mine(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<Submission>>> {
    let paging = state.paging(page.page, page.page_size);
    Ok(Json(
        state.svc.list_student_submissions(user.id(), paging).await?,
    ))
}
