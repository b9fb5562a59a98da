//! Tests (TOEIC, practice, classroom): authoring, starting attempts,
//! submissions per test, and the leaderboard.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lex_core::entities::{Submission, Test};
use lex_core::enums::{Role, TestKind};
use lex_core::responses::{LeaderboardEntry, Page, TestDetail};
use lex_db::inputs::{NewQuestion, NewTest};
use lex_db::updates::test::TestUpdate;

use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody, PageQuery};
use crate::state::SharedState;
use crate::sweeper;

const DEFAULT_LEADERBOARD: u32 = 10;
const MAX_LEADERBOARD: u32 = 100;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/tests", post(create).get(list))
        .route("/tests/:id", get(get_one).patch(update).delete(remove))
        .route("/tests/:id/questions", post(add_questions))
        .route("/tests/:id/start", post(start))
        .route("/tests/:id/submissions", get(submissions))
        .route("/tests/:id/leaderboard", get(leaderboard))
}

async fn create(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(input): JsonBody<NewTest>,
) -> ApiResult<(StatusCode, Json<TestDetail>)> {
    user.require(&[Role::Teacher, Role::Admin])?;
    let detail = state
        .svc
        .create_test_with_questions(user.id(), input)
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[derive(Debug, Deserialize)]
struct TestQuery {
    kind: Option<TestKind>,
}

async fn list(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(query): Query<TestQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<Test>>> {
    let paging = state.paging(page.page, page.page_size);
    Ok(Json(
        state
            .svc
            .list_tests(user.identity(), query.kind, paging)
            .await?,
    ))
}

/// Correct answers are hidden unless the caller wrote the test.
async fn get_one(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<TestDetail>> {
    Ok(Json(state.svc.get_test_detail(user.identity(), &id).await?))
}

async fn update(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<TestUpdate>,
) -> ApiResult<Json<Test>> {
    Ok(Json(
        state.svc.update_test(user.identity(), &id, update).await?,
    ))
}

async fn remove(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.svc.delete_test(user.identity(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct QuestionsRequest {
    questions: Vec<NewQuestion>,
}

async fn add_questions(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<QuestionsRequest>,
) -> ApiResult<(StatusCode, Json<TestDetail>)> {
    let detail = state
        .svc
        .add_questions(user.identity(), &id, req.questions)
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[derive(Debug, Serialize)]
struct StartResponse {
    submission: Submission,
    /// When the sweeper will give up on this attempt.
    expires_at: DateTime<Utc>,
}

async fn start(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<StartResponse>> {
    user.require(&[Role::Student])?;
    let (submission, created) = state.svc.start_submission(user.identity(), &id).await?;
    let test = state.svc.get_test(&id).await?;
    let account = state.svc.get_account(user.id()).await?;

    // Resumes track too, in case the first tracking write was lost.
    let expires_at = sweeper::track_session(
        &state.svc,
        &submission,
        &test,
        &account.email,
        state.config.general.test_grace_secs,
    )
    .await?;
    tracing::debug!(submission = %submission.id, created, %expires_at, "test attempt started");

    Ok(Json(StartResponse {
        submission,
        expires_at,
    }))
}

async fn submissions(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<Submission>>> {
    let paging = state.paging(page.page, page.page_size);
    Ok(Json(
        state
            .svc
            .list_test_submissions(user.identity(), &id, paging)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    limit: Option<u32>,
}

fn leaderboard_limit(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_LEADERBOARD)
        .clamp(1, MAX_LEADERBOARD)
}

async fn leaderboard(
    State(state): State<SharedState>,
    _user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    state.svc.get_test(&id).await?;
    let limit = leaderboard_limit(query.limit);
    Ok(Json(state.svc.leaderboard(&id, limit).await?))
}
