//! User reports and admin moderation.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use lex_core::entities::Report;
use lex_core::enums::{ReportStatus, Role};
use lex_core::responses::Page;
use lex_db::inputs::NewReport;

use crate::error::{ApiError, ApiResult};
use crate::extract::{AuthUser, JsonBody, PageQuery};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/reports", post(create).get(list))
        .route("/reports/:id", get(get_one))
        .route("/reports/:id/resolve", post(resolve))
        .route("/reports/:id/reject", post(reject))
}

async fn create(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(input): JsonBody<NewReport>,
) -> ApiResult<(StatusCode, Json<Report>)> {
    let report = state.svc.create_report(user.id(), input).await?;
    tracing::info!(report = %report.id, target = %report.target, "report filed");
    Ok((StatusCode::CREATED, Json(report)))
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    status: Option<ReportStatus>,
}

async fn list(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(query): Query<ReportQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<Report>>> {
    user.require(&[Role::Admin])?;
    let paging = state.paging(page.page, page.page_size);
    Ok(Json(state.svc.list_reports(query.status, paging).await?))
}

async fn get_one(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Report>> {
    let report = state.svc.get_report(&id).await?;
    if !user.identity().owns_or_admin(&report.reporter_id) {
        return Err(ApiError::Forbidden(
            "only the reporter or an admin may view this report".into(),
        ));
    }
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct ModerationRequest {
    #[serde(default)]
    note: Option<String>,
}

async fn moderate(
    state: &SharedState,
    user: &AuthUser,
    id: &str,
    next: ReportStatus,
    note: Option<&str>,
) -> ApiResult<Json<Report>> {
    user.require(&[Role::Admin])?;
    let report = state.svc.resolve_report(user.id(), id, next, note).await?;
    Ok(Json(report))
}

async fn resolve(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ModerationRequest>,
) -> ApiResult<Json<Report>> {
    moderate(&state, &user, &id, ReportStatus::Resolved, req.note.as_deref()).await
}

async fn reject(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ModerationRequest>,
) -> ApiResult<Json<Report>> {
    moderate(&state, &user, &id, ReportStatus::Rejected, req.note.as_deref()).await
}
