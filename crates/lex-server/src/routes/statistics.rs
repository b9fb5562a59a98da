use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use lex_core::enums::Role;
use lex_core::responses::{AdminOverview, StudentOverview, TeacherOverview};

use crate::error::{ApiError, ApiResult};
use crate::extract::AuthUser;
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/statistics/admin", get(admin))
        .route("/statistics/teacher", get(teacher))
        .route("/statistics/student", get(student))
}

#[derive(Debug, Deserialize)]
struct AccountQuery {
    account_id: Option<String>,
}

/// Admins may look at anyone; everyone else only at themselves.
fn subject(user: &AuthUser, requested: Option<String>) -> ApiResult<String> {
    match requested {
        Some(id) if id != user.id() => {
            if user.identity().is_admin() {
                Ok(id)
            } else {
                Err(ApiError::Forbidden(
                    "only admins may view another account's statistics".into(),
                ))
            }
        }
        _ => Ok(user.id().to_string()),
    }
}

async fn admin(
    State(state): State<SharedState>,
    user: AuthUser,
) -> ApiResult<Json<AdminOverview>> {
    user.require(&[Role::Admin])?;
    Ok(Json(state.svc.admin_overview().await?))
}

async fn teacher(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(query): Query<AccountQuery>,
) -> ApiResult<Json<TeacherOverview>> {
    user.require(&[Role::Teacher, Role::Admin])?;
    let id = subject(&user, query.account_id)?;
    Ok(Json(state.svc.teacher_overview(&id).await?))
}

async fn student(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(query): Query<AccountQuery>,
) -> ApiResult<Json<StudentOverview>> {
    let id = subject(&user, query.account_id)?;
    Ok(Json(state.svc.student_overview(&id).await?))
}
