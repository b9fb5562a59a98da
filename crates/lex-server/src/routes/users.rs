use axum::extract::{Multipart, Path, Query, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;

use lex_core::entities::Account;
use lex_core::enums::Role;
use lex_core::responses::Page;
use lex_db::updates::account::AccountUpdate;

use crate::error::{ApiError, ApiResult};
use crate::extract::{AuthUser, JsonBody, PageQuery};
use crate::routes::uploads::read_upload;
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/users/me", get(me).patch(update_me))
        .route("/users/me/avatar", post(upload_avatar))
        .route("/users", get(list_users))
        .route("/users/:id/role", patch(set_role))
        .route("/users/:id/active", patch(set_active))
}

async fn me(State(state): State<SharedState>, user: AuthUser) -> ApiResult<Json<Account>> {
    Ok(Json(state.svc.get_account(user.id()).await?))
}

async fn update_me(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(update): JsonBody<AccountUpdate>,
) -> ApiResult<Json<Account>> {
    Ok(Json(state.svc.update_account(user.id(), update).await?))
}

async fn upload_avatar(
    State(state): State<SharedState>,
    user: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<Account>> {
    let upload = read_upload(multipart).await?;
    let stored = state
        .uploads
        .upload("avatars", &upload.file_name, &upload.content_type, upload.data)
        .await?;

    let previous = state.svc.get_account(user.id()).await?.avatar_url;
    let account = state.svc.set_avatar(user.id(), &stored.url).await?;

    if let Some(old) = previous {
        if let Some(key) = state.uploads.key_from_url(&old) {
            if let Err(error) = state.uploads.delete(key).await {
                tracing::warn!(%error, key, "failed to delete old avatar");
            }
        }
    }
    Ok(Json(account))
}

#[derive(Debug, Deserialize)]
struct UserFilter {
    role: Option<Role>,
}

async fn list_users(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(filter): Query<UserFilter>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<Account>>> {
    user.require(&[Role::Admin])?;
    let paging = state.paging(page.page, page.page_size);
    Ok(Json(state.svc.list_accounts(filter.role, paging).await?))
}

#[derive(Debug, Deserialize)]
struct RoleRequest {
    role: Role,
}

async fn set_role(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<RoleRequest>,
) -> ApiResult<Json<Account>> {
    user.require(&[Role::Admin])?;
    if id == user.id() {
        return Err(ApiError::bad_request("admins cannot change their own role"));
    }
    let account = state.svc.set_role(&id, req.role).await?;
    tracing::info!(account_id = %id, role = %req.role, by = user.id(), "role changed");
    Ok(Json(account))
}

#[derive(Debug, Deserialize)]
struct ActiveRequest {
    active: bool,
}

async fn set_active(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ActiveRequest>,
) -> ApiResult<Json<Account>> {
    user.require(&[Role::Admin])?;
    if id == user.id() {
        return Err(ApiError::bad_request("admins cannot deactivate themselves"));
    }
    Ok(Json(state.svc.set_active(&id, req.active).await?))
}
