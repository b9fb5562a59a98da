//! Payout bank accounts for teachers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};

use lex_core::entities::BankAccount;
use lex_core::enums::Role;
use lex_db::inputs::NewBankAccount;

use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/bank-accounts", post(create).get(list))
        .route("/bank-accounts/:id", delete(remove))
        .route("/bank-accounts/:id/default", post(make_default))
}

async fn create(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(input): JsonBody<NewBankAccount>,
) -> ApiResult<(StatusCode, Json<BankAccount>)> {
    user.require_at_least(Role::Teacher)?;
    let account = state.svc.create_bank_account(user.id(), input).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn list(
    State(state): State<SharedState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<BankAccount>>> {
    user.require_at_least(Role::Teacher)?;
    Ok(Json(state.svc.list_bank_accounts(user.id()).await?))
}

async fn make_default(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<BankAccount>> {
    user.require_at_least(Role::Teacher)?;
    Ok(Json(
        state
            .svc
            .set_default_bank_account(user.identity(), &id)
            .await?,
    ))
}

async fn remove(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require_at_least(Role::Teacher)?;
    state.svc.delete_bank_account(user.identity(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
