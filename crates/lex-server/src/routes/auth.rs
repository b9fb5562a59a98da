//! Registration, login, token rotation, and password recovery.
//!
//! Refresh tokens are single use: each live `jti` is stored under
//! `refresh:<jti>` and taken on refresh or logout. Password reset is a
//! mailed OTP exchanged for a short-lived reset token.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use lex_auth::otp::{OtpRecord, generate_otp, generate_token};
use lex_auth::password::{check_password_strength, hash_password, verify_password};
use lex_auth::{AuthError, IssuedPair, TokenKind};
use lex_core::entities::Account;
use lex_core::enums::Role;
use lex_core::identity::AuthIdentity;
use lex_core::responses::AuthResponse;
use lex_db::repos::account::normalize_email;

use crate::error::{ApiError, ApiResult};
use crate::extract::{AuthUser, JsonBody};
use crate::state::{AppState, SharedState};

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/change-password", post(change_password))
}

fn refresh_key(jti: &str) -> String {
    format!("refresh:{jti}")
}

fn otp_key(email: &str) -> String {
    format!("otp:{email}")
}

fn reset_key(token: &str) -> String {
    format!("reset:{token}")
}

fn identity_of(account: &Account) -> AuthIdentity {
    AuthIdentity {
        account_id: account.id.clone(),
        email: account.email.clone(),
        role: account.role,
    }
}

/// Issue a token pair and remember its refresh `jti`.
async fn issue_tokens(state: &AppState, account: &Account) -> ApiResult<IssuedPair> {
    let issued = state.tokens.issue_pair(&identity_of(account))?;
    state
        .svc
        .kv_set_until(
            &refresh_key(&issued.refresh_jti),
            &account.id,
            Some(issued.refresh_expires_at),
        )
        .await?;
    Ok(issued)
}

fn strong_password(password: &str) -> ApiResult<()> {
    check_password_strength(password).map_err(ApiError::BadRequest)
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
    full_name: String,
    #[serde(default)]
    role: Option<Role>,
}

async fn register(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let role = req.role.unwrap_or(Role::Student);
    if !role.is_self_assignable() {
        return Err(ApiError::bad_request(format!("cannot register as {role}")));
    }
    strong_password(&req.password)?;
    let hash = hash_password(&req.password)?;
    let account = state
        .svc
        .create_account(&req.email, &hash, &req.full_name, role)
        .await?;
    let issued = issue_tokens(&state, &account).await?;
    tracing::info!(account_id = %account.id, %role, "account registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            account,
            tokens: issued.tokens,
        }),
    ))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let Some((account, hash)) = state.svc.get_credentials_by_email(&req.email).await? else {
        return Err(AuthError::InvalidCredentials.into());
    };
    if !verify_password(&req.password, &hash)? {
        return Err(AuthError::InvalidCredentials.into());
    }
    if !account.is_active {
        return Err(AuthError::AccountDisabled.into());
    }
    let issued = issue_tokens(&state, &account).await?;
    Ok(Json(AuthResponse {
        account,
        tokens: issued.tokens,
    }))
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

async fn refresh(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let claims = state.tokens.verify(&req.refresh_token, TokenKind::Refresh)?;
    let owner: Option<String> = state.svc.kv_take(&refresh_key(&claims.jti)).await?;
    if owner.as_deref() != Some(claims.sub.as_str()) {
        return Err(AuthError::InvalidToken("refresh token was revoked".into()).into());
    }
    // Role and active flag come from the database, not the old token.
    let account = state.svc.get_account(&claims.sub).await?;
    if !account.is_active {
        return Err(AuthError::AccountDisabled.into());
    }
    let issued = issue_tokens(&state, &account).await?;
    Ok(Json(AuthResponse {
        account,
        tokens: issued.tokens,
    }))
}

async fn logout(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> ApiResult<StatusCode> {
    let claims = state.tokens.verify(&req.refresh_token, TokenKind::Refresh)?;
    state.svc.kv_delete(&refresh_key(&claims.jti)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

#[derive(Debug, Serialize)]
struct Accepted {
    message: &'static str,
}

/// Always 202, whether or not the email is known.
async fn forgot_password(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<ForgotPasswordRequest>,
) -> ApiResult<(StatusCode, Json<Accepted>)> {
    let email = normalize_email(&req.email);
    if let Some(account) = state.svc.get_account_by_email(&email).await? {
        if account.is_active {
            let otp = &state.config.otp;
            let code = generate_otp(otp.length)?;
            state
                .svc
                .kv_set(
                    &otp_key(&email),
                    &OtpRecord::new(&account.id, &code),
                    Some(Duration::seconds(otp.ttl_secs)),
                )
                .await?;
            let body = format!(
                "Your Lexora verification code is {code}. It expires in {} minutes.",
                otp.ttl_secs / 60
            );
            if let Err(error) = state.mailer.send(&email, "Reset your password", &body).await {
                tracing::warn!(%error, "password reset mail failed");
            }
        }
    }
    Ok((
        StatusCode::ACCEPTED,
        Json(Accepted {
            message: "if the account exists, a verification code has been sent",
        }),
    ))
}

#[derive(Debug, Deserialize)]
struct VerifyOtpRequest {
    email: String,
    code: String,
}

#[derive(Debug, Serialize)]
struct ResetTokenResponse {
    reset_token: String,
    expires_in: i64,
}

async fn verify_otp(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<VerifyOtpRequest>,
) -> ApiResult<Json<ResetTokenResponse>> {
    let email = normalize_email(&req.email);
    let key = otp_key(&email);
    let max_attempts = state.config.otp.max_attempts;
    let Some(record) = state.svc.kv_get::<OtpRecord>(&key).await? else {
        return Err(ApiError::bad_request("code expired or was never requested"));
    };

    if !record.matches(&req.code) {
        let Some(attempts) = state.svc.kv_increment_field(&key, "attempts").await? else {
            return Err(ApiError::bad_request("code expired or was never requested"));
        };
        if attempts >= max_attempts {
            state.svc.kv_delete(&key).await?;
            tracing::warn!(attempts, "verification code locked out");
            return Err(ApiError::bad_request(
                "too many wrong codes; request a new one",
            ));
        }
        return Err(ApiError::bad_request("wrong verification code"));
    }

    // A racing verify may have consumed it, or wrong guesses used it up meanwhile.
    match state.svc.kv_take::<OtpRecord>(&key).await? {
        Some(taken) if taken.attempts < max_attempts => {}
        _ => return Err(ApiError::bad_request("code expired or was never requested")),
    }
    let ttl = state.config.otp.reset_token_ttl_secs;
    let reset_token = generate_token(32)?;
    state
        .svc
        .kv_set(
            &reset_key(&reset_token),
            &record.account_id,
            Some(Duration::seconds(ttl)),
        )
        .await?;
    Ok(Json(ResetTokenResponse {
        reset_token,
        expires_in: ttl,
    }))
}

#[derive(Debug, Deserialize)]
struct ResetPasswordRequest {
    reset_token: String,
    new_password: String,
}

async fn reset_password(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> ApiResult<StatusCode> {
    strong_password(&req.new_password)?;
    let Some(account_id) = state
        .svc
        .kv_take::<String>(&reset_key(&req.reset_token))
        .await?
    else {
        return Err(ApiError::bad_request("reset token is invalid or expired"));
    };
    let hash = hash_password(&req.new_password)?;
    state.svc.set_password_hash(&account_id, &hash).await?;
    tracing::info!(%account_id, "password reset");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(req): JsonBody<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    let hash = state.svc.get_password_hash(user.id()).await?;
    if !verify_password(&req.current_password, &hash)? {
        return Err(ApiError::bad_request("current password is incorrect"));
    }
    strong_password(&req.new_password)?;
    let new_hash = hash_password(&req.new_password)?;
    state.svc.set_password_hash(user.id(), &new_hash).await?;
    Ok(StatusCode::NO_CONTENT)
}
