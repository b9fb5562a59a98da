//! Request extractors: bearer authentication, JSON bodies with JSON errors,
//! and page parameters.

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use lex_auth::{AuthError, TokenKind, authorize, authorize_at_least};
use lex_core::enums::Role;
use lex_core::errors::CoreError;
use lex_core::identity::AuthIdentity;
use lex_db::error::DatabaseError;

use crate::error::ApiError;
use crate::state::SharedState;

/// The caller, from a verified `Authorization: Bearer <access token>`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthIdentity);

impl AuthUser {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0.account_id
    }

    #[must_use]
    pub const fn identity(&self) -> &AuthIdentity {
        &self.0
    }

    /// # Errors
    ///
    /// Returns 403 when the caller's role is not in `roles`.
    pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
        authorize(&self.0, roles).map_err(ApiError::from)
    }

    /// # Errors
    ///
    /// Returns 403 when the caller ranks below `minimum`.
    pub fn require_at_least(&self, minimum: Role) -> Result<(), ApiError> {
        authorize_at_least(&self.0, minimum).map_err(ApiError::from)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::NotAuthenticated)?;
        let claims = state.tokens.verify(token, TokenKind::Access)?;

        // Role and active flag come from the account, not the token, so admin
        // changes apply before the token expires.
        let account = match state.svc.get_account(&claims.sub).await {
            Ok(account) => account,
            Err(DatabaseError::Core(CoreError::NotFound { .. })) => {
                return Err(AuthError::InvalidToken("account no longer exists".into()).into());
            }
            Err(error) => return Err(error.into()),
        };
        if !account.is_active {
            return Err(AuthError::AccountDisabled.into());
        }
        Ok(Self(AuthIdentity {
            account_id: account.id,
            email: account.email,
            role: account.role,
        }))
    }
}

/// `Json<T>` whose rejection is an [`ApiError`].
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// `?page=&page_size=` on list endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}
