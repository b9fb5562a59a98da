//! One error type for every handler, rendered as
//! `{"statusCode": u16, "error": "<reason>", "message": "<detail>"}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use lex_auth::AuthError;
use lex_core::errors::CoreError;
use lex_db::error::DatabaseError;
use lex_payments::PaymentError;
use lex_rag::{LlmError, RagError};
use lex_storage::StorageError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    /// An upstream service answered badly.
    #[error("{0}")]
    BadGateway(String),

    /// An upstream service is down or not configured.
    #[error("{0}")]
    Unavailable(String),

    /// Logged in full, reported to the client as a generic message.
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    status_code: u16,
    error: &'a str,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Internal(detail) => {
                tracing::error!(%detail, "request failed");
                "internal server error".to_string()
            }
            Self::BadGateway(ref detail) | Self::Unavailable(ref detail) => {
                tracing::warn!(%detail, %status, "upstream failure");
                detail.clone()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error"),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            CoreError::InvalidTransition { .. } => Self::BadRequest(err.to_string()),
            CoreError::Validation(msg) => Self::BadRequest(msg),
            CoreError::Forbidden(msg) => Self::Forbidden(msg),
            CoreError::Conflict(msg) => Self::Conflict(msg),
            CoreError::Other(e) => Self::Internal(format!("{e:#}")),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Core(core) => core.into(),
            DatabaseError::NoResult => Self::NotFound("not found".into()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_unauthorized() {
            return Self::Unauthorized(err.to_string());
        }
        match err {
            AuthError::Forbidden(msg) => Self::Forbidden(msg),
            AuthError::AccountDisabled => Self::Forbidden(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        if err.is_client_error() {
            Self::BadRequest(err.to_string())
        } else {
            Self::BadGateway(err.to_string())
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidSignature | PaymentError::MalformedWebhook(_) => {
                Self::BadRequest(err.to_string())
            }
            PaymentError::NotConfigured => Self::Unavailable(err.to_string()),
            PaymentError::Rejected { .. } | PaymentError::Http(_) | PaymentError::Parse(_) => {
                Self::BadGateway(err.to_string())
            }
            PaymentError::Signing(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Database(db) => db.into(),
            RagError::Llm(LlmError::Unavailable(_) | LlmError::RateLimited) => {
                Self::Unavailable(err.to_string())
            }
            RagError::Llm(_) => Self::BadGateway(err.to_string()),
            RagError::EmptyDocument(_) => Self::BadRequest(err.to_string()),
            RagError::Embedding(_) | RagError::Join(_) => Self::Internal(err.to_string()),
        }
    }
}
