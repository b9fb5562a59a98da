use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or malformed bearer token")]
    NotAuthenticated,

    #[error("token expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("expected a {expected} token")]
    WrongTokenKind { expected: &'static str },

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account is disabled")]
    AccountDisabled,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("random source failed: {0}")]
    Random(String),

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl AuthError {
    /// True for errors that mean "who are you?" rather than "you may not".
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated
                | Self::TokenExpired
                | Self::InvalidToken(_)
                | Self::WrongTokenKind { .. }
                | Self::InvalidCredentials
        )
    }
}
