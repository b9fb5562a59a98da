//! HS256 access and refresh tokens.
//!
//! Both kinds carry the same claims and differ in `kind` and lifetime.
//! Every token has a random `jti`; the server keeps live refresh `jti`s in
//! its key-value store so logout and rotation can revoke them.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use lex_config::JwtConfig;
use lex_core::enums::Role;
use lex_core::identity::AuthIdentity;
use lex_core::responses::TokenPair;

use crate::error::AuthError;
use crate::otp::generate_token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account ID.
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub kind: TokenKind,
    pub jti: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn to_identity(&self) -> AuthIdentity {
        AuthIdentity {
            account_id: self.sub.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }

    /// Seconds until expiry, zero when already expired.
    #[must_use]
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.exp - now.timestamp()).max(0)
    }
}

/// A freshly issued token pair plus what the caller needs to track the refresh token.
#[derive(Debug, Clone)]
pub struct IssuedPair {
    pub tokens: TokenPair,
    pub refresh_jti: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Signs and verifies tokens with one shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &str, issuer: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Build from the `[jwt]` config section.
    #[must_use]
    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(
            &config.secret,
            &config.issuer,
            Duration::seconds(config.access_ttl_secs),
            Duration::seconds(config.refresh_ttl_secs),
        )
    }

    #[must_use]
    pub const fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub const fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue an access and a refresh token for `identity`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` or `AuthError::Random` on failure.
    pub fn issue_pair(&self, identity: &AuthIdentity) -> Result<IssuedPair, AuthError> {
        self.issue_pair_at(identity, Utc::now())
    }

    /// [`issue_pair`](Self::issue_pair) with an explicit issue time.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` or `AuthError::Random` on failure.
    pub fn issue_pair_at(
        &self,
        identity: &AuthIdentity,
        now: DateTime<Utc>,
    ) -> Result<IssuedPair, AuthError> {
        let access = self.claims(identity, TokenKind::Access, now, self.access_ttl)?;
        let refresh = self.claims(identity, TokenKind::Refresh, now, self.refresh_ttl)?;
        let tokens = TokenPair {
            access_token: self.sign(&access)?,
            refresh_token: self.sign(&refresh)?,
            token_type: "Bearer".into(),
            expires_in: self.access_ttl.num_seconds(),
        };
        Ok(IssuedPair {
            tokens,
            refresh_jti: refresh.jti,
            refresh_expires_at: now + self.refresh_ttl,
        })
    }

    fn claims(
        &self,
        identity: &AuthIdentity,
        kind: TokenKind,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Claims, AuthError> {
        Ok(Claims {
            sub: identity.account_id.clone(),
            email: identity.email.clone(),
            role: identity.role,
            kind,
            jti: generate_token(16)?,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify signature, issuer, expiry, and kind.
    ///
    /// # Errors
    ///
    /// `TokenExpired` for expired tokens, `WrongTokenKind` when a refresh
    /// token is presented as access or vice versa, `InvalidToken` otherwise.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;
        if data.claims.kind != expected {
            return Err(AuthError::WrongTokenKind {
                expected: expected.as_str(),
            });
        }
        Ok(data.claims)
    }
}
