//! # lex-auth
//!
//! Credential handling for Lexora.
//!
//! Argon2id password hashes, HS256 access/refresh tokens, numeric OTP codes
//! stored only as digests, and the role guard used by the HTTP layer.

pub mod error;
pub mod guard;
pub mod jwt;
pub mod otp;
pub mod password;

pub use error::AuthError;
pub use guard::{authorize, authorize_at_least};
pub use jwt::{Claims, IssuedPair, TokenIssuer, TokenKind};
