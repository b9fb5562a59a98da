use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Role;

/// Lightweight authenticated identity for cross-crate passing.
///
/// Produced by `lex-auth` from a verified access token, consumed by service
/// methods for ownership and role checks. Contains only data fields.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AuthIdentity {
    /// Account ID (JWT `sub` claim).
    pub account_id: String,
    /// Account email at token issue time.
    pub email: String,
    /// Role at token issue time.
    pub role: Role,
}

impl AuthIdentity {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when the identity owns `owner_id` or is an admin.
    #[must_use]
    pub fn owns_or_admin(&self, owner_id: &str) -> bool {
        self.is_admin() || self.account_id == owner_id
    }
}
