//! Role-based access checks.

use lex_core::enums::Role;
use lex_core::identity::AuthIdentity;

use crate::error::AuthError;

/// Allow `identity` only when its role is in `allowed`.
///
/// # Errors
///
/// Returns `AuthError::Forbidden` naming the roles that would pass.
pub fn authorize(identity: &AuthIdentity, allowed: &[Role]) -> Result<(), AuthError> {
    if identity.role.satisfies(allowed) {
        return Ok(());
    }
    let names: Vec<&str> = allowed.iter().map(|r| r.as_str()).collect();
    tracing::debug!(
        account_id = %identity.account_id,
        role = %identity.role,
        "role check failed"
    );
    Err(AuthError::Forbidden(format!(
        "requires role {}",
        names.join(" or ")
    )))
}

/// Allow `identity` when its role ranks at least `minimum`.
///
/// # Errors
///
/// Returns `AuthError::Forbidden`.
pub fn authorize_at_least(identity: &AuthIdentity, minimum: Role) -> Result<(), AuthError> {
    if identity.role.rank() >= minimum.rank() {
        Ok(())
    } else {
        Err(AuthError::Forbidden(format!("requires role {minimum} or higher")))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn as_role(role: Role) -> AuthIdentity {
        AuthIdentity {
            account_id: "acc-00000001".into(),
            email: "x@example.com".into(),
            role,
        }
    }

    #[rstest]
    #[case(Role::Admin, true)]
    #[case(Role::Teacher, true)]
    #[case(Role::Student, false)]
    fn teacher_routes(#[case] role: Role, #[case] allowed: bool) {
        let result = authorize(&as_role(role), &[Role::Teacher, Role::Admin]);
        assert_eq!(result.is_ok(), allowed);
    }

    #[test]
    fn forbidden_message_lists_roles() {
        let err = authorize(&as_role(Role::Student), &[Role::Admin]).unwrap_err();
        assert_eq!(err.to_string(), "forbidden: requires role admin");
        assert!(!err.is_unauthorized());
    }

    #[rstest]
    #[case(Role::Admin, Role::Teacher, true)]
    #[case(Role::Teacher, Role::Teacher, true)]
    #[case(Role::Student, Role::Teacher, false)]
    #[case(Role::Teacher, Role::Admin, false)]
    fn rank_checks(#[case] role: Role, #[case] minimum: Role, #[case] allowed: bool) {
        assert_eq!(authorize_at_least(&as_role(role), minimum).is_ok(), allowed);
    }
}
