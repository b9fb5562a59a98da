//! End-to-end credential flow: register hash, login check, token pair, refresh.

use chrono::Duration;
use lex_auth::otp::{OtpRecord, generate_otp};
use lex_auth::password::{hash_password, verify_password};
use lex_auth::{AuthError, TokenIssuer, TokenKind, authorize};
use lex_core::enums::Role;
use lex_core::identity::AuthIdentity;

fn issuer() -> TokenIssuer {
    TokenIssuer::from_config(&lex_config::JwtConfig {
        secret: "a-test-secret-that-is-long-enough!!".into(),
        ..Default::default()
    })
}

#[test]
fn login_then_refresh() {
    let stored = hash_password("s3cret-pass").unwrap();
    assert!(verify_password("s3cret-pass", &stored).unwrap());

    let student = AuthIdentity {
        account_id: "acc-12345678".into(),
        email: "an@example.com".into(),
        role: Role::Student,
    };
    let issuer = issuer();
    assert_eq!(issuer.access_ttl(), Duration::minutes(15));

    let pair = issuer.issue_pair(&student).unwrap();
    let refresh = issuer
        .verify(&pair.tokens.refresh_token, TokenKind::Refresh)
        .unwrap();
    let rotated = issuer.issue_pair(&refresh.to_identity()).unwrap();
    let access = issuer
        .verify(&rotated.tokens.access_token, TokenKind::Access)
        .unwrap();
    assert_eq!(access.sub, "acc-12345678");

    let denied = authorize(&access.to_identity(), &[Role::Teacher, Role::Admin]);
    assert!(matches!(denied, Err(AuthError::Forbidden(_))));
}

#[test]
fn otp_record_serializes_without_code() {
    let code = generate_otp(6).unwrap();
    let record = OtpRecord::new("acc-12345678", &code);
    let json = serde_json::to_string(&record).unwrap();
    assert!(!json.contains(&format!("\"{code}\"")));
    let back: OtpRecord = serde_json::from_str(&json).unwrap();
    assert!(back.matches(&code));
}
