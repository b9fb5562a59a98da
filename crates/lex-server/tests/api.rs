//! Request-level tests against the full router with in-memory services.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};
use tower::ServiceExt;

use lex_config::LexConfig;
use lex_core::enums::Role;
use lex_db::service::LexService;
use lex_embeddings::HashEmbedder;
use lex_payments::{MockGateway, PaymentGateway};
use lex_payments::signature::sign_data;
use lex_rag::MockBackend;
use lex_server::mailer::MemoryMailer;
use lex_server::state::Parts;
use lex_server::sweeper::session_key;
use lex_server::{AppState, SharedState, router};
use lex_storage::UploadStore;

const CHECKSUM_KEY: &str = "test-checksum-key";
const PASSWORD: &str = "correct-horse-battery";

struct TestApp {
    router: Router,
    state: SharedState,
    mailer: Arc<MemoryMailer>,
    gateway: Arc<MockGateway>,
}

impl TestApp {
    async fn new() -> Self {
        let mut config = LexConfig::default();
        config.jwt.secret = "an-integration-test-secret-of-32+bytes".into();

        let mailer = Arc::new(MemoryMailer::default());
        let gateway = Arc::new(MockGateway::new(CHECKSUM_KEY));
        let payments: Arc<dyn PaymentGateway> = gateway.clone();
        let parts = Parts {
            svc: Arc::new(LexService::new_local(":memory:").await.unwrap()),
            embedder: Arc::new(HashEmbedder::default()),
            llm: Arc::new(MockBackend::new("Use the present simple for habits.")),
            gateway: Some(payments),
            uploads: UploadStore::in_memory("https://cdn.test/", 1024 * 1024),
            mailer: mailer.clone(),
        };
        let state = Arc::new(AppState::assemble(config, parts));
        Self {
            router: router(Arc::clone(&state)),
            state,
            mailer,
            gateway,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Register and return `(account id, access token)`.
    async fn register(&self, email: &str, role: &str) -> (String, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": PASSWORD,
                    "full_name": "Test Person",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        (
            body["account"]["id"].as_str().unwrap().to_string(),
            body["tokens"]["access_token"].as_str().unwrap().to_string(),
        )
    }
}

impl TestApp {
    /// Ask for a reset code and read it back out of the latest mail.
    async fn request_reset_code(&self, email: &str) -> String {
        let (status, _) = self
            .call(
                Method::POST,
                "/api/auth/forgot-password",
                None,
                Some(json!({"email": email})),
            )
            .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let sent = self.mailer.sent();
        mailed_code(&sent.last().unwrap().body)
    }

    async fn verify_code(&self, email: &str, code: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/api/auth/verify-otp",
            None,
            Some(json!({"email": email, "code": code})),
        )
        .await
    }

    async fn stored_attempts(&self, email: &str) -> Option<u64> {
        let record: Option<Value> = self.state.svc.kv_get(&format!("otp:{email}")).await.unwrap();
        record.map(|record| record["attempts"].as_u64().unwrap())
    }
}

fn mailed_code(body: &str) -> String {
    body.split_whitespace()
        .map(|word| word.trim_end_matches('.'))
        .find(|word| !word.is_empty() && word.chars().all(|c| c.is_ascii_digit()))
        .unwrap()
        .to_string()
}

/// Same length as `code`, never equal to it.
fn wrong_code(code: &str) -> String {
    code.chars()
        .map(|c| {
            let digit = c.to_digit(10).unwrap();
            char::from_digit((digit + 1) % 10, 10).unwrap()
        })
        .collect()
}

fn two_question_test() -> Value {
    json!({
        "title": "Part 5 warm-up",
        "kind": "practice",
        "duration_minutes": 10,
        "questions": [
            {
                "content": "She ___ to work every day.",
                "part": 5,
                "choices": [
                    {"label": "A", "content": "goes", "is_correct": true},
                    {"label": "B", "content": "going"}
                ]
            },
            {
                "content": "They ___ finished yet.",
                "part": 5,
                "choices": [
                    {"label": "A", "content": "hasn't"},
                    {"label": "B", "content": "haven't", "is_correct": true}
                ]
            }
        ]
    })
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.call(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn errors_use_the_json_shape() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::GET, "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["statusCode"], 401);
    assert!(body["error"].is_string());
    assert!(body["message"].is_string());

    let (status, body) = app.call(Method::GET, "/api/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["statusCode"], 404);
}

#[tokio::test]
async fn register_login_refresh_rotates_tokens() {
    let app = TestApp::new().await;
    app.register("Mai@Example.com", "student").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "mai@example.com", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, login) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "mai@example.com", "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["account"]["email"], "mai@example.com");
    let refresh_token = login["tokens"]["refresh_token"].clone();

    let (status, rotated) = app
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({"refresh_token": refresh_token})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(rotated["tokens"]["access_token"].is_string());

    // A refresh token works once.
    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({"refresh_token": refresh_token})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn nobody_registers_as_admin() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "root@example.com",
                "password": PASSWORD,
                "full_name": "Root",
                "role": "admin",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn password_reset_through_mailed_code() {
    let app = TestApp::new().await;
    app.register("lan@example.com", "student").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            Some(json!({"email": "lan@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // Unknown addresses get the same answer.
    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            Some(json!({"email": "ghost@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "lan@example.com");
    let code: String = sent[0]
        .body
        .split_whitespace()
        .find(|word| word.trim_end_matches('.').chars().all(|c| c.is_ascii_digit()))
        .map(|word| word.trim_end_matches('.').to_string())
        .unwrap();

    let (status, verified) = app
        .call(
            Method::POST,
            "/api/auth/verify-otp",
            None,
            Some(json!({"email": "lan@example.com", "code": code})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let reset_token = verified["reset_token"].clone();

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/reset-password",
            None,
            Some(json!({"reset_token": reset_token, "new_password": "a-brand-new-pass"})),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "lan@example.com", "password": "a-brand-new-pass"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn stale_reset_code_is_rejected() {
    let app = TestApp::new().await;
    app.register("hoa@example.com", "student").await;
    let code = app.request_reset_code("hoa@example.com").await;

    // Push the stored code past its expiry.
    let key = "otp:hoa@example.com";
    let record: Value = app.state.svc.kv_get(key).await.unwrap().unwrap();
    app.state
        .svc
        .kv_set_until(key, &record, Some(chrono::Utc::now() - chrono::Duration::seconds(1)))
        .await
        .unwrap();

    let (status, body) = app.verify_code("hoa@example.com", &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("expired"));
}

#[tokio::test]
async fn wrong_reset_codes_are_counted() {
    let app = TestApp::new().await;
    app.register("binh@example.com", "student").await;
    let code = app.request_reset_code("binh@example.com").await;
    let max_attempts = app.state.config.otp.max_attempts;

    for attempt in 1..max_attempts {
        let (status, body) = app.verify_code("binh@example.com", &wrong_code(&code)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("wrong verification code"));
        assert_eq!(
            app.stored_attempts("binh@example.com").await,
            Some(u64::from(attempt))
        );
    }

    // Still under the limit, so the right code works.
    let (status, body) = app.verify_code("binh@example.com", &code).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["reset_token"].is_string());
    assert_eq!(app.stored_attempts("binh@example.com").await, None);
}

#[tokio::test]
async fn reset_code_is_burned_after_too_many_wrong_guesses() {
    let app = TestApp::new().await;
    app.register("cuong@example.com", "student").await;
    let code = app.request_reset_code("cuong@example.com").await;
    let max_attempts = app.state.config.otp.max_attempts;

    for _ in 1..max_attempts {
        app.verify_code("cuong@example.com", &wrong_code(&code)).await;
    }
    let (status, body) = app.verify_code("cuong@example.com", &wrong_code(&code)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("too many wrong codes"));
    assert_eq!(app.stored_attempts("cuong@example.com").await, None);

    let (status, _) = app.verify_code("cuong@example.com", &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_wrong_guesses_still_burn_the_code() {
    let app = Arc::new(TestApp::new().await);
    app.register("dung@example.com", "student").await;
    let code = app.request_reset_code("dung@example.com").await;
    let guess = wrong_code(&code);

    let mut guesses = tokio::task::JoinSet::new();
    for _ in 0..30 {
        let app = Arc::clone(&app);
        let guess = guess.clone();
        guesses.spawn(async move { app.verify_code("dung@example.com", &guess).await });
    }
    let mut locked_out = 0;
    while let Some(joined) = guesses.join_next().await {
        let (status, body) = joined.unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        if body["message"].as_str().unwrap().contains("too many wrong codes") {
            locked_out += 1;
        }
    }
    assert!(locked_out >= 1);
    assert_eq!(app.stored_attempts("dung@example.com").await, None);

    let (status, _) = app.verify_code("dung@example.com", &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_changes_apply_to_live_tokens() {
    let app = TestApp::new().await;
    let hash = lex_auth::password::hash_password(PASSWORD).unwrap();
    app.state
        .svc
        .create_account("root@example.com", &hash, "Root", Role::Admin)
        .await
        .unwrap();
    let (_, login) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "root@example.com", "password": PASSWORD})),
        )
        .await;
    let admin = login["tokens"]["access_token"].as_str().unwrap().to_string();
    let (teacher_id, teacher) = app.register("demoted@example.com", "teacher").await;
    let (student_id, student) = app.register("suspended@example.com", "student").await;

    let (status, _) = app
        .call(
            Method::PATCH,
            &format!("/api/users/{teacher_id}/role"),
            Some(&admin),
            Some(json!({"role": "student"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .call(
            Method::POST,
            "/api/tests",
            Some(&teacher),
            Some(two_question_test()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::PATCH,
            &format!("/api/users/{student_id}/active"),
            Some(&admin),
            Some(json!({"active": false})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .call(Method::GET, "/api/users/me", Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn students_cannot_author_tests() {
    let app = TestApp::new().await;
    let (_, student) = app.register("stu@example.com", "student").await;
    let (status, body) = app
        .call(Method::POST, "/api/tests", Some(&student), Some(two_question_test()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["statusCode"], 403);
}

#[rstest]
#[case::student_reads_reports("student", Method::GET, "/api/reports")]
#[case::student_admin_stats("student", Method::GET, "/api/statistics/admin")]
#[case::teacher_admin_stats("teacher", Method::GET, "/api/statistics/admin")]
#[case::student_bank_accounts("student", Method::GET, "/api/bank-accounts")]
#[case::teacher_lists_users("teacher", Method::GET, "/api/users")]
#[case::teacher_knowledge("teacher", Method::GET, "/api/knowledge")]
#[tokio::test]
async fn role_gates(#[case] role: &str, #[case] method: Method, #[case] uri: &str) {
    let app = TestApp::new().await;
    let (_, token) = app.register(&format!("{role}@example.com"), role).await;

    let (status, _) = app.call(method.clone(), uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(method, uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn start_and_submit_a_test() {
    let app = TestApp::new().await;
    let (_, teacher) = app.register("teacher@example.com", "teacher").await;
    let (_, student) = app.register("student@example.com", "student").await;

    let (status, detail) = app
        .call(Method::POST, "/api/tests", Some(&teacher), Some(two_question_test()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let test_id = detail["test"]["id"].as_str().unwrap().to_string();
    let questions = detail["questions"].as_array().unwrap();
    let correct = |q: &Value| -> String {
        q["choices"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["is_correct"] == json!(true))
            .map(|c| c["id"].as_str().unwrap().to_string())
            .unwrap()
    };
    let wrong = |q: &Value| -> String {
        q["choices"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["is_correct"] != json!(true))
            .map(|c| c["id"].as_str().unwrap().to_string())
            .unwrap()
    };

    let (status, started) = app
        .call(
            Method::POST,
            &format!("/api/tests/{test_id}/start"),
            Some(&student),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(started["expires_at"].is_string());
    let submission_id = started["submission"]["id"].as_str().unwrap().to_string();
    let tracked: Option<Value> = app
        .state
        .svc
        .kv_get(&session_key(&submission_id))
        .await
        .unwrap();
    assert!(tracked.is_some());

    // Starting again resumes the same attempt and re-tracks a lost session.
    app.state
        .svc
        .kv_delete(&session_key(&submission_id))
        .await
        .unwrap();
    let (_, resumed) = app
        .call(
            Method::POST,
            &format!("/api/tests/{test_id}/start"),
            Some(&student),
            None,
        )
        .await;
    assert_eq!(resumed["submission"]["id"], json!(submission_id));
    assert!(resumed["expires_at"].is_string());
    let retracked: Option<Value> = app
        .state
        .svc
        .kv_get(&session_key(&submission_id))
        .await
        .unwrap();
    assert!(retracked.is_some());

    let answers = json!({
        "answers": [
            {"question_id": questions[0]["id"], "choice_id": correct(&questions[0])},
            {"question_id": questions[1]["id"], "choice_id": wrong(&questions[1])},
        ]
    });
    let (status, graded) = app
        .call(
            Method::POST,
            &format!("/api/submissions/{submission_id}/submit"),
            Some(&student),
            Some(answers),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "submit failed: {graded}");
    assert_eq!(graded["submission"]["status"], "submitted");
    assert_eq!(graded["submission"]["correct_count"], 1);
    assert_eq!(graded["submission"]["score"], json!(50.0));

    let tracked: Option<Value> = app
        .state
        .svc
        .kv_get(&session_key(&submission_id))
        .await
        .unwrap();
    assert!(tracked.is_none());

    let (status, board) = app
        .call(
            Method::GET,
            &format!("/api/tests/{test_id}/leaderboard"),
            Some(&teacher),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn paid_enrollment_through_webhook_is_idempotent() {
    let app = TestApp::new().await;
    let (_, teacher) = app.register("owner@example.com", "teacher").await;
    let (student_id, student) = app.register("buyer@example.com", "student").await;

    let (status, classroom) = app
        .call(
            Method::POST,
            "/api/classrooms",
            Some(&teacher),
            Some(json!({"name": "TOEIC 750 intensive", "price": 199_000})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let classroom_id = classroom["id"].as_str().unwrap().to_string();

    // Paid classrooms cannot be joined without paying.
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/classrooms/{classroom_id}/join"),
            Some(&student),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, payment) = app
        .call(
            Method::POST,
            "/api/payments",
            Some(&student),
            Some(json!({"classroom_id": classroom_id})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "payment failed: {payment}");
    assert_eq!(payment["status"], "pending");
    let order_code = payment["order_code"].as_i64().unwrap();
    assert_eq!(
        payment["checkout_url"],
        json!(format!("https://checkout.invalid/{order_code}"))
    );
    assert_eq!(app.gateway.created().len(), 1);

    let data = json!({
        "orderCode": order_code,
        "amount": 199_000,
        "description": "Join TOEIC 750",
        "reference": "FT123",
        "code": "00",
    });
    let signature = sign_data(CHECKSUM_KEY, data.as_object().unwrap()).unwrap();
    let webhook = json!({
        "code": "00",
        "desc": "success",
        "success": true,
        "data": data,
        "signature": signature,
    });

    let (status, ack) = app
        .call(Method::POST, "/api/payments/webhook", None, Some(webhook.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"success": true, "changed": true}));

    let (status, ack) = app
        .call(Method::POST, "/api/payments/webhook", None, Some(webhook))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"success": true, "changed": false}));

    let (_, mine) = app
        .call(Method::GET, "/api/me/classrooms", Some(&student), None)
        .await;
    assert_eq!(mine["items"][0]["id"], json!(classroom_id));

    let (_, ledger) = app
        .call(Method::GET, "/api/transactions", Some(&student), None)
        .await;
    assert_eq!(ledger["total"], 1);
    assert_eq!(ledger["items"][0]["account_id"], json!(student_id));
}

#[tokio::test]
async fn tampered_webhook_is_rejected() {
    let app = TestApp::new().await;
    let data = json!({"orderCode": 42, "amount": 1000});
    let (status, body) = app
        .call(
            Method::POST,
            "/api/payments/webhook",
            None,
            Some(json!({
                "code": "00",
                "desc": "success",
                "data": data,
                "signature": "00".repeat(32),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn envelope_code_cannot_override_signed_outcome() {
    let app = TestApp::new().await;
    let (_, teacher) = app.register("seller@example.com", "teacher").await;
    let (_, student) = app.register("hopeful@example.com", "student").await;

    let (_, classroom) = app
        .call(
            Method::POST,
            "/api/classrooms",
            Some(&teacher),
            Some(json!({"name": "TOEIC 900", "price": 500_000})),
        )
        .await;
    let (status, payment) = app
        .call(
            Method::POST,
            "/api/payments",
            Some(&student),
            Some(json!({"classroom_id": classroom["id"]})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let payment_id = payment["id"].as_str().unwrap().to_string();

    // Properly signed, but the gateway reported a failed payment.
    let data = json!({
        "orderCode": payment["order_code"],
        "amount": 500_000,
        "description": "Join TOEIC 900",
        "code": "01",
    });
    let signature = sign_data(CHECKSUM_KEY, data.as_object().unwrap()).unwrap();
    let (status, _) = app
        .call(
            Method::POST,
            "/api/payments/webhook",
            None,
            Some(json!({
                "code": "00",
                "desc": "success",
                "success": true,
                "data": data,
                "signature": signature,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, stored) = app
        .call(
            Method::GET,
            &format!("/api/payments/{payment_id}"),
            Some(&student),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["status"], "pending");
}

#[tokio::test]
async fn chat_reply_is_stored_in_the_session() {
    let app = TestApp::new().await;
    let (_, student) = app.register("chatty@example.com", "student").await;
    let (_, other) = app.register("nosy@example.com", "student").await;

    let (status, session) = app
        .call(
            Method::POST,
            "/api/chat/sessions",
            Some(&student),
            Some(json!({"title": "Grammar"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let session_id = session["id"].as_str().unwrap().to_string();

    let (status, reply) = app
        .call(
            Method::POST,
            &format!("/api/chat/sessions/{session_id}/messages"),
            Some(&student),
            Some(json!({"content": "When do I use the present simple?"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        reply["assistant_message"]["content"],
        "Use the present simple for habits."
    );

    let (status, detail) = app
        .call(
            Method::GET,
            &format!("/api/chat/sessions/{session_id}"),
            Some(&student),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["messages"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/chat/sessions/{session_id}"),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
