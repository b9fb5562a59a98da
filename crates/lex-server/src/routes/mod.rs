//! HTTP routes under `/api`.

mod assessments;
mod auth;
mod bank_accounts;
mod chat;
mod classrooms;
mod flashcards;
mod lessons;
mod payments;
mod reports;
mod statistics;
mod submissions;
mod uploads;
mod users;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::SharedState;

/// Room for multipart framing and text fields on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the full application router.
pub fn router(state: SharedState) -> Router {
    let body_limit = state.uploads.max_bytes() + MULTIPART_OVERHEAD;
    let api = Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(users::routes())
        .merge(classrooms::routes())
        .merge(lessons::routes())
        .merge(assessments::routes())
        .merge(submissions::routes())
        .merge(flashcards::routes())
        .merge(payments::routes())
        .merge(bank_accounts::routes())
        .merge(reports::routes())
        .merge(statistics::routes())
        .merge(chat::routes())
        .merge(uploads::routes());

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors_layer(&state.config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("no such route".into())
}
