//! # lex-server
//!
//! The Lexora HTTP API (axum) and the `lexora` admin CLI.
//!
//! Routes live under `/api`. Handlers extract and validate the request,
//! check the caller's role, and call into `LexService`. Every error becomes a
//! JSON body `{statusCode, error, message}`.

pub mod cli;
pub mod commands;
pub mod error;
pub mod extract;
pub mod mailer;
pub mod routes;
pub mod state;
pub mod sweeper;

pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::{AppState, SharedState};
