//! # lex-db
//!
//! libSQL database operations for Lexora.
//!
//! Holds all relational state: accounts, classrooms, lessons, tests and
//! submissions, flashcards, payments, reports, chat history, knowledge
//! chunks, and a small key-value store with expiry for transient state.
//!
//! Repository methods are added to [`service::LexService`] by the modules
//! under [`repos`].

pub mod error;
pub mod helpers;
pub mod inputs;
mod migrations;
pub mod paging;
pub mod repos;
pub mod service;
pub mod test_support;
pub mod updates;

use error::DatabaseError;
use lex_config::DatabaseConfig;
use libsql::Builder;

/// Central database handle.
///
/// Wraps a libSQL database and its single connection. Provides ID and
/// order-code generation.
pub struct LexDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl LexDb {
    /// Open a local database at `path` (`:memory:` for tests).
    ///
    /// Runs migrations on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        Self::init(db).await
    }

    /// Open a remote libSQL database.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the connection or migrations fail.
    pub async fn open_remote(url: &str, auth_token: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await?;
        Self::init(db).await
    }

    /// Open whichever database `config` describes.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        if config.is_remote() {
            tracing::info!(url = %config.url, "opening remote database");
            Self::open_remote(&config.url, &config.auth_token).await
        } else {
            tracing::info!(path = %config.path, "opening local database");
            Self::open_local(&config.path).await
        }
    }

    async fn init(db: libsql::Database) -> Result<Self, DatabaseError> {
        let conn = db.connect()?;

        // Must be set per connection in SQLite.
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let lex_db = Self { db, conn };
        lex_db.run_migrations().await?;
        Ok(lex_db)
    }

    /// Access the underlying libSQL connection.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Generate a prefixed ID via libSQL, e.g. `"cls-a3f8b2c19d04e67f"`.
    ///
    /// 64 random bits: answer and choice rows grow by hundreds per test.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT '{prefix}-' || lower(hex(randomblob(8)))"),
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }

    /// Generate a positive order code that fits a JavaScript safe integer.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_order_code(&self) -> Result<i64, DatabaseError> {
        let mut rows = self
            .conn
            .query("SELECT abs(random() % 9007199254740991) + 1", ())
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<i64>(0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    async fn test_db() -> LexDb {
        LexDb::open_local(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn open_local_creates_schema() {
        let db = test_db().await;
        let tables = [
            "accounts",
            "classrooms",
            "classroom_students",
            "classroom_ratings",
            "classroom_tests",
            "lessons",
            "tests",
            "questions",
            "choices",
            "submissions",
            "answers",
            "flashcard_sets",
            "flashcards",
            "payments",
            "transactions",
            "bank_accounts",
            "reports",
            "chat_sessions",
            "messages",
            "knowledge_chunks",
            "kv_store",
        ];
        for table in &tables {
            let mut rows = db
                .conn()
                .query(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                    [*table],
                )
                .await
                .unwrap();
            assert!(rows.next().await.unwrap().is_some(), "table '{table}' should exist");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = test_db().await;
        db.run_migrations().await.unwrap();
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexora.db");
        let path = path.to_str().unwrap();

        let svc = crate::service::LexService::new_local(path).await.unwrap();
        svc.kv_set("greeting", &"xin chao", None).await.unwrap();
        drop(svc);

        let svc = crate::service::LexService::new_local(path).await.unwrap();
        let value: Option<String> = svc.kv_get("greeting").await.unwrap();
        assert_eq!(value.as_deref(), Some("xin chao"));
    }

    #[tokio::test]
    async fn foreign_keys_are_enabled() {
        let db = test_db().await;
        let mut rows = db.conn().query("PRAGMA foreign_keys", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 1);
    }

    #[tokio::test]
    async fn generate_id_has_prefix_and_is_unique() {
        let db = test_db().await;
        let mut ids = HashSet::new();
        for _ in 0..100 {
            let id = db.generate_id("cls").await.unwrap();
            assert!(id.starts_with("cls-"));
            assert_eq!(id.len(), "cls-".len() + 16);
            assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
            ids.insert(id);
        }
        assert_eq!(ids.len(), 100);
    }

    #[tokio::test]
    async fn order_codes_are_positive_safe_integers() {
        let db = test_db().await;
        for _ in 0..50 {
            let code = db.generate_order_code().await.unwrap();
            assert!(code > 0);
            assert!(code <= 9_007_199_254_740_991);
        }
    }
}
