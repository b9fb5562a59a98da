//! Service layer wrapping the database with a write lock.
//!
//! `LexService` owns a `LexDb`. All repo methods are implemented as
//! `impl LexService` blocks under `repos/`.

use tokio::sync::{Mutex, MutexGuard};

use crate::LexDb;
use crate::error::DatabaseError;

/// Repository entry point shared by the HTTP layer and background tasks.
///
/// Every mutation holds the write lock for its duration. Multi-statement
/// mutations additionally run inside a transaction opened through
/// [`LexService::begin_write`]. Statements issued on the shared connection
/// while a transaction is open belong to that transaction, so the lock is
/// what keeps concurrent writers out of each other's transactions.
pub struct LexService {
    db: LexDb,
    write_lock: Mutex<()>,
}

/// An open write transaction plus the write lock guarding it.
pub struct WriteTx<'a> {
    tx: libsql::Transaction,
    _guard: MutexGuard<'a, ()>,
}

impl WriteTx<'_> {
    /// Commit on `Ok`, roll back on `Err`, and hand back `result`.
    ///
    /// # Errors
    ///
    /// Returns the original error, or the commit error if committing fails.
    pub async fn finish<T>(self, result: Result<T, DatabaseError>) -> Result<T, DatabaseError> {
        match result {
            Ok(value) => {
                self.tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.tx.rollback().await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

impl LexService {
    /// Create a service over a local database file, or `":memory:"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(db_path: &str) -> Result<Self, DatabaseError> {
        Ok(Self::from_db(LexDb::open_local(db_path).await?))
    }

    #[must_use]
    pub fn from_db(db: LexDb) -> Self {
        Self {
            db,
            write_lock: Mutex::new(()),
        }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &LexDb {
        &self.db
    }

    pub(crate) fn conn(&self) -> &libsql::Connection {
        self.db.conn()
    }

    /// Acquire the write lock for a single-statement mutation.
    pub(crate) async fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Acquire the write lock and open a transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if `BEGIN` fails.
    pub(crate) async fn begin_write(&self) -> Result<WriteTx<'_>, DatabaseError> {
        let guard = self.write_lock.lock().await;
        let tx = self.db.conn().transaction().await?;
        Ok(WriteTx { tx, _guard: guard })
    }

    /// Run a `SELECT COUNT(*)`-style query and return the first column.
    pub(crate) async fn query_count(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<i64, DatabaseError> {
        let mut rows = self.conn().query(sql, params).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<i64>(0)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::helpers::test_service;

    use super::*;

    #[tokio::test]
    async fn failed_transaction_rolls_back() {
        let svc = test_service().await;
        let tx = svc.begin_write().await.unwrap();
        let result: Result<(), DatabaseError> = async {
            svc.conn()
                .execute(
                    "INSERT INTO kv_store (key, value) VALUES ('rollback-me', '1')",
                    (),
                )
                .await?;
            Err(DatabaseError::validation("boom"))
        }
        .await;
        assert!(tx.finish(result).await.is_err());

        let count = svc
            .query_count("SELECT COUNT(*) FROM kv_store WHERE key = 'rollback-me'", ())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn committed_transaction_persists() {
        let svc = test_service().await;
        let tx = svc.begin_write().await.unwrap();
        let result: Result<(), DatabaseError> = async {
            svc.conn()
                .execute("INSERT INTO kv_store (key, value) VALUES ('keep', '1')", ())
                .await?;
            Ok(())
        }
        .await;
        tx.finish(result).await.unwrap();

        let count = svc
            .query_count("SELECT COUNT(*) FROM kv_store WHERE key = 'keep'", ())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
