//! Key-value store with optional expiry.
//!
//! Holds transient state: hashed OTPs, refresh token IDs, password-reset
//! tokens, and live test sessions. Values are JSON text, expiry is unix
//! milliseconds. Expired rows read as absent and are purged lazily.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::DatabaseError;
use crate::service::LexService;

/// An expired entry returned by [`LexService::kv_expired_with_prefix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub expires_at: Option<DateTime<Utc>>,
}

fn encode<T: Serialize>(value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Other(e.into()))
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, DatabaseError> {
    serde_json::from_str(raw)
        .map_err(|e| DatabaseError::InvalidState(format!("kv value for '{key}' is not valid: {e}")))
}

fn expiry_after(ttl: Option<Duration>) -> Option<DateTime<Utc>> {
    ttl.map(|ttl| Utc::now() + ttl)
}

impl LexService {
    /// Store `value` under `key`, replacing any previous value.
    pub async fn kv_set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), DatabaseError> {
        self.kv_set_until(key, value, expiry_after(ttl)).await
    }

    /// Store `value` under `key` with an absolute expiry.
    pub async fn kv_set_until<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), DatabaseError> {
        let raw = encode(value)?;
        let expires_at = expires_at.map(|t| t.timestamp_millis());
        let _guard = self.write_lock().await;
        self.conn()
            .execute(
                "INSERT INTO kv_store (key, value, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
                libsql::params![key, raw, expires_at],
            )
            .await?;
        Ok(())
    }

    /// Store `value` only if `key` is absent or expired. Returns whether it was stored.
    ///
    /// A single upsert statement, so two callers racing on the same key
    /// cannot both win.
    pub async fn kv_set_if_absent<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<bool, DatabaseError> {
        let raw = encode(value)?;
        let expires_at = expiry_after(ttl).map(|t| t.timestamp_millis());
        let now = Utc::now().timestamp_millis();
        let _guard = self.write_lock().await;
        let changed = self
            .conn()
            .execute(
                "INSERT INTO kv_store (key, value, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
                 WHERE kv_store.expires_at IS NOT NULL AND kv_store.expires_at <= ?4",
                libsql::params![key, raw, expires_at, now],
            )
            .await?;
        Ok(changed > 0)
    }

    /// Read a live value. Expired entries read as `None`.
    pub async fn kv_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DatabaseError> {
        let now = Utc::now().timestamp_millis();
        let mut rows = self
            .conn()
            .query(
                "SELECT value FROM kv_store
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                libsql::params![key, now],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(decode(key, &row.get::<String>(0)?)?)),
            None => Ok(None),
        }
    }

    /// Add one to the integer `field` of a live JSON object entry and return the new count.
    ///
    /// One statement under the write lock, so concurrent callers never lose
    /// an increment. `None` when the entry is missing or expired.
    pub async fn kv_increment_field(
        &self,
        key: &str,
        field: &str,
    ) -> Result<Option<u32>, DatabaseError> {
        let path = format!("$.{field}");
        let now = Utc::now().timestamp_millis();
        let _guard = self.write_lock().await;
        let mut rows = self
            .conn()
            .query(
                "UPDATE kv_store
                 SET value = json_set(value, ?2, coalesce(json_extract(value, ?2), 0) + 1)
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?3)
                 RETURNING json_extract(value, ?2)",
                libsql::params![key, path, now],
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let count: i64 = row.get(0)?;
        u32::try_from(count)
            .map(Some)
            .map_err(|_| DatabaseError::InvalidState(format!("kv counter '{field}' out of range")))
    }

    /// Remove `key` and return its value if it was still live.
    ///
    /// Used for single-use tokens: of two concurrent takers only one sees the value.
    pub async fn kv_take<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DatabaseError> {
        let now = Utc::now().timestamp_millis();
        let _guard = self.write_lock().await;
        let mut rows = self
            .conn()
            .query(
                "DELETE FROM kv_store WHERE key = ?1 RETURNING value, expires_at",
                [key],
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let raw: String = row.get(0)?;
        let expires_at: Option<i64> = row.get(1)?;
        if expires_at.is_some_and(|t| t <= now) {
            return Ok(None);
        }
        Ok(Some(decode(key, &raw)?))
    }

    /// Delete `key`. Returns whether a row was removed.
    pub async fn kv_delete(&self, key: &str) -> Result<bool, DatabaseError> {
        let _guard = self.write_lock().await;
        let changed = self
            .conn()
            .execute("DELETE FROM kv_store WHERE key = ?1", [key])
            .await?;
        Ok(changed > 0)
    }

    /// Entries under `prefix` whose expiry is at or before `now`.
    pub async fn kv_expired_with_prefix(
        &self,
        prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<KvEntry>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT key, value, expires_at FROM kv_store
                 WHERE substr(key, 1, length(?1)) = ?1
                   AND expires_at IS NOT NULL AND expires_at <= ?2
                 ORDER BY expires_at",
                libsql::params![prefix, now.timestamp_millis()],
            )
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            let key: String = row.get(0)?;
            let value = decode(&key, &row.get::<String>(1)?)?;
            let expires_at = row
                .get::<Option<i64>>(2)?
                .and_then(DateTime::<Utc>::from_timestamp_millis);
            entries.push(KvEntry {
                key,
                value,
                expires_at,
            });
        }
        Ok(entries)
    }

    /// Delete every entry expired at `now`, except keys under `keep_prefix`.
    ///
    /// Test-session entries are left for the sweeper, which needs to see them.
    pub async fn kv_purge_expired(
        &self,
        now: DateTime<Utc>,
        keep_prefix: &str,
    ) -> Result<u64, DatabaseError> {
        let _guard = self.write_lock().await;
        let purged = self
            .conn()
            .execute(
                "DELETE FROM kv_store
                 WHERE expires_at IS NOT NULL AND expires_at <= ?1
                   AND substr(key, 1, length(?2)) != ?2",
                libsql::params![now.timestamp_millis(), keep_prefix],
            )
            .await?;
        if purged > 0 {
            tracing::debug!(purged, "expired kv entries purged");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    use crate::test_support::helpers::test_service;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Otp {
        digest: String,
        attempts: u32,
    }

    fn past() -> Option<DateTime<Utc>> {
        Some(Utc::now() - Duration::seconds(5))
    }

    #[tokio::test]
    async fn set_get_roundtrip() {
        let svc = test_service().await;
        let otp = Otp {
            digest: "abc".into(),
            attempts: 0,
        };
        svc.kv_set("otp:a@b.c", &otp, Some(Duration::minutes(5)))
            .await
            .unwrap();
        let got: Option<Otp> = svc.kv_get("otp:a@b.c").await.unwrap();
        assert_eq!(got, Some(otp));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let svc = test_service().await;
        svc.kv_set_until("k", &1, past()).await.unwrap();
        assert_eq!(svc.kv_get::<i32>("k").await.unwrap(), None);
        assert_eq!(svc.kv_take::<i32>("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_if_absent_only_once_until_expiry() {
        let svc = test_service().await;
        assert!(svc.kv_set_if_absent("once", &"a", None).await.unwrap());
        assert!(!svc.kv_set_if_absent("once", &"b", None).await.unwrap());
        assert_eq!(svc.kv_get::<String>("once").await.unwrap().as_deref(), Some("a"));

        svc.kv_set_until("stale", &"old", past()).await.unwrap();
        assert!(svc.kv_set_if_absent("stale", &"new", None).await.unwrap());
        assert_eq!(
            svc.kv_get::<String>("stale").await.unwrap().as_deref(),
            Some("new")
        );
    }

    #[tokio::test]
    async fn take_is_single_use() {
        let svc = test_service().await;
        svc.kv_set("pwd-reset:tok", &"acc-1", None).await.unwrap();
        assert_eq!(
            svc.kv_take::<String>("pwd-reset:tok").await.unwrap().as_deref(),
            Some("acc-1")
        );
        assert_eq!(svc.kv_take::<String>("pwd-reset:tok").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_all_counted() {
        let svc = std::sync::Arc::new(test_service().await);
        let otp = Otp {
            digest: "abc".into(),
            attempts: 0,
        };
        svc.kv_set("otp:x", &otp, Some(Duration::minutes(5)))
            .await
            .unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..50 {
            let svc = std::sync::Arc::clone(&svc);
            tasks.spawn(async move { svc.kv_increment_field("otp:x", "attempts").await.unwrap() });
        }
        let mut seen = Vec::new();
        while let Some(count) = tasks.join_next().await {
            seen.push(count.unwrap().unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, (1..=50).collect::<Vec<u32>>());

        let stored: Otp = svc.kv_get("otp:x").await.unwrap().unwrap();
        assert_eq!(stored.attempts, 50);
        assert_eq!(stored.digest, "abc");
    }

    #[tokio::test]
    async fn increment_skips_missing_and_expired() {
        let svc = test_service().await;
        assert_eq!(svc.kv_increment_field("missing", "attempts").await.unwrap(), None);
        svc.kv_set_until("stale", &serde_json::json!({"attempts": 1}), past())
            .await
            .unwrap();
        assert_eq!(svc.kv_increment_field("stale", "attempts").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_with_prefix_filters_by_prefix_and_time() {
        let svc = test_service().await;
        svc.kv_set_until("test-session:sub-1", &"tst-1", past())
            .await
            .unwrap();
        svc.kv_set("test-session:sub-2", &"tst-2", Some(Duration::hours(1)))
            .await
            .unwrap();
        svc.kv_set_until("otp:x", &"y", past()).await.unwrap();

        let expired = svc
            .kv_expired_with_prefix("test-session:", Utc::now())
            .await
            .unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].key, "test-session:sub-1");
        assert_eq!(expired[0].value, serde_json::json!("tst-1"));
    }

    #[tokio::test]
    async fn purge_keeps_protected_prefix() {
        let svc = test_service().await;
        svc.kv_set_until("test-session:sub-1", &1, past()).await.unwrap();
        svc.kv_set_until("otp:x", &1, past()).await.unwrap();
        svc.kv_set("live", &1, None).await.unwrap();

        let purged = svc
            .kv_purge_expired(Utc::now(), "test-session:")
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert_eq!(
            svc.kv_expired_with_prefix("test-session:", Utc::now())
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(svc.kv_delete("live").await.unwrap());
    }
}
