//! Cached response entries and their SQLite CRUD operations.

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Duration;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::key::CacheKey;
use crate::Error;

/// Content type of every cached preview page.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// A rendered response held by the edge cache.
///
/// Entries are immutable: a newer render replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub body: Bytes,
    pub content_type: String,
    pub cache_control: String,
    pub stored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Build an HTML entry valid for `ttl` from now.
    ///
    /// The `Cache-Control` header carries the same TTL, e.g. `public, max-age=300`.
    pub fn html(body: impl Into<Bytes>, ttl: Duration) -> Self {
        let stored_at = Utc::now();
        let expires_at = stored_at + chrono::Duration::seconds(ttl.as_secs() as i64);
        Self {
            body: body.into(),
            content_type: HTML_CONTENT_TYPE.to_string(),
            cache_control: format!("public, max-age={}", ttl.as_secs()),
            stored_at,
            expires_at,
        }
    }

    /// Whether the entry has outlived its TTL at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the entry has outlived its TTL.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

fn to_db_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn from_db_time(s: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::CorruptEntry(format!("bad timestamp {s}: {e}")))
}

impl CacheDb {
    /// Insert or replace the entry stored under `key`.
    ///
    /// Last writer wins.
    pub async fn upsert_entry(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), Error> {
        let key_hash = key.digest().to_string();
        let request_url = key.canonical().to_string();
        let body = entry.body.to_vec();
        let content_type = entry.content_type.clone();
        let cache_control = entry.cache_control.clone();
        let stored_at = to_db_time(&entry.stored_at);
        let expires_at = to_db_time(&entry.expires_at);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO responses (
                    key_hash, request_url, body, content_type, cache_control, stored_at, expires_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(key_hash) DO UPDATE SET
                    request_url = excluded.request_url,
                    body = excluded.body,
                    content_type = excluded.content_type,
                    cache_control = excluded.cache_control,
                    stored_at = excluded.stored_at,
                    expires_at = excluded.expires_at",
                    params![key_hash, request_url, body, content_type, cache_control, stored_at, expires_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the entry for `key` if one exists and has not expired.
    pub async fn get_entry(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        let key_hash = key.digest().to_string();
        let now = to_db_time(&Utc::now());

        let row = self
            .conn
            .call(move |conn| -> Result<Option<(Vec<u8>, String, String, String, String)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT body, content_type, cache_control, stored_at, expires_at
                FROM responses WHERE key_hash = ?1 AND expires_at > ?2",
                )?;

                let result = stmt.query_row(params![key_hash, now], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                });

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((body, content_type, cache_control, stored_at, expires_at)) = row else {
            return Ok(None);
        };

        Ok(Some(CacheEntry {
            body: Bytes::from(body),
            content_type,
            cache_control,
            stored_at: from_db_time(&stored_at)?,
            expires_at: from_db_time(&expires_at)?,
        }))
    }

    /// Delete expired entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired_entries(&self) -> Result<u64, Error> {
        let now = to_db_time(&Utc::now());
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM responses WHERE expires_at <= ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge oldest entries until count <= max_entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_lru_entries(&self, max_entries: usize) -> Result<u64, Error> {
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM responses WHERE key_hash IN (
                    SELECT key_hash FROM responses ORDER BY stored_at ASC LIMIT ?1
                )",
                    params![to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of stored entries, fresh or not.
    pub async fn entry_count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(url: &str) -> CacheKey {
        CacheKey::from_request("http", "localhost", &format!("/preview?url={url}")).unwrap()
    }

    fn expired(body: &str) -> CacheEntry {
        let mut entry = CacheEntry::html(body.to_string(), Duration::from_secs(300));
        entry.stored_at -= chrono::Duration::seconds(600);
        entry.expires_at -= chrono::Duration::seconds(600);
        entry
    }

    #[test]
    fn test_entry_headers() {
        let entry = CacheEntry::html("<p>x</p>", Duration::from_secs(300));
        assert_eq!(entry.content_type, "text/html; charset=utf-8");
        assert_eq!(entry.cache_control, "public, max-age=300");
        assert!(!entry.is_expired());
        assert!(expired("x").is_expired());
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let k = key("https://example.com");
        let entry = CacheEntry::html("<h1>Hi</h1>", Duration::from_secs(300));

        db.upsert_entry(&k, &entry).await.unwrap();

        let got = db.get_entry(&k).await.unwrap().unwrap();
        assert_eq!(got.body, entry.body);
        assert_eq!(got.cache_control, "public, max-age=300");
        assert_eq!(got.content_type, HTML_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let k = key("https://example.com");

        db.upsert_entry(&k, &CacheEntry::html("old", Duration::from_secs(300)))
            .await
            .unwrap();
        db.upsert_entry(&k, &CacheEntry::html("new", Duration::from_secs(300)))
            .await
            .unwrap();

        let got = db.get_entry(&k).await.unwrap().unwrap();
        assert_eq!(got.body, Bytes::from_static(b"new"));
        assert_eq!(db.entry_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = db.get_entry(&key("https://nothing.example")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_not_served() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let k = key("https://example.com");
        db.upsert_entry(&k, &expired("stale")).await.unwrap();

        assert!(db.get_entry(&k).await.unwrap().is_none());
        assert_eq!(db.purge_expired_entries().await.unwrap(), 1);
        assert_eq!(db.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_lru() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut older = CacheEntry::html("a", Duration::from_secs(300));
        older.stored_at -= chrono::Duration::seconds(10);
        db.upsert_entry(&key("https://a.example"), &older).await.unwrap();
        db.upsert_entry(&key("https://b.example"), &CacheEntry::html("b", Duration::from_secs(300)))
            .await
            .unwrap();

        let deleted = db.purge_lru_entries(1).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_entry(&key("https://a.example")).await.unwrap().is_none());
        assert!(db.get_entry(&key("https://b.example")).await.unwrap().is_some());

        assert_eq!(db.purge_lru_entries(5).await.unwrap(), 0);
    }
}
