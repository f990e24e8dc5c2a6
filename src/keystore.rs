//! API-key storage.
//!
//! The pipeline depends on the [`KeyStore`] trait, not on a concrete store,
//! so the SQLite implementation here can be swapped for another relational
//! backend without touching authentication or pipeline logic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{Error, Result};

/// A stored API key record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    /// Stable identifier of the key holder.
    pub hotkey: String,
    /// The credential value presented by callers.
    pub key_value: String,
    /// Whether the key grants access to the admin surface.
    pub is_admin: bool,
    /// When the key was created.
    pub created_at: DateTime<Utc>,
    /// When the key last authenticated a request, if ever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// Create a non-admin key record timestamped now.
    #[must_use]
    pub fn new(hotkey: String, key_value: String) -> Self {
        Self {
            hotkey,
            key_value,
            is_admin: false,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }
}

/// Capability interface over the external key store.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Find the record matching a presented credential value.
    async fn lookup_by_key(&self, key_value: &str) -> Result<Option<ApiKey>>;

    /// Find the record for a hotkey.
    async fn lookup_by_hotkey(&self, hotkey: &str) -> Result<Option<ApiKey>>;

    /// Insert a new record. Fails if the hotkey already exists.
    async fn insert(&self, record: &ApiKey) -> Result<()>;

    /// Insert the record, or replace the key value if the hotkey exists.
    async fn upsert(&self, record: &ApiKey) -> Result<()>;

    /// Delete the record for a hotkey, reporting whether one existed.
    async fn remove(&self, hotkey: &str) -> Result<bool>;

    /// Record that the key for `hotkey` just authenticated a request.
    async fn touch_last_used(&self, hotkey: &str) -> Result<()>;
}

/// SQLite-backed [`KeyStore`].
pub struct SqliteKeyStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS api_keys (
    hotkey       TEXT PRIMARY KEY,
    key_value    TEXT NOT NULL UNIQUE,
    is_admin     INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL,
    last_used_at TEXT
)";

impl SqliteKeyStore {
    /// Open (or create) the key database at `path` and ensure the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(sql_err)?;
        conn.execute(SCHEMA, []).map_err(sql_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store. Intended for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        conn.execute(SCHEMA, []).map_err(sql_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Ensure the configured admin credential exists.
    ///
    /// Inserts the record if the hotkey is absent, otherwise replaces its
    /// key value. Called once at startup before serving requests.
    ///
    /// # Errors
    ///
    /// Returns an error on a key store failure.
    pub async fn ensure_admin_key(&self, hotkey: &str, key_value: &str) -> Result<()> {
        let record = ApiKey {
            hotkey: hotkey.to_string(),
            key_value: key_value.to_string(),
            is_admin: true,
            created_at: Utc::now(),
            last_used_at: None,
        };
        self.upsert(&record).await?;
        info!(hotkey, "admin API key ensured");
        Ok(())
    }
}

fn sql_err(e: rusqlite::Error) -> Error {
    Error::KeyStore(e.to_string())
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::KeyStore(format!("invalid timestamp in key store: {e}")))
}

fn row_to_key(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, bool, String, Option<String>)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get::<_, i64>(2)? != 0,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn into_api_key(raw: (String, String, bool, String, Option<String>)) -> Result<ApiKey> {
    let (hotkey, key_value, is_admin, created_at, last_used_at) = raw;
    Ok(ApiKey {
        hotkey,
        key_value,
        is_admin,
        created_at: parse_timestamp(&created_at)?,
        last_used_at: last_used_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

const SELECT_COLUMNS: &str =
    "SELECT hotkey, key_value, is_admin, created_at, last_used_at FROM api_keys";

#[async_trait]
impl KeyStore for SqliteKeyStore {
    async fn lookup_by_key(&self, key_value: &str) -> Result<Option<ApiKey>> {
        let conn = self.conn.lock().await;
        let raw = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE key_value = ?1"),
                [key_value],
                row_to_key,
            )
            .optional()
            .map_err(sql_err)?;
        raw.map(into_api_key).transpose()
    }

    async fn lookup_by_hotkey(&self, hotkey: &str) -> Result<Option<ApiKey>> {
        let conn = self.conn.lock().await;
        let raw = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE hotkey = ?1"),
                [hotkey],
                row_to_key,
            )
            .optional()
            .map_err(sql_err)?;
        raw.map(into_api_key).transpose()
    }

    async fn insert(&self, record: &ApiKey) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO api_keys (hotkey, key_value, is_admin, created_at, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                record.hotkey,
                record.key_value,
                i64::from(record.is_admin),
                record.created_at.to_rfc3339(),
                record.last_used_at.map(|t| t.to_rfc3339()),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::Conflict(format!("key record already exists for {}", record.hotkey))
            }
            other => sql_err(other),
        })?;
        Ok(())
    }

    async fn upsert(&self, record: &ApiKey) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO api_keys (hotkey, key_value, is_admin, created_at, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(hotkey) DO UPDATE SET key_value = excluded.key_value,
                                               is_admin = excluded.is_admin",
            rusqlite::params![
                record.hotkey,
                record.key_value,
                i64::from(record.is_admin),
                record.created_at.to_rfc3339(),
                record.last_used_at.map(|t| t.to_rfc3339()),
            ],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    async fn remove(&self, hotkey: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let affected = conn
            .execute("DELETE FROM api_keys WHERE hotkey = ?1", [hotkey])
            .map_err(sql_err)?;
        Ok(affected > 0)
    }

    async fn touch_last_used(&self, hotkey: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE api_keys SET last_used_at = ?1 WHERE hotkey = ?2",
            rusqlite::params![Utc::now().to_rfc3339(), hotkey],
        )
        .map_err(sql_err)?;
        Ok(())
    }
}
