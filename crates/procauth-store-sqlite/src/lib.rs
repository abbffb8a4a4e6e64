//! SQLite backend for the procauth storage ports.
//!
//! One `SqliteStore` implements every port (catalog, roles, grants, snapshots and the three
//! directories), so a single handle can be passed to `procauth_core::Ports::from_store`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use procauth_storage::StoreError;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use uuid::Uuid;

mod catalog;
mod directory;
mod grants;
mod roles;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// `~/.procauth/store.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".procauth");
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let path = dir.join("store.db");
        let url = format!("sqlite://{}", path.to_string_lossy());
        Self::open(&url).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(backend)?
            .create_if_missing(true)
            .foreign_keys(true);

        // A single connection keeps `sqlite::memory:` a single database and serializes writers.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(backend)?;

        MIGRATOR.run(&pool).await.map_err(|e| StoreError::Backend(e.to_string()))?;

        tracing::debug!(url, "sqlite store opened");
        Ok(Self { pool })
    }
}

// ───────────────────────────── Row helpers ─────────────────────────────

pub(crate) fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Map constraint violations to their storage meaning, everything else to `Backend`.
pub(crate) fn map_write_err(e: sqlx::Error) -> StoreError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return StoreError::AlreadyExists;
        }
        if db.is_foreign_key_violation() {
            return StoreError::NotFound;
        }
    }
    backend(e)
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(|e| StoreError::Backend(e.to_string()))
}

/// '' is the storage sentinel for an absent id.
pub(crate) fn parse_optional_uuid(s: &str) -> Result<Option<Uuid>, StoreError> {
    if s.is_empty() {
        Ok(None)
    } else {
        parse_uuid(s).map(Some)
    }
}

pub(crate) fn from_timestamp(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::Backend(format!("timestamp out of range: {}", secs)))
}

pub(crate) fn from_optional_timestamp(
    secs: Option<i64>,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    secs.map(from_timestamp).transpose()
}

/// Current time truncated to the stored precision (whole seconds).
pub(crate) fn now_secs() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_parses_to_none() {
        assert_eq!(parse_optional_uuid("").unwrap(), None);
        let id = Uuid::new_v4();
        assert_eq!(parse_optional_uuid(&id.to_string()).unwrap(), Some(id));
        assert!(parse_optional_uuid("garbage").is_err());
    }

    #[test]
    fn timestamps_roundtrip_at_second_precision() {
        let now = now_secs();
        assert_eq!(from_timestamp(now).unwrap().timestamp(), now);
        assert_eq!(from_optional_timestamp(None).unwrap(), None);
        assert!(from_timestamp(i64::MAX).is_err());
    }

    #[tokio::test]
    async fn migrations_apply_on_fresh_database() {
        let s = SqliteStore::open_in_memory().await.unwrap();
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
        )
        .fetch_all(&s.pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        for expected in [
            "grants",
            "permissions",
            "processes",
            "role_permissions",
            "roles",
            "stages",
            "users",
        ] {
            assert!(names.contains(&expected), "missing table {}", expected);
        }
    }
}
