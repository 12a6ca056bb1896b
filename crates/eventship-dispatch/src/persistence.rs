//! SQLite-backed durable store.
//! One row per event log, rewritten in place on every mutation.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use eventship_core::error::{Result, ShipError};
use eventship_core::traits::DurableStore;
use rusqlite::{Connection, OptionalExtension, params};

/// SQLite persistence for event logs.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the state database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| ShipError::Store(format!("DB open: {e}")))?;
        Self::with_connection(conn)
    }

    /// In-memory database; nothing survives the process.
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| ShipError::Store(format!("DB open: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        // FULL: a save must be on disk before it returns
        conn.execute_batch(
            "
            PRAGMA synchronous = FULL;

            CREATE TABLE IF NOT EXISTS event_logs (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| ShipError::Store(format!("Migration: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ShipError::Store(format!("DB lock poisoned: {e}")))
    }

    /// When `key` was last written (RFC 3339), if ever.
    pub fn updated_at(&self, key: &str) -> Result<Option<String>> {
        self.conn()?
            .query_row(
                "SELECT updated_at FROM event_logs WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ShipError::Store(format!("Query: {e}")))
    }
}

impl DurableStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        self.conn()?
            .query_row(
                "SELECT value FROM event_logs WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ShipError::Store(format!("Load '{key}': {e}")))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO event_logs (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .map_err(|e| ShipError::Store(format!("Save '{key}': {e}")))?;
        tracing::debug!("💾 Saved '{}' ({} bytes) to sqlite", key, value.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_migrate() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.load("pending_events").unwrap(), None);
        assert_eq!(store.updated_at("pending_events").unwrap(), None);
    }

    #[test]
    fn test_upsert() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save("in_flight_events", "one").unwrap();
        store.save("in_flight_events", "two").unwrap();
        assert_eq!(store.load("in_flight_events").unwrap().as_deref(), Some("two"));
        assert!(store.updated_at("in_flight_events").unwrap().is_some());
    }

    #[test]
    fn test_survives_reopen() {
        let dir = std::env::temp_dir().join("eventship-sqlite-test");
        std::fs::remove_dir_all(&dir).ok();
        let path = dir.join("state.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.save("pending_events", r#"{"events":[]}"#).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.load("pending_events").unwrap().as_deref(),
            Some(r#"{"events":[]}"#)
        );
        std::fs::remove_dir_all(&dir).ok();
    }
}
