//! Durable cursor store backed by an embedded SQLite database.
//!
//! Persists exactly one record: the id of the most recently confirmed real
//! post. The record survives restarts and is the sole source of truth for
//! reseeding the discovery frontier (`frontier = [cursor + 1]`).
//!
//! The cursor is monotonically non-decreasing in normal operation. Storing a
//! lower value is allowed (manual correction via the admin surface) but is
//! logged as an anomaly. If the backing store is unreachable, every
//! operation fails with [`WatchError::Storage`] and the caller must treat
//! that as fatal.

use crate::error::{Result, WatchError};
use rusqlite::{Connection, params};
use std::fs;
use std::path::Path;

/// Fixed key of the singleton cursor row.
const CURSOR_KEY: &str = "latest_post";

/// CursorStore manages the persisted latest-post-id record.
pub struct CursorStore {
    db: Connection,
}

impl CursorStore {
    /// Open or create the store at the given path, seeding the cursor from
    /// `bootstrap_id` if no record exists yet.
    pub fn open(db_path: &Path, bootstrap_id: i64) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let db = Connection::open(db_path)
            .map_err(|e| WatchError::Storage(format!("failed to open {}: {}", db_path.display(), e)))?;

        Self::from_connection(db, bootstrap_id)
    }

    /// In-memory store for tests.
    pub fn open_in_memory(bootstrap_id: i64) -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::from_connection(db, bootstrap_id)
    }

    fn from_connection(db: Connection, bootstrap_id: i64) -> Result<Self> {
        Self::init_schema(&db)?;
        let store = Self { db };
        store.seed_if_missing(bootstrap_id)?;
        Ok(store)
    }

    /// Initialize the SQLite schema.
    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cursor (
                key TEXT PRIMARY KEY,
                latest_post_id INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Insert the bootstrap value on first-ever access.
    fn seed_if_missing(&self, bootstrap_id: i64) -> Result<()> {
        let existing: Option<i64> = self.read_row()?;
        if existing.is_none() {
            log::info!("No cursor record found, seeding from bootstrap id {}", bootstrap_id);
            self.db.execute(
                "INSERT INTO cursor (key, latest_post_id) VALUES (?1, ?2)",
                params![CURSOR_KEY, bootstrap_id],
            )?;
        }
        Ok(())
    }

    fn read_row(&self) -> Result<Option<i64>> {
        let result = self
            .db
            .query_row("SELECT latest_post_id FROM cursor WHERE key = ?1", [CURSOR_KEY], |row| {
                row.get(0)
            });

        match result {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get the current cursor value.
    pub fn get(&self) -> Result<i64> {
        self.read_row()?
            .ok_or_else(|| WatchError::Storage("cursor record missing after seeding".to_string()))
    }

    /// Set the cursor value with upsert semantics.
    ///
    /// A value lower than the current one is stored anyway but logged as an
    /// anomaly: normal discovery only ever moves the cursor forward, so a
    /// decrease means a manual correction.
    pub fn set(&self, id: i64) -> Result<()> {
        let current = self.get()?;
        if id < current {
            log::warn!("Cursor moving backward: {} -> {} (manual correction?)", current, id);
        }

        self.db.execute(
            "INSERT OR REPLACE INTO cursor (key, latest_post_id) VALUES (?1, ?2)",
            params![CURSOR_KEY, id],
        )?;

        Ok(())
    }
}
