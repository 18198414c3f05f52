//! The local store adapter: one durable slot holding the full document.
//!
//! Loading goes through the document's patch type, so a record written by an
//! older version of the app surfaces missing fields as absent instead of
//! failing. Storage failures are reported to the caller and are non-fatal by
//! contract; the in-memory document stays authoritative for the session.

use std::marker::PhantomData;

use rusqlite::OptionalExtension;

use crate::SyncDocument;

/// The one slot name the dashboard persists under.
pub const DOCUMENT_SLOT: &str = "fullState";

const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored document could not be parsed: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub trait StateStore<D: SyncDocument> {
    /// Durably write the full current document snapshot into the slot.
    fn save(&mut self, document: &D) -> Result<(), StorageError>;

    /// Read the slot back as a patch. `Ok(None)` means the slot has never
    /// been written.
    fn load(&mut self) -> Result<Option<D::Patch>, StorageError>;
}

/// SQLite-backed slot storage. Creates or upgrades its schema transparently
/// on open, tracked through the `user_version` pragma.
pub struct SqliteStore {
    conn: rusqlite::Connection,
    slot: String,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, StorageError> {
        let conn = rusqlite::Connection::open(path)?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn,
            slot: DOCUMENT_SLOT.to_string(),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn,
            slot: DOCUMENT_SLOT.to_string(),
        })
    }

    fn migrate(conn: &rusqlite::Connection) -> Result<(), StorageError> {
        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version < SCHEMA_VERSION {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS documents (
                    slot TEXT PRIMARY KEY,
                    body TEXT NOT NULL
                );",
            )?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            log::info!("local store schema upgraded from {version} to {SCHEMA_VERSION}");
        }
        Ok(())
    }
}

impl<D: SyncDocument> StateStore<D> for SqliteStore {
    fn save(&mut self, document: &D) -> Result<(), StorageError> {
        let body = serde_json::to_string(document)?;
        self.conn.execute(
            "INSERT INTO documents (slot, body) VALUES (?1, ?2)
             ON CONFLICT(slot) DO UPDATE SET body = excluded.body",
            rusqlite::params![self.slot, body],
        )?;
        Ok(())
    }

    fn load(&mut self) -> Result<Option<D::Patch>, StorageError> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE slot = ?1",
                [&self.slot],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            None => Ok(None),
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
        }
    }
}

/// In-memory slot storage, used by engine tests and demos. Saves go through
/// the same serialize/deserialize path as the SQLite store so patch tolerance
/// is exercised, and the save counter lets tests assert debounce coalescing.
#[derive(Debug)]
pub struct MemoryStore<D> {
    body: Option<String>,
    saves: usize,
    marker: PhantomData<D>,
}

impl<D> MemoryStore<D> {
    pub fn new() -> Self {
        Self {
            body: None,
            saves: 0,
            marker: PhantomData,
        }
    }

    /// Seed the slot with raw JSON, as if a previous session had saved it.
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            saves: 0,
            marker: PhantomData,
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

impl<D> Default for MemoryStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: SyncDocument> StateStore<D> for MemoryStore<D> {
    fn save(&mut self, document: &D) -> Result<(), StorageError> {
        self.body = Some(serde_json::to_string(document)?);
        self.saves += 1;
        Ok(())
    }

    fn load(&mut self) -> Result<Option<D::Patch>, StorageError> {
        match &self.body {
            None => Ok(None),
            Some(body) => Ok(Some(serde_json::from_str(body)?)),
        }
    }
}
