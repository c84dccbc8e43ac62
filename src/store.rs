//! SQLite-backed storage for users and entries.
//!
//! Only creation and reads are exposed; nothing is updated or deleted.

use crate::types::{Entry, OwnedEntry, User};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info};

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username '{0}' already exists")]
    DuplicateUsername(String),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        is_admin INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE IF NOT EXISTS entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        created_at TEXT NOT NULL,
        user_id INTEGER NOT NULL REFERENCES users(id)
    );
    CREATE INDEX IF NOT EXISTS idx_entries_user ON entries(user_id, created_at);
";

/// Shared handle to the portal database
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (and initialize if needed) the database file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "Database opened");
        Self::init(conn)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Insert a user; a taken username yields `DuplicateUsername`.
    pub fn create_user(&self, username: &str, password_hash: &str, is_admin: bool) -> Result<User> {
        let conn = self.conn()?;

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            [username],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StoreError::DuplicateUsername(username.to_string()));
        }

        conn.execute(
            "INSERT INTO users (username, password_hash, is_admin) VALUES (?1, ?2, ?3)",
            params![username, password_hash, is_admin],
        )
        .map_err(|e| match e.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => {
                StoreError::DuplicateUsername(username.to_string())
            }
            _ => StoreError::Sqlite(e),
        })?;

        let id = conn.last_insert_rowid();
        debug!(user_id = id, username = %username, is_admin, "User created");

        Ok(User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            is_admin,
        })
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, password_hash, is_admin FROM users WHERE username = ?1",
                [username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn user_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Insert an entry owned by `user_id`, stamped with the current time.
    pub fn create_entry(&self, user_id: i64, title: &str, description: &str) -> Result<Entry> {
        let conn = self.conn()?;
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO entries (title, description, created_at, user_id) VALUES (?1, ?2, ?3, ?4)",
            params![title, description, created_at, user_id],
        )?;

        let id = conn.last_insert_rowid();
        debug!(entry_id = id, user_id, "Entry created");

        Ok(Entry {
            id,
            title: title.to_string(),
            description: description.to_string(),
            created_at,
            user_id,
        })
    }

    /// Entries owned by `user_id`, newest first
    pub fn entries_for_user(&self, user_id: i64) -> Result<Vec<Entry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, description, created_at, user_id
             FROM entries
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let entries = stmt
            .query_map([user_id], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Every entry with its owner's username, newest first
    pub fn all_entries(&self) -> Result<Vec<OwnedEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT e.id, e.title, e.description, e.created_at, e.user_id, u.username
             FROM entries e
             JOIN users u ON u.id = e.user_id
             ORDER BY e.created_at DESC, e.id DESC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(OwnedEntry {
                    entry: entry_from_row(row)?,
                    owner: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        is_admin: row.get(3)?,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let created_at: DateTime<Utc> = row.get(3)?;
    Ok(Entry {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        created_at,
        user_id: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_find_user() {
        let store = Store::open_in_memory().unwrap();
        let user = store.create_user("ana", "hash", false).unwrap();
        let found = store.find_user_by_username("ana").unwrap().unwrap();
        assert_eq!(found, user);
        assert!(store.find_user_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username() {
        let store = Store::open_in_memory().unwrap();
        store.create_user("ana", "hash", false).unwrap();
        let err = store.create_user("ana", "other", true).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername(name) if name == "ana"));
        assert_eq!(store.user_count().unwrap(), 1);
    }

    #[test]
    fn test_entries_scoped_and_ordered() {
        let store = Store::open_in_memory().unwrap();
        let ana = store.create_user("ana", "h", false).unwrap();
        let bob = store.create_user("bob", "h", false).unwrap();

        store.create_entry(ana.id, "first", "a").unwrap();
        store.create_entry(bob.id, "other", "b").unwrap();
        store.create_entry(ana.id, "second", "c").unwrap();

        let own = store.entries_for_user(ana.id).unwrap();
        let titles: Vec<_> = own.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);

        let all = store.all_entries().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].entry.title, "second");
        assert_eq!(all[1].owner, "bob");
    }

    #[test]
    fn test_entry_requires_existing_owner() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.create_entry(42, "orphan", "x").is_err());
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portal.db");
        {
            let store = Store::open(&path).unwrap();
            store.create_user("ana", "h", false).unwrap();
        }
        let store = Store::open(&path).unwrap();
        assert_eq!(store.user_count().unwrap(), 1);
    }
}
