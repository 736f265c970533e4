//! SQLite persistence for targets and the publish ledger.
//!
//! Blob data (jobs, artifacts, claims) lives in the object store; only
//! relational data that needs querying by slot or status is kept here.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

pub mod error;
pub mod migrations;
pub mod publish_repo;
pub mod target_repo;

pub use error::DatabaseError;

const DATABASE_FILE: &str = "clipcast.db";

/// Shared handle to one SQLite connection. Clones share the connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens the file at `path`, creating it and its directory if needed,
    /// and migrates it to the latest schema.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| DatabaseError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let db = Self::prepare(conn)?;
        log::info!("Opened database {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(mut conn: Connection) -> Result<Self, DatabaseError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migrations::run_all(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` while holding the connection lock.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let guard = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&guard)
    }
}

/// Stored timestamp text, e.g. `2026-01-01T02:05:00Z`. Fixed width and UTC,
/// so text order is time order.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn database_path(data_directory: &Path) -> PathBuf {
    data_directory.join(DATABASE_FILE)
}

/// `~/.clipcast/data/clipcast.db`
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| database_path(&home.join(".clipcast").join("data")))
}
