use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot create database directory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema migration v{version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// A stored value could not be read back into its type.
    #[error("Unreadable value '{value}' in column '{column}'")]
    InvalidValue { column: &'static str, value: String },

    #[error("Database lock poisoned")]
    LockPoisoned,
}
