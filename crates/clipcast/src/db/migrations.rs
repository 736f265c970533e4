//! Schema versioning.
//!
//! Applied versions are recorded in `schema_migrations`. Each pending
//! migration runs in its own transaction together with its bookkeeping row,
//! so a failed step leaves the previous version intact.

use chrono::Utc;
use rusqlite::{params, Connection, Transaction};

use super::error::DatabaseError;
use super::timestamp;

enum Step {
    /// A batch of DDL statements.
    Script(&'static str),
    /// `ALTER TABLE .. ADD COLUMN`, skipped when the column already exists.
    AddColumn {
        table: &'static str,
        column: &'static str,
        definition: &'static str,
    },
}

struct Migration {
    version: u32,
    name: &'static str,
    step: Step,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "targets",
        step: Step::Script(include_str!("sql/001_create_targets.sql")),
    },
    Migration {
        version: 2,
        name: "publish_history",
        step: Step::Script(include_str!("sql/002_create_publish_history.sql")),
    },
    Migration {
        version: 3,
        name: "targets_timezone",
        step: Step::AddColumn {
            table: "targets",
            column: "timezone",
            definition: "TEXT",
        },
    },
];

/// Brings the schema up to the latest version.
pub fn run_all(conn: &mut Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );",
    )?;
    let applied = current_version(conn)?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
        let tx = conn.transaction()?;
        apply(&tx, migration).map_err(|e| DatabaseError::Migration {
            version: migration.version,
            reason: e.to_string(),
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, timestamp(Utc::now())],
        )?;
        tx.commit()?;
        log::info!("Schema migrated to v{} ({})", migration.version, migration.name);
    }
    Ok(())
}

pub fn current_version(conn: &Connection) -> Result<u32, DatabaseError> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |r| r.get(0),
    )?)
}

fn apply(tx: &Transaction<'_>, migration: &Migration) -> Result<(), DatabaseError> {
    match &migration.step {
        Step::Script(sql) => tx.execute_batch(sql)?,
        Step::AddColumn {
            table,
            column,
            definition,
        } => {
            if has_column(tx, table, column)? {
                log::debug!("Column {}.{} already present", table, column);
            } else {
                tx.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {definition};"))?;
            }
        }
    }
    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, DatabaseError> {
    let mut stmt = conn.prepare("SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2")?;
    Ok(stmt.exists(params![table, column])?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        run_all(&mut conn).unwrap();
        conn
    }

    #[test]
    fn test_fresh_database_reaches_latest_version() {
        let conn = fresh();
        assert_eq!(current_version(&conn).unwrap(), 3);
        assert!(has_column(&conn, "targets", "timezone").unwrap());
        assert!(has_column(&conn, "publish_history", "slot_minute").unwrap());
    }

    #[test]
    fn test_rerun_applies_nothing() {
        let mut conn = fresh();
        run_all(&mut conn).unwrap();
        let rows: u32 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, MIGRATIONS.len() as u32);
    }

    #[test]
    fn test_existing_column_is_not_added_twice() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("sql/001_create_targets.sql")).unwrap();
        conn.execute_batch("ALTER TABLE targets ADD COLUMN timezone TEXT;").unwrap();

        run_all(&mut conn).unwrap();

        assert_eq!(current_version(&conn).unwrap(), 3);
    }

    #[test]
    fn test_has_column_on_unknown_table() {
        let conn = fresh();
        assert!(!has_column(&conn, "nope", "id").unwrap());
        assert!(!has_column(&conn, "targets", "nope").unwrap());
    }

    #[test]
    fn test_publish_ids_are_never_reused() {
        let conn = fresh();
        let insert = |artifact: &str| {
            conn.execute(
                "INSERT INTO publish_history (target_id, artifact_id, posted_at) VALUES ('p', ?1, '2026-01-01T00:00:00Z')",
                [artifact],
            )
            .unwrap();
            conn.last_insert_rowid()
        };
        let first = insert("a");
        conn.execute("DELETE FROM publish_history WHERE id = ?1", [first]).unwrap();
        assert!(insert("b") > first);
    }
}
