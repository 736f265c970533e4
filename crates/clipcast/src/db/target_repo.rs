//! Target repository: CRUD operations for the `targets` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw target row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRow {
    pub id: String,
    pub display_name: String,
    pub credential: String,
    pub comment_credential: Option<String>,
    pub image_url: Option<String>,
    /// Comma separated slot list, e.g. `9:05,18:30`.
    pub slots: String,
    pub timezone: Option<String>,
    pub active: bool,
    pub last_posted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TargetRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            display_name: row.get("display_name")?,
            credential: row.get("credential")?,
            comment_credential: row.get("comment_credential")?,
            image_url: row.get("image_url")?,
            slots: row.get("slots")?,
            timezone: row.get("timezone")?,
            active: row.get::<_, i64>("active")? != 0,
            last_posted_at: row.get("last_posted_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new target row.
pub fn insert(db: &Database, target: &TargetRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO targets (id, display_name, credential, comment_credential, image_url,
             slots, timezone, active, last_posted_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                target.id,
                target.display_name,
                target.credential,
                target.comment_credential,
                target.image_url,
                target.slots,
                target.timezone,
                target.active as i64,
                target.last_posted_at,
                target.created_at,
                target.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Updates an existing target row. All fields except `id` and `created_at` are overwritten.
/// Returns `false` when no row matched.
pub fn update(db: &Database, target: &TargetRow) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE targets SET display_name=?2, credential=?3, comment_credential=?4,
             image_url=?5, slots=?6, timezone=?7, active=?8, last_posted_at=?9, updated_at=?10
             WHERE id=?1",
            params![
                target.id,
                target.display_name,
                target.credential,
                target.comment_credential,
                target.image_url,
                target.slots,
                target.timezone,
                target.active as i64,
                target.last_posted_at,
                target.updated_at,
            ],
        )?;
        Ok(changed > 0)
    })
}

/// Finds a target by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<TargetRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM targets WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], TargetRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists targets ordered by creation time.
pub fn list(db: &Database, active_only: bool) -> Result<Vec<TargetRow>, DatabaseError> {
    db.with_conn(|conn| {
        let sql = if active_only {
            "SELECT * FROM targets WHERE active = 1 ORDER BY created_at, id"
        } else {
            "SELECT * FROM targets ORDER BY created_at, id"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], TargetRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Sets the `active` flag. Returns `false` when no row matched.
pub fn set_active(
    db: &Database,
    id: &str,
    active: bool,
    updated_at: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE targets SET active = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, active as i64, updated_at],
        )?;
        Ok(changed > 0)
    })
}

/// Replaces the slot list. Returns `false` when no row matched.
pub fn set_slots(
    db: &Database,
    id: &str,
    slots: &str,
    updated_at: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE targets SET slots = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, slots, updated_at],
        )?;
        Ok(changed > 0)
    })
}

/// Records the time of the latest publish attempt.
pub fn set_last_posted_at(db: &Database, id: &str, posted_at: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE targets SET last_posted_at = ?2, updated_at = ?2 WHERE id = ?1",
            params![id, posted_at],
        )?;
        Ok(())
    })
}

/// Deletes a target. Returns `false` when no row matched.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM targets WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    })
}
