//! Publish history repository: operations on the `publish_history` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw publish history row.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRow {
    pub id: i64,
    pub target_id: String,
    pub artifact_id: String,
    pub external_post_id: Option<String>,
    pub posted_at: String,
    pub status: String,
    pub error_message: Option<String>,
    pub slot_date: Option<String>,
    pub slot_minute: Option<u32>,
}

impl PublishRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            target_id: row.get("target_id")?,
            artifact_id: row.get("artifact_id")?,
            external_post_id: row.get("external_post_id")?,
            posted_at: row.get("posted_at")?,
            status: row.get("status")?,
            error_message: row.get("error_message")?,
            slot_date: row.get("slot_date")?,
            slot_minute: row.get("slot_minute")?,
        })
    }
}

/// Values for a new history row. The id is assigned by SQLite.
#[derive(Debug, Clone)]
pub struct NewPublishRow<'a> {
    pub target_id: &'a str,
    pub artifact_id: &'a str,
    pub posted_at: &'a str,
    pub status: &'a str,
    pub slot_date: Option<&'a str>,
    pub slot_minute: Option<u32>,
}

/// Query filter for history listing.
#[derive(Debug, Default, Clone)]
pub struct HistoryFilter {
    pub target_id: Option<String>,
    pub exclude_status: Option<String>,
    pub limit: Option<u64>,
}

/// Inserts a history row and returns its id.
pub fn insert(db: &Database, row: &NewPublishRow<'_>) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO publish_history (target_id, artifact_id, posted_at, status, slot_date, slot_minute)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.target_id,
                row.artifact_id,
                row.posted_at,
                row.status,
                row.slot_date,
                row.slot_minute,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Updates the status of a row. `external_post_id` and `error_message`
/// only overwrite the stored value when provided.
/// Returns `false` when no row matched.
pub fn update_status(
    db: &Database,
    id: i64,
    status: &str,
    external_post_id: Option<&str>,
    error_message: Option<&str>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE publish_history SET status = ?2,
             external_post_id = COALESCE(?3, external_post_id),
             error_message = COALESCE(?4, error_message)
             WHERE id = ?1",
            params![id, status, external_post_id, error_message],
        )?;
        Ok(changed > 0)
    })
}

/// Finds a row by id.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<PublishRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM publish_history WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], PublishRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Distinct artifact ids that have at least one row in one of `statuses`,
/// across all targets.
pub fn artifact_ids_with_status(
    db: &Database,
    statuses: &[&str],
) -> Result<Vec<String>, DatabaseError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    db.with_conn(|conn| {
        let placeholders: Vec<String> = (1..=statuses.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT DISTINCT artifact_id FROM publish_history WHERE status IN ({}) ORDER BY artifact_id",
            placeholders.join(", ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(rusqlite::params_from_iter(statuses.iter()), |r| r.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    })
}

/// Counts rows of a target that served the given local slot with one of `statuses`.
pub fn count_for_slot(
    db: &Database,
    target_id: &str,
    slot_date: &str,
    slot_minute: u32,
    statuses: &[&str],
) -> Result<u64, DatabaseError> {
    if statuses.is_empty() {
        return Ok(0);
    }
    db.with_conn(|conn| {
        let placeholders: Vec<String> = (4..4 + statuses.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT COUNT(*) FROM publish_history
             WHERE target_id = ?1 AND slot_date = ?2 AND slot_minute = ?3 AND status IN ({})",
            placeholders.join(", ")
        );
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![
            Box::new(target_id.to_string()),
            Box::new(slot_date.to_string()),
            Box::new(slot_minute),
        ];
        for status in statuses {
            values.push(Box::new(status.to_string()));
        }
        let params_ref: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| p.as_ref()).collect();
        let count: u64 = conn.query_row(&sql, params_ref.as_slice(), |r| r.get(0))?;
        Ok(count)
    })
}

/// Lists rows newest first.
pub fn query(db: &Database, filter: &HistoryFilter) -> Result<Vec<PublishRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref target_id) = filter.target_id {
            conditions.push(format!("target_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(target_id.clone()));
        }
        if let Some(ref exclude_status) = filter.exclude_status {
            conditions.push(format!("status != ?{}", param_values.len() + 1));
            param_values.push(Box::new(exclude_status.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        param_values.push(Box::new(filter.limit.unwrap_or(100) as i64));
        let sql = format!(
            "SELECT * FROM publish_history {} ORDER BY posted_at DESC, id DESC LIMIT ?{}",
            where_clause,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_ref.as_slice(), PublishRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts rows of a target posted at or after `since` (all rows when `None`).
pub fn count_since(
    db: &Database,
    target_id: &str,
    since: Option<&str>,
) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = match since {
            Some(since) => conn.query_row(
                "SELECT COUNT(*) FROM publish_history WHERE target_id = ?1 AND posted_at >= ?2",
                params![target_id, since],
                |r| r.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM publish_history WHERE target_id = ?1",
                params![target_id],
                |r| r.get(0),
            )?,
        };
        Ok(count)
    })
}
