//! Post-history ledger.
//!
//! Every publish attempt gets a record in `posting` state before any external
//! side effect happens. A `posting` or `success` record claims its artifact
//! system-wide, so a crash mid-publish can never lead to the same artifact
//! being posted twice.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::db::publish_repo::{self, HistoryFilter, NewPublishRow, PublishRow};
use crate::db::{target_repo, timestamp, Database, DatabaseError};
use crate::error::Result;
use crate::scheduler::slots::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Posting,
    Success,
    Failed,
    Withdrawn,
}

impl PublishStatus {
    /// Statuses that claim an artifact and a slot.
    pub const CLAIMING: [PublishStatus; 2] = [PublishStatus::Posting, PublishStatus::Success];

    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Posting => "posting",
            PublishStatus::Success => "success",
            PublishStatus::Failed => "failed",
            PublishStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "posting" => Some(PublishStatus::Posting),
            "success" => Some(PublishStatus::Success),
            "failed" => Some(PublishStatus::Failed),
            "withdrawn" => Some(PublishStatus::Withdrawn),
            _ => None,
        }
    }

    pub fn is_claiming(&self) -> bool {
        Self::CLAIMING.contains(self)
    }
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The local slot a publish attempt served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotRef {
    pub date: NaiveDate,
    pub slot: Slot,
}

/// One (target × artifact) publish attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishRecord {
    pub id: i64,
    pub target_id: String,
    pub artifact_id: String,
    pub external_post_id: Option<String>,
    pub posted_at: DateTime<Utc>,
    pub status: PublishStatus,
    pub error_message: Option<String>,
    pub slot: Option<SlotRef>,
}

impl PublishRecord {
    fn from_row(row: PublishRow) -> std::result::Result<Self, DatabaseError> {
        let status = PublishStatus::parse(&row.status).ok_or_else(|| {
            log::warn!("Unknown publish status '{}' on record {}", row.status, row.id);
            DatabaseError::InvalidValue {
                column: "status",
                value: row.status.clone(),
            }
        })?;
        let posted_at = DateTime::parse_from_rfc3339(&row.posted_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| DatabaseError::InvalidValue {
                column: "posted_at",
                value: row.posted_at.clone(),
            })?;

        let slot = match (row.slot_date.as_deref(), row.slot_minute) {
            (Some(date), Some(minute)) => {
                let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                    DatabaseError::InvalidValue {
                        column: "slot_date",
                        value: date.to_string(),
                    }
                })?;
                let slot = Slot::new(minute / 60, minute % 60).map_err(|_| {
                    DatabaseError::InvalidValue {
                        column: "slot_minute",
                        value: minute.to_string(),
                    }
                })?;
                Some(SlotRef { date, slot })
            }
            _ => None,
        };

        Ok(Self {
            id: row.id,
            target_id: row.target_id,
            artifact_id: row.artifact_id,
            external_post_id: row.external_post_id,
            posted_at,
            status,
            error_message: row.error_message,
            slot,
        })
    }
}

/// Post counts for one target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishStats {
    pub today: u64,
    pub week: u64,
    pub total: u64,
}

fn claiming_statuses() -> [&'static str; 2] {
    PublishStatus::CLAIMING.map(|s| s.as_str())
}

#[derive(Clone)]
pub struct Ledger {
    db: Database,
}

impl Ledger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Records the intent to publish before any side effect: inserts a
    /// `posting` record and bumps the target's `last_posted_at`.
    pub fn begin(
        &self,
        target_id: &str,
        artifact_id: &str,
        at: DateTime<Utc>,
        slot: Option<SlotRef>,
    ) -> Result<i64> {
        let posted_at = timestamp(at);
        let slot_date = slot.map(|s| s.date.format("%Y-%m-%d").to_string());
        let id = publish_repo::insert(
            &self.db,
            &NewPublishRow {
                target_id,
                artifact_id,
                posted_at: &posted_at,
                status: PublishStatus::Posting.as_str(),
                slot_date: slot_date.as_deref(),
                slot_minute: slot.map(|s| s.slot.minutes()),
            },
        )?;
        target_repo::set_last_posted_at(&self.db, target_id, &posted_at)?;
        log::debug!(
            "Ledger record {} opened: target={} artifact={}",
            id,
            target_id,
            artifact_id
        );
        Ok(id)
    }

    pub fn mark_success(&self, id: i64, external_post_id: &str) -> Result<()> {
        publish_repo::update_status(
            &self.db,
            id,
            PublishStatus::Success.as_str(),
            Some(external_post_id),
            None,
        )?;
        Ok(())
    }

    pub fn mark_failed(&self, id: i64, error: &str) -> Result<()> {
        publish_repo::update_status(&self.db, id, PublishStatus::Failed.as_str(), None, Some(error))?;
        Ok(())
    }

    /// Marks a record withdrawn. Returns `false` if the record does not exist.
    pub fn mark_withdrawn(&self, id: i64) -> Result<bool> {
        Ok(publish_repo::update_status(
            &self.db,
            id,
            PublishStatus::Withdrawn.as_str(),
            None,
            None,
        )?)
    }

    pub fn get(&self, id: i64) -> Result<Option<PublishRecord>> {
        match publish_repo::find_by_id(&self.db, id)? {
            Some(row) => Ok(Some(PublishRecord::from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Artifacts claimed by any target.
    pub fn claimed_artifact_ids(&self) -> Result<HashSet<String>> {
        let ids = publish_repo::artifact_ids_with_status(&self.db, &claiming_statuses())?;
        Ok(ids.into_iter().collect())
    }

    /// Whether a target already has a claiming record for a local slot.
    pub fn slot_taken(&self, target_id: &str, date: NaiveDate, slot: Slot) -> Result<bool> {
        let count = publish_repo::count_for_slot(
            &self.db,
            target_id,
            &date.format("%Y-%m-%d").to_string(),
            slot.minutes(),
            &claiming_statuses(),
        )?;
        Ok(count > 0)
    }

    /// Most recent records across all targets, withdrawn ones excluded.
    pub fn recent(&self, limit: u64) -> Result<Vec<PublishRecord>> {
        self.query(&HistoryFilter {
            target_id: None,
            exclude_status: Some(PublishStatus::Withdrawn.as_str().to_string()),
            limit: Some(limit),
        })
    }

    /// Most recent records of one target, including withdrawn ones.
    pub fn for_target(&self, target_id: &str, limit: u64) -> Result<Vec<PublishRecord>> {
        self.query(&HistoryFilter {
            target_id: Some(target_id.to_string()),
            exclude_status: None,
            limit: Some(limit),
        })
    }

    fn query(&self, filter: &HistoryFilter) -> Result<Vec<PublishRecord>> {
        let rows = publish_repo::query(&self.db, filter)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                match PublishRecord::from_row(row) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        log::warn!("Skipping publish record {}: {}", id, e);
                        None
                    }
                }
            })
            .collect())
    }

    /// Attempts of a target today (local midnight in `tz`), in the last
    /// seven days, and overall.
    pub fn stats(&self, target_id: &str, now: DateTime<Utc>, tz: Tz) -> Result<PublishStats> {
        let local_midnight = now
            .with_timezone(&tz)
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now - Duration::days(1));

        Ok(PublishStats {
            today: publish_repo::count_since(&self.db, target_id, Some(&timestamp(local_midnight)))?,
            week: publish_repo::count_since(
                &self.db,
                target_id,
                Some(&timestamp(now - Duration::days(7))),
            )?,
            total: publish_repo::count_since(&self.db, target_id, None)?,
        })
    }
}
