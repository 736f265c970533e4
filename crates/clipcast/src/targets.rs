//! Publishable destination accounts.

use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::db::target_repo::{self, TargetRow};
use crate::db::{timestamp, Database, DatabaseError};
use crate::error::{ClipcastError, Result};
use crate::sanitize;
use crate::scheduler::slots::{format_slots, parse_slots, parse_timezone, Slot};

/// A destination account with its daily posting slots.
#[derive(Clone, PartialEq)]
pub struct Target {
    pub id: String,
    pub display_name: String,
    pub credential: String,
    pub comment_credential: Option<String>,
    pub image_url: Option<String>,
    pub slots: Vec<Slot>,
    /// IANA zone name. Falls back to the configured default when unset.
    pub timezone: Option<String>,
    pub active: bool,
    pub last_posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Target {
    /// Credential used for follow-up comments.
    pub fn comment_credential(&self) -> &str {
        self.comment_credential
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.credential)
    }

    /// Whether the slot scheduler should consider this target at all.
    pub fn is_schedulable(&self) -> bool {
        self.active && !self.slots.is_empty()
    }

    fn from_row(row: TargetRow) -> std::result::Result<Self, DatabaseError> {
        let slots = parse_slots(&row.slots).map_err(|_| DatabaseError::InvalidValue {
            column: "slots",
            value: row.slots.clone(),
        })?;
        Ok(Self {
            slots,
            last_posted_at: row
                .last_posted_at
                .as_deref()
                .map(|v| parse_timestamp("last_posted_at", v))
                .transpose()?,
            created_at: parse_timestamp("created_at", &row.created_at)?,
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
            id: row.id,
            display_name: row.display_name,
            credential: row.credential,
            comment_credential: row.comment_credential,
            image_url: row.image_url,
            timezone: row.timezone,
            active: row.active,
        })
    }

    fn to_row(&self) -> TargetRow {
        TargetRow {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            credential: self.credential.clone(),
            comment_credential: self.comment_credential.clone(),
            image_url: self.image_url.clone(),
            slots: format_slots(&self.slots),
            timezone: self.timezone.clone(),
            active: self.active,
            last_posted_at: self.last_posted_at.map(timestamp),
            created_at: timestamp(self.created_at),
            updated_at: timestamp(self.updated_at),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("credential", &sanitize::redact_token(&self.credential))
            .field("slots", &format_slots(&self.slots))
            .field("timezone", &self.timezone)
            .field("active", &self.active)
            .field("last_posted_at", &self.last_posted_at)
            .finish()
    }
}

fn parse_timestamp(column: &'static str, value: &str) -> std::result::Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DatabaseError::InvalidValue {
            column,
            value: value.to_string(),
        })
}

/// Input for registering a target.
#[derive(Debug, Clone, Default)]
pub struct NewTarget {
    pub id: String,
    pub display_name: String,
    pub credential: String,
    pub comment_credential: Option<String>,
    pub image_url: Option<String>,
    /// Slot list such as `9:05,18:30`.
    pub slots: String,
    pub timezone: Option<String>,
}

/// Target lookup and mutation over the `targets` table.
#[derive(Clone)]
pub struct TargetRegistry {
    db: Database,
    default_timezone: Tz,
}

impl TargetRegistry {
    pub fn new(db: Database, default_timezone: Tz) -> Self {
        Self {
            db,
            default_timezone,
        }
    }

    /// Time zone used to evaluate a target's slots.
    pub fn timezone_of(&self, target: &Target) -> Tz {
        match target.timezone.as_deref().map(parse_timezone) {
            Some(Ok(tz)) => tz,
            Some(Err(_)) => {
                log::warn!(
                    "Target {} has unknown time zone {:?}, using {}",
                    target.id,
                    target.timezone,
                    self.default_timezone
                );
                self.default_timezone
            }
            None => self.default_timezone,
        }
    }

    /// Registers a target, or refreshes name, credentials and image of an
    /// existing one (slots, zone and `active` are kept).
    pub fn upsert(&self, new: NewTarget, now: DateTime<Utc>) -> Result<Target> {
        let slots = parse_slots(&new.slots)?;
        if let Some(tz) = new.timezone.as_deref() {
            parse_timezone(tz)?;
        }

        if let Some(mut existing) = self.get(&new.id)? {
            existing.display_name = new.display_name;
            existing.credential = new.credential;
            if new.comment_credential.is_some() {
                existing.comment_credential = new.comment_credential;
            }
            if new.image_url.is_some() {
                existing.image_url = new.image_url;
            }
            existing.updated_at = now;
            target_repo::update(&self.db, &existing.to_row())?;
            log::info!("Updated target {}", existing.id);
            return Ok(existing);
        }

        let target = Target {
            id: new.id,
            display_name: new.display_name,
            credential: new.credential,
            comment_credential: new.comment_credential,
            image_url: new.image_url,
            slots,
            timezone: new.timezone,
            active: true,
            last_posted_at: None,
            created_at: now,
            updated_at: now,
        };
        target_repo::insert(&self.db, &target.to_row())?;
        log::info!("Registered target {} ({})", target.id, target.display_name);
        Ok(target)
    }

    pub fn get(&self, id: &str) -> Result<Option<Target>> {
        match target_repo::find_by_id(&self.db, id)? {
            Some(row) => Ok(Some(Target::from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn require(&self, id: &str) -> Result<Target> {
        self.get(id)?
            .ok_or_else(|| ClipcastError::TargetNotFound(id.to_string()))
    }

    /// Lists targets. Rows that cannot be decoded are logged and skipped.
    pub fn list(&self, active_only: bool) -> Result<Vec<Target>> {
        let rows = target_repo::list(&self.db, active_only)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                match Target::from_row(row) {
                    Ok(target) => Some(target),
                    Err(e) => {
                        log::warn!("Skipping target {}: {}", id, e);
                        None
                    }
                }
            })
            .collect())
    }

    /// Active targets with at least one slot.
    pub fn schedulable(&self) -> Result<Vec<Target>> {
        Ok(self
            .list(true)?
            .into_iter()
            .filter(Target::is_schedulable)
            .collect())
    }

    pub fn set_active(&self, id: &str, active: bool, now: DateTime<Utc>) -> Result<()> {
        if !target_repo::set_active(&self.db, id, active, &timestamp(now))? {
            return Err(ClipcastError::TargetNotFound(id.to_string()));
        }
        log::info!(
            "Target {} {}",
            id,
            if active { "activated" } else { "deactivated" }
        );
        Ok(())
    }

    /// Replaces the slot list. Returns the normalized slots.
    pub fn set_slots(&self, id: &str, spec: &str, now: DateTime<Utc>) -> Result<Vec<Slot>> {
        let slots = parse_slots(spec)?;
        if !target_repo::set_slots(&self.db, id, &format_slots(&slots), &timestamp(now))? {
            return Err(ClipcastError::TargetNotFound(id.to_string()));
        }
        Ok(slots)
    }

    pub fn set_last_posted_at(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        target_repo::set_last_posted_at(&self.db, id, &timestamp(at))?;
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        if !target_repo::delete(&self.db, id)? {
            return Err(ClipcastError::TargetNotFound(id.to_string()));
        }
        Ok(())
    }
}
