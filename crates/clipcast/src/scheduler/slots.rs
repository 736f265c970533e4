//! Daily posting slots and local-time arithmetic.

use std::fmt;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::{ClipcastError, Result};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// A local wall-clock time at which a target wants one post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot {
    pub hour: u32,
    pub minute: u32,
}

impl Slot {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(ClipcastError::InvalidSlot {
                spec: format!("{hour}:{minute:02}"),
                reason: "hour must be 0-23 and minute 0-59".to_string(),
            });
        }
        Ok(Self { hour, minute })
    }

    /// Minutes since local midnight.
    pub fn minutes(&self) -> u32 {
        self.hour * 60 + self.minute
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.hour, self.minute)
    }
}

impl serde::Serialize for Slot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parses a comma separated slot list such as `9:05, 18:30` or `9,21`.
///
/// A bare hour means minute zero. Hour 24 is read as midnight. The result is
/// sorted and free of duplicates; an empty string yields no slots.
pub fn parse_slots(spec: &str) -> Result<Vec<Slot>> {
    let mut slots = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        slots.push(parse_slot(part)?);
    }
    slots.sort();
    slots.dedup();
    Ok(slots)
}

fn parse_slot(part: &str) -> Result<Slot> {
    let invalid = |reason: &str| ClipcastError::InvalidSlot {
        spec: part.to_string(),
        reason: reason.to_string(),
    };

    let (hour, minute) = match part.split_once(':') {
        Some((h, m)) => (h.trim(), m.trim()),
        None => (part, "0"),
    };
    let hour: u32 = hour.parse().map_err(|_| invalid("hour is not a number"))?;
    let minute: u32 = minute
        .parse()
        .map_err(|_| invalid("minute is not a number"))?;

    let hour = if hour == 24 && minute == 0 { 0 } else { hour };
    Slot::new(hour, minute).map_err(|_| invalid("hour must be 0-23 and minute 0-59"))
}

/// Formats slots back into the stored `9:05,18:30` form.
pub fn format_slots(slots: &[Slot]) -> String {
    slots
        .iter()
        .map(Slot::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// The wall clock of a time zone at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalClock {
    pub date: NaiveDate,
    /// Minutes since local midnight.
    pub minutes: u32,
}

impl LocalClock {
    pub fn at(now: DateTime<Utc>, tz: Tz) -> Self {
        let local = now.with_timezone(&tz);
        Self {
            date: local.date_naive(),
            minutes: local.hour() * 60 + local.minute(),
        }
    }

    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| ClipcastError::InvalidTimezone(name.to_string()))
}

/// Picks the slot to serve at `now_minutes`.
///
/// Candidates are slots within `tolerance` minutes of now that are not yet
/// `taken`. The nearest candidate wins; ties go to the earlier slot. There is
/// no wrap-around across midnight.
pub fn select_slot<F>(slots: &[Slot], now_minutes: u32, tolerance: u32, mut taken: F) -> Result<Option<Slot>>
where
    F: FnMut(Slot) -> Result<bool>,
{
    let mut candidates: Vec<(u32, Slot)> = slots
        .iter()
        .map(|s| (s.minutes().abs_diff(now_minutes), *s))
        .filter(|(distance, _)| *distance <= tolerance)
        .collect();
    candidates.sort();

    for (_, slot) in candidates {
        if !taken(slot)? {
            return Ok(Some(slot));
        }
    }
    Ok(None)
}
