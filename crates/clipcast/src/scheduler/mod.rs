//! Slot-based auto-publishing.

pub mod claims;
pub mod posting;
pub mod runner;
pub mod slots;

pub use claims::{SlotClaim, SlotClaims};
pub use posting::pick_artifact;
pub use runner::{Scheduler, TargetOutcome, TargetReport, TickReport};
pub use slots::{format_slots, parse_slots, parse_timezone, select_slot, LocalClock, Slot};
