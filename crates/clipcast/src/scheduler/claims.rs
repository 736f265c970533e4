use chrono::{DateTime, NaiveDate, Utc};

use super::slots::Slot;
use crate::error::Result;
use crate::store::{keys, TenantStore};

/// Marker that a target's slot on a local date has been taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotClaim {
    pub target_id: String,
    pub date: NaiveDate,
    pub slot: Slot,
}

impl SlotClaim {
    pub fn new(target_id: &str, date: NaiveDate, slot: Slot) -> Self {
        Self {
            target_id: target_id.to_string(),
            date,
            slot,
        }
    }

    pub fn key(&self) -> String {
        keys::slot_claim(&self.target_id, self.date, self.slot.hour, self.slot.minute)
    }
}

/// Slot claims in the tenant store.
///
/// Claiming is `head` then `put` with nothing in between, so two ticks that
/// race can both win. The ledger's `posting` record narrows that window but
/// does not close it.
#[derive(Clone)]
pub struct SlotClaims {
    store: TenantStore,
}

impl SlotClaims {
    pub fn new(store: TenantStore) -> Self {
        Self { store }
    }

    /// Returns `false` when the claim already exists.
    pub async fn try_claim(&self, claim: &SlotClaim, now: DateTime<Utc>) -> Result<bool> {
        let key = claim.key();
        if self.store.head(&key).await?.is_some() {
            log::debug!("Slot claim {} already exists", key);
            return Ok(false);
        }
        self.store.put(&key, now.to_rfc3339()).await?;
        Ok(true)
    }

    pub async fn release(&self, claim: &SlotClaim) -> Result<()> {
        self.store.delete(&claim.key()).await?;
        Ok(())
    }

    pub async fn exists(&self, claim: &SlotClaim) -> Result<bool> {
        Ok(self.store.exists(&claim.key()).await?)
    }
}
