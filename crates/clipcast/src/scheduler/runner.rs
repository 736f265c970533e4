use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, info_span, warn, Instrument};

use super::claims::{SlotClaim, SlotClaims};
use super::posting::pick_artifact;
use super::slots::{select_slot, LocalClock, Slot};
use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::gallery::ArtifactStore;
use crate::ledger::SlotRef;
use crate::publish::{CommentSweep, PublishOptions, PublishOutcome, PublishPipeline};
use crate::targets::{Target, TargetRegistry};

/// What one tick decided for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum TargetOutcome {
    /// No slot within tolerance, or every matching slot already served.
    Idle,
    /// Another tick holds the slot claim.
    ClaimHeld { slot: Slot },
    /// The slot was free but no artifact was eligible.
    NoArtifact { slot: Slot },
    Published {
        slot: Slot,
        record_id: i64,
        external_post_id: String,
    },
    Failed { slot: Option<Slot>, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    pub target_id: String,
    #[serde(flatten)]
    pub outcome: TargetOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub at: DateTime<Utc>,
    pub comments: CommentSweep,
    pub targets: Vec<TargetReport>,
}

impl TickReport {
    pub fn published(&self) -> usize {
        self.targets
            .iter()
            .filter(|r| matches!(r.outcome, TargetOutcome::Published { .. }))
            .count()
    }

    pub fn outcome_for(&self, target_id: &str) -> Option<&TargetOutcome> {
        self.targets
            .iter()
            .find(|r| r.target_id == target_id)
            .map(|r| &r.outcome)
    }
}

/// Periodic slot matcher that feeds artifacts to the publish pipeline.
///
/// Each tick evaluates every schedulable target on its own; an error for one
/// target is recorded in its report and never stops the others.
#[derive(Clone)]
pub struct Scheduler {
    targets: TargetRegistry,
    artifacts: ArtifactStore,
    claims: SlotClaims,
    publisher: PublishPipeline,
    tolerance_minutes: u32,
    tick_interval: Duration,
}

impl Scheduler {
    pub fn new(
        targets: TargetRegistry,
        artifacts: ArtifactStore,
        claims: SlotClaims,
        publisher: PublishPipeline,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            targets,
            artifacts,
            claims,
            publisher,
            tolerance_minutes: config.slot_tolerance_minutes,
            tick_interval: Duration::from_secs(config.tick_interval_secs.max(1)),
        }
    }

    pub fn publisher(&self) -> &PublishPipeline {
        &self.publisher
    }

    /// Runs one scheduling pass at `now`.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let comments = match self.publisher.comments().process_due(now).await {
            Ok(sweep) => sweep,
            Err(e) => {
                warn!(error = %e, "Pending comment sweep failed");
                CommentSweep::default()
            }
        };

        let mut reports = Vec::new();
        for target in self.targets.schedulable()? {
            let span = info_span!("tick_target", target = %target.id);
            let outcome = self.tick_target(&target, now).instrument(span).await;
            reports.push(TargetReport {
                target_id: target.id,
                outcome,
            });
        }

        Ok(TickReport {
            at: now,
            comments,
            targets: reports,
        })
    }

    async fn tick_target(&self, target: &Target, now: DateTime<Utc>) -> TargetOutcome {
        let clock = LocalClock::at(now, self.targets.timezone_of(target));
        let ledger = self.publisher.ledger();

        let slot = match select_slot(&target.slots, clock.minutes, self.tolerance_minutes, |s| {
            ledger.slot_taken(&target.id, clock.date, s)
        }) {
            Ok(Some(slot)) => slot,
            Ok(None) => return TargetOutcome::Idle,
            Err(e) => {
                warn!(error = %e, "Slot lookup failed");
                return TargetOutcome::Failed {
                    slot: None,
                    error: e.to_string(),
                };
            }
        };

        let claim = SlotClaim::new(&target.id, clock.date, slot);
        match self.claims.try_claim(&claim, now).await {
            Ok(true) => {}
            Ok(false) => return TargetOutcome::ClaimHeld { slot },
            Err(e) => {
                warn!(%slot, error = %e, "Slot claim failed");
                return TargetOutcome::Failed {
                    slot: Some(slot),
                    error: e.to_string(),
                };
            }
        }
        info!(%slot, date = %clock.date_string(), "Slot claimed");

        let options = PublishOptions {
            skip_comment: false,
            slot: Some(SlotRef {
                date: clock.date,
                slot,
            }),
        };
        let outcome = match self.publish_random(target, options, now).await {
            Ok(Some(published)) => {
                return TargetOutcome::Published {
                    slot,
                    record_id: published.record_id,
                    external_post_id: published.external_post_id,
                }
            }
            Ok(None) => TargetOutcome::NoArtifact { slot },
            Err(e) => TargetOutcome::Failed {
                slot: Some(slot),
                error: e.to_string(),
            },
        };

        // Released so a later tick within tolerance can retry the slot.
        if let Err(e) = self.claims.release(&claim).await {
            warn!(%slot, error = %e, "Failed to release slot claim");
        }
        outcome
    }

    async fn publish_random(
        &self,
        target: &Target,
        options: PublishOptions,
        now: DateTime<Utc>,
    ) -> Result<Option<PublishOutcome>> {
        let Some(artifact) = pick_artifact(&self.artifacts, self.publisher.ledger()).await? else {
            return Ok(None);
        };
        let outcome = self.publisher.publish(target, &artifact, options, now).await?;
        Ok(Some(outcome))
    }

    /// Publishes a random eligible artifact to `target_id` right away,
    /// ignoring its slots. Returns `None` when nothing is eligible.
    pub async fn force_post(
        &self,
        target_id: &str,
        skip_comment: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<PublishOutcome>> {
        let target = self.targets.require(target_id)?;
        let options = PublishOptions {
            skip_comment,
            slot: None,
        };
        self.publish_random(&target, options, now)
            .instrument(info_span!("force_post", target = %target.id))
            .await
    }

    /// Ticks every interval until `shutdown` turns true or its sender drops.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.tick_interval.as_secs(),
            tolerance_minutes = self.tolerance_minutes,
            "Scheduler started"
        );
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick(Utc::now()).await {
                        Ok(report) => debug!(
                            targets = report.targets.len(),
                            published = report.published(),
                            "Tick complete"
                        ),
                        Err(e) => warn!(error = %e, "Tick failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Scheduler stopped");
    }
}
