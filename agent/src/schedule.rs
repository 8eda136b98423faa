//! Cron-driven run loop.
//!
//! Ticks run one after another on this task. A run that is still going when
//! later fire times pass makes those fires be skipped, so runs never overlap.

use crate::orchestrator::RunOrchestrator;
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::time::Duration;
use tracing::{info, warn};

pub struct Scheduler {
    schedule: Schedule,
    timezone: Tz,
}

impl Scheduler {
    pub fn new(schedule: Schedule, timezone: Tz) -> Self {
        Self { schedule, timezone }
    }

    /// First fire strictly after `after`, in the schedule's timezone.
    pub fn next_fire(&self, after: DateTime<Utc>) -> Option<DateTime<Tz>> {
        self.schedule.after(&after.with_timezone(&self.timezone)).next()
    }

    /// Fire times in `(fired, finished]` that a run spanning that window ate.
    pub fn missed_fires(&self, fired: DateTime<Tz>, finished: DateTime<Utc>) -> usize {
        self.schedule
            .after(&fired)
            .take_while(|t| t.with_timezone(&Utc) <= finished)
            .count()
    }

    /// Run forever. Only returns if the expression has no future fire times.
    pub async fn run(&self, orchestrator: &mut RunOrchestrator) -> Result<()> {
        info!(
            cron = %self.schedule,
            timezone = %self.timezone,
            "scheduler started"
        );

        loop {
            let Some(next) = self.next_fire(Utc::now()) else {
                bail!("Schedule '{}' has no upcoming fire times", self.schedule);
            };
            info!(next = %next, "next run scheduled");

            let wait = (next.with_timezone(&Utc) - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;

            orchestrator.run().await;

            let missed = self.missed_fires(next, Utc::now());
            if missed > 0 {
                warn!(missed, "run outlasted later fire times; skipping them");
            }
        }
    }
}
