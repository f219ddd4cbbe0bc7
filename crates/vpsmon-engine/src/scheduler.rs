use crate::engine::HealthCheckEngine;
use chrono::{FixedOffset, Timelike, Utc};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use vpsmon_alert::schedule::CheckSchedule;

/// Minute-tick scheduler: fires the engine whenever the current minute in
/// the reference timezone matches the configured schedule.
///
/// Runs are spawned rather than awaited so a slow provider cannot stall the
/// tick loop; the engine's own re-entrancy guard turns an overlapping tick
/// into a logged skip.
pub struct HealthCheckScheduler {
    engine: Arc<HealthCheckEngine>,
    schedule: CheckSchedule,
    tz: FixedOffset,
}

impl HealthCheckScheduler {
    pub fn new(engine: Arc<HealthCheckEngine>, schedule: CheckSchedule, tz: FixedOffset) -> Self {
        Self {
            engine,
            schedule,
            tz,
        }
    }

    pub async fn run(&self) {
        tracing::info!(schedule = ?self.schedule, "Health check scheduler started");

        let mut tick = interval(Duration::from_secs(60));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // (hour, minute) of the last fired slot, so one due minute never
        // fires twice even if tick alignment drifts.
        let mut last_fired: Option<(u32, u32)> = None;

        loop {
            tick.tick().await;

            let now = Utc::now().with_timezone(&self.tz);
            let slot = (now.hour(), now.minute());

            if !self.schedule.is_due(now.minute()) {
                continue;
            }
            if last_fired == Some(slot) {
                continue;
            }
            last_fired = Some(slot);

            let engine = self.engine.clone();
            tokio::spawn(async move {
                engine.run_check().await;
            });
        }
    }
}
