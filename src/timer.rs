/*
Focus countdown.
Turns a run (natural finish or early stop) into at most one FocusSession.
The 1-second tick is driven from outside (see app.rs); this type only keeps counts.
*/

use chrono::{DateTime, Duration, FixedOffset};
use serde::Serialize;
use uuid::Uuid;

use crate::models::FocusSession;

// Early stops shorter than this are thrown away
pub const MIN_RECORDED_SECS: i64 = 60;
// Longest countdown a run may be configured to
pub const MAX_RUN_MIN: i64 = 24 * 60;
const MAX_RUN_SECS: i64 = MAX_RUN_MIN * 60;

// What the run is attributed to; absent for free focus
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct FocusContext {
    pub goal_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub subtask_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FocusTimer {
    pub run_id: Uuid,
    pub context: FocusContext,
    pub configured_secs: i64,
    pub remaining_secs: i64,
    pub started_at: DateTime<FixedOffset>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running,
    Expired,
}

// Nearest whole minute, halves rounded up
fn round_minutes(secs: i64) -> i64 {
    (secs as f64 / 60.0).round() as i64
}

impl FocusTimer {
    pub fn start(
        duration_min: i64,
        context: FocusContext,
        note: Option<String>,
        now: DateTime<FixedOffset>,
    ) -> Self {
        let secs = duration_min.saturating_mul(60).clamp(0, MAX_RUN_SECS);
        Self {
            run_id: Uuid::new_v4(),
            context,
            configured_secs: secs,
            remaining_secs: secs,
            started_at: now,
            note,
        }
    }

    pub fn elapsed_secs(&self) -> i64 {
        self.configured_secs - self.remaining_secs
    }

    pub fn tick(&mut self) -> Tick {
        self.remaining_secs = (self.remaining_secs - 1).max(0);
        if self.remaining_secs == 0 {
            Tick::Expired
        } else {
            Tick::Running
        }
    }

    /// Lengthen or shorten the running countdown.
    ///
    /// The configured length stays between one minute and [`MAX_RUN_MIN`]
    /// and the remaining time never goes negative, so an adjust can expire
    /// the run on the next tick.
    pub fn adjust(&mut self, delta_min: i64) {
        let elapsed = self.elapsed_secs();
        let configured = self
            .configured_secs
            .saturating_add(delta_min.saturating_mul(60))
            .clamp(MIN_RECORDED_SECS, MAX_RUN_SECS);
        self.configured_secs = configured.max(elapsed);
        self.remaining_secs = self.configured_secs - elapsed;
    }

    // Countdown reached zero: the whole configured length counts
    pub fn finish(self, now: DateTime<FixedOffset>) -> Option<FocusSession> {
        let secs = self.configured_secs;
        self.into_session(secs, now)
    }

    // Stopped early: only elapsed time counts, under a minute is discarded
    pub fn stop(self, now: DateTime<FixedOffset>) -> Option<FocusSession> {
        let elapsed = self.elapsed_secs();
        if elapsed < MIN_RECORDED_SECS {
            return None;
        }
        self.into_session(elapsed, now)
    }

    fn into_session(self, secs: i64, now: DateTime<FixedOffset>) -> Option<FocusSession> {
        let duration_min = round_minutes(secs);
        if duration_min < 1 {
            return None;
        }
        Some(FocusSession {
            id: self.run_id,
            goal_id: self.context.goal_id,
            task_id: self.context.task_id,
            subtask_id: self.context.subtask_id,
            start_time: now - Duration::seconds(secs),
            end_time: now,
            duration_min,
            note: self.note,
        })
    }
}
