// Append-only focus session log plus per-day journal entries.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::{AppError, AppResult};
use crate::models::{DailyLog, FocusSession};

#[derive(Debug, Clone, Default)]
pub struct SessionLedger {
    sessions: Arc<Vec<FocusSession>>,
    logs: Arc<Vec<DailyLog>>,
}

impl SessionLedger {
    pub fn new(sessions: Vec<FocusSession>, logs: Vec<DailyLog>) -> Self {
        Self {
            sessions: Arc::new(sessions),
            logs: Arc::new(logs),
        }
    }

    pub fn sessions(&self) -> Arc<Vec<FocusSession>> {
        Arc::clone(&self.sessions)
    }

    pub fn logs(&self) -> Arc<Vec<DailyLog>> {
        Arc::clone(&self.logs)
    }

    /// Append a finished session.
    ///
    /// The timer never builds sessions shorter than a minute, so one showing
    /// up here is a caller bug and is rejected rather than dropped.
    pub fn append(&mut self, session: FocusSession) -> AppResult<()> {
        if session.duration_min < 1 {
            return Err(AppError::invalid(format!(
                "session {} has duration {} min, expected >= 1",
                session.id, session.duration_min
            )));
        }
        let mut next = (*self.sessions).clone();
        next.push(session);
        self.sessions = Arc::new(next);
        Ok(())
    }

    // Sessions that started on `date` (local calendar day), oldest first
    pub fn sessions_on(&self, date: NaiveDate) -> Vec<FocusSession> {
        let mut out: Vec<FocusSession> = self
            .sessions
            .iter()
            .filter(|s| s.start_time.date_naive() == date)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.start_time);
        out
    }

    // Whole-record replace keyed on date; fields are not merged
    pub fn upsert_log(&mut self, log: DailyLog) {
        let mut next = (*self.logs).clone();
        match next.iter_mut().find(|l| l.date == log.date) {
            Some(existing) => *existing = log,
            None => next.push(log),
        }
        self.logs = Arc::new(next);
    }

    pub fn log_for(&self, date: NaiveDate) -> Option<DailyLog> {
        self.logs.iter().find(|l| l.date == date).cloned()
    }
}
