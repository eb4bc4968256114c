/*
Application state shared by all handlers.
Tracker owns the goal tree, the ledger and the profile; every write goes
through it and is persisted right after (failures are logged, not returned).
*/

use std::sync::Arc;

use tokio::{sync::Mutex, task::JoinHandle, time};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::goals::GoalStore;
use crate::ledger::SessionLedger;
use crate::logic::WeekStart;
use crate::models::{now_fixed_offset, FocusSession, UserProfile};
use crate::store::{Storage, DAILY_LOGS_KEY, GOALS_KEY, PROFILE_KEY, SESSIONS_KEY};
use crate::timer::{FocusContext, FocusTimer, Tick};

pub type AppState = Arc<App>;

#[derive(Debug)]
pub struct Tracker {
    goals: GoalStore,
    ledger: SessionLedger,
    profile: UserProfile,
    storage: Storage,
    week_start: Option<WeekStart>,
}

impl Tracker {
    pub fn load(storage: Storage, week_start: Option<WeekStart>) -> AppResult<Self> {
        let loaded = storage.load_all()?;
        info!(
            goals = loaded.goals.len(),
            sessions = loaded.sessions.len(),
            logs = loaded.logs.len(),
            "state loaded"
        );
        Ok(Self {
            goals: GoalStore::new(loaded.goals),
            ledger: SessionLedger::new(loaded.sessions, loaded.logs),
            profile: loaded.profile,
            storage,
            week_start,
        })
    }

    pub fn goals(&self) -> &GoalStore {
        &self.goals
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    // Configured override first, then the profile language
    pub fn week_start(&self) -> WeekStart {
        self.week_start
            .unwrap_or_else(|| WeekStart::for_language(&self.profile.language))
    }

    fn persist<T: serde::Serialize>(&self, key: &str, value: &T) {
        match self.storage.save(key, value) {
            Ok(()) => debug!(key, "persisted"),
            Err(e) => warn!(key, error = %e, "persist failed; keeping in-memory state"),
        }
    }

    /// Run a store mutation and persist the goal collection if it succeeded.
    pub fn edit_goals<T>(&mut self, f: impl FnOnce(&mut GoalStore) -> AppResult<T>) -> AppResult<T> {
        let out = f(&mut self.goals)?;
        self.persist(GOALS_KEY, &*self.goals.snapshot());
        Ok(out)
    }

    pub fn edit_ledger<T>(&mut self, f: impl FnOnce(&mut SessionLedger) -> AppResult<T>) -> AppResult<T> {
        let out = f(&mut self.ledger)?;
        self.persist(SESSIONS_KEY, &*self.ledger.sessions());
        self.persist(DAILY_LOGS_KEY, &*self.ledger.logs());
        Ok(out)
    }

    pub fn set_profile(&mut self, profile: UserProfile) {
        self.profile = profile;
        self.persist(PROFILE_KEY, &self.profile);
    }

    /// Append a finished session and update the cached rollups.
    ///
    /// The session is kept even when its goal or task has been deleted.
    pub fn complete_session(&mut self, session: FocusSession) -> AppResult<()> {
        let now = now_fixed_offset();
        self.ledger.append(session.clone())?;
        self.persist(SESSIONS_KEY, &*self.ledger.sessions());

        let rolled_up = self.goals.record_session_rollup(&session, now);
        if rolled_up {
            self.persist(GOALS_KEY, &*self.goals.snapshot());
        }
        info!(
            session_id = %session.id,
            duration_min = session.duration_min,
            rolled_up,
            "focus session recorded"
        );
        Ok(())
    }
}

#[derive(Debug)]
struct ActiveRun {
    timer: FocusTimer,
    ticker: JoinHandle<()>,
}

#[derive(Debug)]
pub struct App {
    pub tracker: Mutex<Tracker>,
    timer: Mutex<Option<ActiveRun>>,
}

impl App {
    pub fn new(tracker: Tracker) -> AppState {
        Arc::new(Self {
            tracker: Mutex::new(tracker),
            timer: Mutex::new(None),
        })
    }

    pub async fn timer_status(&self) -> Option<FocusTimer> {
        self.timer.lock().await.as_ref().map(|r| r.timer.clone())
    }

    /// Start a countdown. Only one may run at a time.
    pub async fn start_timer(
        self: &Arc<Self>,
        duration_min: i64,
        context: FocusContext,
        note: Option<String>,
    ) -> AppResult<FocusTimer> {
        // free focus carries no ids at all; a goal alone can't be attributed
        if context.goal_id.is_some() && context.task_id.is_none() {
            return Err(AppError::invalid("goal_id requires task_id"));
        }
        if let Some(task_id) = context.task_id {
            let goal_id = context.goal_id.ok_or_else(|| AppError::invalid("task_id requires goal_id"))?;
            let tracker = self.tracker.lock().await;
            let goals = tracker.goals().snapshot();
            let goal = goals
                .iter()
                .find(|g| g.id == goal_id)
                .ok_or(AppError::NotFound("goal"))?;
            let task = goal.task(task_id).ok_or(AppError::NotFound("task"))?;
            if let Some(sub_id) = context.subtask_id {
                if !task.subtasks.iter().any(|s| s.id == sub_id) {
                    return Err(AppError::NotFound("subtask"));
                }
            }
        }

        let mut slot = self.timer.lock().await;
        if slot.is_some() {
            return Err(AppError::TimerActive);
        }

        let timer = FocusTimer::start(duration_min, context, note, now_fixed_offset());
        let ticker = tokio::spawn(run_ticker(Arc::clone(self), timer.run_id));
        info!(run_id = %timer.run_id, duration_min, "focus run started");
        *slot = Some(ActiveRun {
            timer: timer.clone(),
            ticker,
        });
        Ok(timer)
    }

    pub async fn adjust_timer(&self, delta_min: i64) -> AppResult<FocusTimer> {
        let mut slot = self.timer.lock().await;
        let run = slot.as_mut().ok_or(AppError::TimerIdle)?;
        run.timer.adjust(delta_min);
        Ok(run.timer.clone())
    }

    /// Stop early. Returns the recorded session, or `None` when the run was
    /// too short to keep.
    pub async fn stop_timer(&self) -> AppResult<Option<FocusSession>> {
        let run = self.timer.lock().await.take().ok_or(AppError::TimerIdle)?;
        run.ticker.abort();

        let Some(session) = run.timer.stop(now_fixed_offset()) else {
            info!("focus run stopped under a minute; discarded");
            return Ok(None);
        };
        self.tracker.lock().await.complete_session(session.clone())?;
        Ok(Some(session))
    }

    async fn expire(&self, run_id: Uuid) -> bool {
        let mut slot = self.timer.lock().await;
        let Some(run) = slot.as_mut().filter(|r| r.timer.run_id == run_id) else {
            return true;
        };
        if run.timer.tick() == Tick::Running {
            return false;
        }

        let Some(run) = slot.take() else { return true };
        drop(slot);
        if let Some(session) = run.timer.finish(now_fixed_offset()) {
            if let Err(e) = self.tracker.lock().await.complete_session(session) {
                warn!(error = %e, "could not record finished run");
            }
        }
        true
    }
}

// 1-second countdown for one run; exits once the run is gone or expired
async fn run_ticker(app: AppState, run_id: Uuid) {
    let mut interval = time::interval(time::Duration::from_secs(1));
    interval.tick().await;
    loop {
        interval.tick().await;
        if app.expire(run_id).await {
            debug!(%run_id, "ticker finished");
            return;
        }
    }
}
