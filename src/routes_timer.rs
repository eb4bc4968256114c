// --------------------------------------------------
// Handles API endpoints for the focus timer and the session log.
//
// Responsibilities:
// - Start / adjust / stop the single focus countdown
// - List recorded sessions for a day
// -------------------------------------------------

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::{AppError, AppResult};
use crate::models::FocusSession;
use crate::timer::{FocusContext, FocusTimer, MAX_RUN_MIN};

#[derive(Debug, Serialize)]
pub struct TimerResponse {
    pub active: bool,
    pub timer: Option<FocusTimer>,
}

// -----------------------------
// GET /api/timer
// -----------------------------
pub async fn get_timer(State(state): State<AppState>) -> impl IntoResponse {
    let timer = state.timer_status().await;
    Json(TimerResponse {
        active: timer.is_some(),
        timer,
    })
}

#[derive(Debug, Deserialize)]
pub struct StartTimerInput {
    pub duration_min: i64,
    pub goal_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub subtask_id: Option<Uuid>,
    pub note: Option<String>,
}

// -----------------------------
// POST /api/timer/start
// No goal/task = free focus; a goal needs a task
// -----------------------------
pub async fn start_timer(
    State(state): State<AppState>,
    Json(input): Json<StartTimerInput>,
) -> AppResult<impl IntoResponse> {
    if !(1..=MAX_RUN_MIN).contains(&input.duration_min) {
        return Err(AppError::invalid(format!("duration_min must be 1..={MAX_RUN_MIN}")));
    }
    if input.subtask_id.is_some() && input.task_id.is_none() {
        return Err(AppError::invalid("subtask_id requires task_id"));
    }
    if input.goal_id.is_some() && input.task_id.is_none() {
        return Err(AppError::invalid("goal_id requires task_id"));
    }

    let context = FocusContext {
        goal_id: input.goal_id,
        task_id: input.task_id,
        subtask_id: input.subtask_id,
    };
    let timer = state.start_timer(input.duration_min, context, input.note).await?;
    Ok((StatusCode::CREATED, Json(timer)))
}

#[derive(Debug, Deserialize)]
pub struct AdjustTimerInput {
    pub delta_min: i64,
}

// -----------------------------
// POST /api/timer/adjust
// -----------------------------
pub async fn adjust_timer(
    State(state): State<AppState>,
    Json(input): Json<AdjustTimerInput>,
) -> AppResult<impl IntoResponse> {
    if !(-MAX_RUN_MIN..=MAX_RUN_MIN).contains(&input.delta_min) {
        return Err(AppError::invalid(format!("delta_min must be within ±{MAX_RUN_MIN}")));
    }
    Ok(Json(state.adjust_timer(input.delta_min).await?))
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub recorded: bool,
    pub session: Option<FocusSession>,
}

// -----------------------------
// POST /api/timer/stop
// Runs under a minute are dropped without a session
// -----------------------------
pub async fn stop_timer(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let session = state.stop_timer().await?;
    Ok(Json(StopResponse {
        recorded: session.is_some(),
        session,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    pub date: String, // "YYYY-MM-DD"
}

// -----------------------------
// GET /api/sessions?date=YYYY-MM-DD
// -----------------------------
pub async fn get_sessions(
    State(state): State<AppState>,
    Query(q): Query<SessionsQuery>,
) -> AppResult<impl IntoResponse> {
    let date = NaiveDate::parse_from_str(&q.date, "%Y-%m-%d")
        .map_err(|_| AppError::invalid("invalid date"))?;
    let sessions = state.tracker.lock().await.ledger().sessions_on(date);
    Ok(Json(sessions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{App, Tracker};
    use crate::store::Storage;

    fn state(dir: &tempfile::TempDir) -> AppState {
        App::new(Tracker::load(Storage::new(dir.path()), None).unwrap())
    }

    fn start_input(duration_min: i64) -> StartTimerInput {
        StartTimerInput {
            duration_min,
            goal_id: None,
            task_id: None,
            subtask_id: None,
            note: None,
        }
    }

    #[tokio::test]
    async fn zero_length_run_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let resp = start_timer(State(state(&dir)), Json(start_input(0)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn out_of_range_lengths_are_400() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);

        for bad in [MAX_RUN_MIN + 1, i64::MAX / 2] {
            let resp = start_timer(State(state.clone()), Json(start_input(bad)))
                .await
                .into_response();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }

        let resp = start_timer(State(state.clone()), Json(start_input(25)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);

        for delta_min in [MAX_RUN_MIN + 1, i64::MAX / 2, i64::MIN] {
            let resp = adjust_timer(State(state.clone()), Json(AdjustTimerInput { delta_min }))
                .await
                .into_response();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
        let timer = state.timer_status().await.unwrap();
        assert_eq!(timer.configured_secs, 25 * 60);
    }

    #[tokio::test]
    async fn goal_only_run_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let input = StartTimerInput {
            goal_id: Some(Uuid::new_v4()),
            ..start_input(25)
        };
        let resp = start_timer(State(state(&dir)), Json(input)).await.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn start_adjust_stop_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);

        let resp = start_timer(State(state.clone()), Json(start_input(25)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = start_timer(State(state.clone()), Json(start_input(25)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let adjusted = state.adjust_timer(5).await.unwrap();
        assert_eq!(adjusted.configured_secs, 30 * 60);

        let resp = stop_timer(State(state.clone())).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = stop_timer(State(state.clone())).await.into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn bad_date_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let q = SessionsQuery {
            date: "2026/10/14".into(),
        };
        let resp = get_sessions(State(state(&dir)), Query(q)).await.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
