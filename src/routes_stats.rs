use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::{AppError, AppResult};
use crate::logic::{self, StatsRange};
use crate::models::now_fixed_offset;

fn parse_date(raw: Option<&str>) -> AppResult<NaiveDate> {
    match raw {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| AppError::invalid("invalid date")),
        None => Ok(now_fixed_offset().date_naive()),
    }
}

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub range: StatsRange,
    pub date: Option<String>, // "YYYY-MM-DD", defaults to today
}

// GET /api/stats/period?range=week|month|year&date=YYYY-MM-DD
pub async fn get_period_stats(
    State(state): State<AppState>,
    Query(q): Query<PeriodQuery>,
) -> AppResult<impl IntoResponse> {
    let reference = parse_date(q.date.as_deref())?;

    // snapshots are taken under the lock, the math runs without it
    let (goals, sessions, week_start) = {
        let tracker = state.tracker.lock().await;
        (
            tracker.goals().snapshot(),
            tracker.ledger().sessions(),
            tracker.week_start(),
        )
    };

    Ok(Json(logic::period_aggregate(
        &goals, &sessions, q.range, reference, week_start,
    )))
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: Option<String>,
}

// GET /api/stats/day?date=YYYY-MM-DD
pub async fn get_day_stats(
    State(state): State<AppState>,
    Query(q): Query<DayQuery>,
) -> AppResult<impl IntoResponse> {
    let day = parse_date(q.date.as_deref())?;
    let (goals, sessions) = {
        let tracker = state.tracker.lock().await;
        (tracker.goals().snapshot(), tracker.ledger().sessions())
    };
    Ok(Json(logic::daily_aggregate(&goals, &sessions, day)))
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

// GET /api/calendar?year=2026&month=10
// Heatmap cells for every day of the month
pub async fn get_calendar(
    State(state): State<AppState>,
    Query(q): Query<CalendarQuery>,
) -> AppResult<impl IntoResponse> {
    let today = now_fixed_offset().date_naive();
    let year = q.year.unwrap_or(today.year());
    let month = q.month.unwrap_or(today.month());
    if !(1..=12).contains(&month) {
        return Err(AppError::invalid("month must be 1..=12"));
    }

    let sessions = state.tracker.lock().await.ledger().sessions();
    Ok(Json(logic::calendar_month(&sessions, year, month)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{App, Tracker};
    use crate::models::{FocusSession, GoalColor, TaskSpec, TaskType};
    use crate::store::Storage;
    use axum::{body::to_bytes, http::StatusCode};
    use chrono::{Duration, FixedOffset, TimeZone};
    use uuid::Uuid;

    async fn json_of(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // One goal with a 60-minute time task and a 30-minute session on 2026-10-14,
    // then the task is deleted
    async fn seeded_with_deleted_task(dir: &tempfile::TempDir) -> AppState {
        let state = App::new(Tracker::load(Storage::new(dir.path()), None).unwrap());
        {
            let mut tracker = state.tracker.lock().await;
            let at = FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2026, 10, 14, 9, 0, 0)
                .unwrap();
            let goal = tracker
                .edit_goals(|g| Ok(g.create_goal("Write".into(), None, GoalColor::Orange, at)))
                .unwrap();
            let task = tracker
                .edit_goals(|g| {
                    g.create_task(
                        goal.id,
                        TaskSpec {
                            title: "Draft".into(),
                            task_type: TaskType::Time,
                            target_duration_min: Some(60),
                            period: None,
                        },
                    )
                })
                .unwrap();
            tracker
                .complete_session(FocusSession {
                    id: Uuid::new_v4(),
                    goal_id: Some(goal.id),
                    task_id: Some(task.id),
                    subtask_id: None,
                    start_time: at,
                    end_time: at + Duration::minutes(30),
                    duration_min: 30,
                    note: None,
                })
                .unwrap();
            tracker.edit_goals(|g| g.delete_task(goal.id, task.id)).unwrap();
        }
        state
    }

    #[tokio::test]
    async fn period_stats_tolerate_deleted_task() {
        let dir = tempfile::tempdir().unwrap();
        let state = seeded_with_deleted_task(&dir).await;

        let q = PeriodQuery {
            range: StatsRange::Week,
            date: Some("2026-10-14".into()),
        };
        let resp = get_period_stats(State(state), Query(q)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let v = json_of(resp).await;
        assert_eq!(v["total_focus_min"], 30);
        assert_eq!(v["per_goal_focus_min"].as_array().unwrap().len(), 0);
        assert_eq!(v["goal_increments"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn day_stats_keep_goal_of_deleted_task() {
        let dir = tempfile::tempdir().unwrap();
        let state = seeded_with_deleted_task(&dir).await;

        let q = DayQuery {
            date: Some("2026-10-14".into()),
        };
        let v = json_of(get_day_stats(State(state), Query(q)).await.into_response()).await;
        assert_eq!(v["total_min"], 30);
        assert_eq!(v["distribution"][0]["goal_title"], "Write");
        assert_eq!(v["goal_increments_percent"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn calendar_rejects_bad_month() {
        let dir = tempfile::tempdir().unwrap();
        let state = seeded_with_deleted_task(&dir).await;

        let q = CalendarQuery {
            year: Some(2026),
            month: Some(13),
        };
        let resp = get_calendar(State(state.clone()), Query(q)).await.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let q = CalendarQuery {
            year: Some(2026),
            month: Some(10),
        };
        let v = json_of(get_calendar(State(state), Query(q)).await.into_response()).await;
        assert_eq!(v.as_array().unwrap().len(), 31);
        assert_eq!(v[13]["total_min"], 30);
    }
}
