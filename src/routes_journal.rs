// --------------------------------------------------
// Handles API endpoints for daily logs and the user profile.
// -------------------------------------------------

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{DailyLog, UserProfile};

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub date: Option<String>, // "YYYY-MM-DD"; all logs when absent
}

// GET /api/logs[?date=YYYY-MM-DD]
pub async fn get_logs(
    State(state): State<AppState>,
    Query(q): Query<LogsQuery>,
) -> AppResult<impl IntoResponse> {
    let tracker = state.tracker.lock().await;
    let logs: Vec<DailyLog> = match q.date {
        Some(raw) => {
            let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_| AppError::invalid("invalid date"))?;
            tracker.ledger().log_for(date).into_iter().collect()
        }
        None => (*tracker.ledger().logs()).clone(),
    };
    Ok(Json(logs))
}

// PUT /api/logs
// Replaces the whole entry for that date
pub async fn put_log(
    State(state): State<AppState>,
    Json(log): Json<DailyLog>,
) -> AppResult<impl IntoResponse> {
    let saved = log.clone();
    state.tracker.lock().await.edit_ledger(|l| {
        l.upsert_log(log);
        Ok(())
    })?;
    Ok(Json(saved))
}

// GET /api/profile
pub async fn get_profile(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.tracker.lock().await.profile().clone())
}

// PUT /api/profile
pub async fn put_profile(
    State(state): State<AppState>,
    Json(profile): Json<UserProfile>,
) -> AppResult<impl IntoResponse> {
    if profile.name.trim().is_empty() {
        return Err(AppError::invalid("name required"));
    }
    if profile.language.trim().is_empty() {
        return Err(AppError::invalid("language required"));
    }
    state.tracker.lock().await.set_profile(profile.clone());
    Ok(Json(profile))
}
