// --------------------------------------------------
// Handles API endpoints for the goal tree.
//
// Responsibilities:
// - Create / read / update / delete goals, tasks and subtasks
// - Toggle subtask completion
// - Reject invalid input before it reaches the store
// -------------------------------------------------

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::{AppError, AppResult};
use crate::logic;
use crate::models::{
    now_fixed_offset, Goal, GoalColor, GoalPatch, SubtaskPatch, TaskPatch, TaskSpec, TaskType,
};

#[derive(Debug, Serialize)]
pub struct GoalView {
    #[serde(flatten)]
    pub goal: Goal,
    pub progress: i64, // 0..=100
}

fn require_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::invalid("title required"));
    }
    Ok(())
}

fn require_positive_target(target: Option<i64>) -> AppResult<()> {
    match target {
        Some(m) if m <= 0 => Err(AppError::invalid("target_duration_min must be positive")),
        _ => Ok(()),
    }
}

// -----------------------------
// GET /api/goals
// All goals in display order, with rollup progress
// -----------------------------
pub async fn get_goals(State(state): State<AppState>) -> impl IntoResponse {
    let goals = state.tracker.lock().await.goals().snapshot();
    let views: Vec<GoalView> = goals
        .iter()
        .map(|g| GoalView {
            progress: logic::goal_progress(g),
            goal: g.clone(),
        })
        .collect();
    Json(views)
}

#[derive(Debug, Deserialize)]
pub struct CreateGoalInput {
    pub title: String,
    pub description: Option<String>,
    pub color: GoalColor,
}

// -----------------------------
// POST /api/goals
// -----------------------------
pub async fn create_goal(
    State(state): State<AppState>,
    Json(input): Json<CreateGoalInput>,
) -> AppResult<impl IntoResponse> {
    require_title(&input.title)?;
    let goal = state.tracker.lock().await.edit_goals(|g| {
        Ok(g.create_goal(input.title, input.description, input.color, now_fixed_offset()))
    })?;
    tracing::info!(goal_id = %goal.id, "goal created");
    Ok((StatusCode::CREATED, Json(goal)))
}

// -----------------------------
// PUT /api/goals/:id
// -----------------------------
pub async fn update_goal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<GoalPatch>,
) -> AppResult<impl IntoResponse> {
    if let Some(title) = &patch.title {
        require_title(title)?;
    }
    let goal = state.tracker.lock().await.edit_goals(|g| g.update_goal(id, patch))?;
    Ok(Json(goal))
}

// -----------------------------
// DELETE /api/goals/:id
// Focus sessions that reference the goal are kept
// -----------------------------
pub async fn delete_goal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.tracker.lock().await.edit_goals(|g| g.delete_goal(id))?;
    tracing::info!(goal_id = %id, "goal deleted");
    Ok(Json(serde_json::json!({ "ok": true })))
}

// -----------------------------
// POST /api/goals/:goal_id/tasks
// Time tasks need a positive target; count tasks take none
// -----------------------------
pub async fn create_task(
    State(state): State<AppState>,
    Path(goal_id): Path<Uuid>,
    Json(spec): Json<TaskSpec>,
) -> AppResult<impl IntoResponse> {
    require_title(&spec.title)?;
    match spec.task_type {
        TaskType::Time => {
            if spec.target_duration_min.is_none() {
                return Err(AppError::invalid("time task requires target_duration_min"));
            }
            require_positive_target(spec.target_duration_min)?;
        }
        TaskType::Count => {
            if spec.target_duration_min.is_some() || spec.period.is_some() {
                return Err(AppError::invalid("count task takes no target or period"));
            }
        }
    }

    let task = state
        .tracker
        .lock()
        .await
        .edit_goals(|g| g.create_task(goal_id, spec))?;
    Ok((StatusCode::CREATED, Json(task)))
}

// -----------------------------
// PUT /api/goals/:goal_id/tasks/:task_id
// Same shape rules as create: no target or period on a count task
// -----------------------------
pub async fn update_task(
    State(state): State<AppState>,
    Path((goal_id, task_id)): Path<(Uuid, Uuid)>,
    Json(patch): Json<TaskPatch>,
) -> AppResult<impl IntoResponse> {
    if let Some(title) = &patch.title {
        require_title(title)?;
    }
    require_positive_target(patch.target_duration_min)?;

    let mut tracker = state.tracker.lock().await;
    let goals = tracker.goals().snapshot();
    let current = goals
        .iter()
        .find(|g| g.id == goal_id)
        .ok_or(AppError::NotFound("goal"))?
        .task(task_id)
        .ok_or(AppError::NotFound("task"))?;
    if current.task_type == TaskType::Count
        && (patch.target_duration_min.is_some() || patch.period.is_some())
    {
        return Err(AppError::invalid("count task takes no target or period"));
    }

    let task = tracker.edit_goals(|g| g.update_task(goal_id, task_id, patch))?;
    Ok(Json(task))
}

// -----------------------------
// DELETE /api/goals/:goal_id/tasks/:task_id
// -----------------------------
pub async fn delete_task(
    State(state): State<AppState>,
    Path((goal_id, task_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    state
        .tracker
        .lock()
        .await
        .edit_goals(|g| g.delete_task(goal_id, task_id))?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct CreateSubtaskInput {
    pub title: String,
}

// -----------------------------
// POST /api/goals/:goal_id/tasks/:task_id/subtasks
// -----------------------------
pub async fn create_subtask(
    State(state): State<AppState>,
    Path((goal_id, task_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<CreateSubtaskInput>,
) -> AppResult<impl IntoResponse> {
    require_title(&input.title)?;
    let sub = state
        .tracker
        .lock()
        .await
        .edit_goals(|g| g.create_subtask(goal_id, task_id, input.title))?;
    Ok((StatusCode::CREATED, Json(sub)))
}

// -----------------------------
// PUT /api/goals/:goal_id/tasks/:task_id/subtasks/:subtask_id
// -----------------------------
pub async fn update_subtask(
    State(state): State<AppState>,
    Path((goal_id, task_id, subtask_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(patch): Json<SubtaskPatch>,
) -> AppResult<impl IntoResponse> {
    if let Some(title) = &patch.title {
        require_title(title)?;
    }
    let sub = state
        .tracker
        .lock()
        .await
        .edit_goals(|g| g.update_subtask(goal_id, task_id, subtask_id, patch))?;
    Ok(Json(sub))
}

// -----------------------------
// DELETE /api/goals/:goal_id/tasks/:task_id/subtasks/:subtask_id
// -----------------------------
pub async fn delete_subtask(
    State(state): State<AppState>,
    Path((goal_id, task_id, subtask_id)): Path<(Uuid, Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    state
        .tracker
        .lock()
        .await
        .edit_goals(|g| g.delete_subtask(goal_id, task_id, subtask_id))?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// -----------------------------
// POST /api/goals/:goal_id/tasks/:task_id/subtasks/:subtask_id/toggle
// Flips done / not done and stamps the toggle time
// -----------------------------
pub async fn toggle_subtask(
    State(state): State<AppState>,
    Path((goal_id, task_id, subtask_id)): Path<(Uuid, Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let sub = state.tracker.lock().await.edit_goals(|g| {
        g.toggle_subtask_completion(goal_id, task_id, subtask_id, now_fixed_offset())
    })?;
    Ok(Json(sub))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{App, Tracker};
    use crate::store::Storage;
    use axum::body::to_bytes;
    use axum::response::Response;

    fn state(dir: &tempfile::TempDir) -> AppState {
        App::new(Tracker::load(Storage::new(dir.path()), None).unwrap())
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn time_spec(target: Option<i64>) -> TaskSpec {
        TaskSpec {
            title: "Practice".into(),
            task_type: TaskType::Time,
            target_duration_min: target,
            period: None,
        }
    }

    async fn new_goal(state: &AppState) -> Uuid {
        let input = CreateGoalInput {
            title: "Learn piano".into(),
            description: None,
            color: GoalColor::Pink,
        };
        let resp = create_goal(State(state.clone()), Json(input)).await.into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let v = body_json(resp).await;
        Uuid::parse_str(v["id"].as_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn empty_title_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = CreateGoalInput {
            title: "   ".into(),
            description: None,
            color: GoalColor::Blue,
        };
        let resp = create_goal(State(state(&dir)), Json(input)).await.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn time_task_needs_positive_target() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let goal_id = new_goal(&state).await;

        for bad in [None, Some(0), Some(-5)] {
            let resp = create_task(State(state.clone()), Path(goal_id), Json(time_spec(bad)))
                .await
                .into_response();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }

        let resp = create_task(State(state.clone()), Path(goal_id), Json(time_spec(Some(30))))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn goal_listing_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let goal_id = new_goal(&state).await;

        let spec = TaskSpec {
            title: "Pieces".into(),
            task_type: TaskType::Count,
            target_duration_min: None,
            period: None,
        };
        let task = body_json(create_task(State(state.clone()), Path(goal_id), Json(spec)).await.into_response()).await;
        let task_id = Uuid::parse_str(task["id"].as_str().unwrap()).unwrap();

        let mut sub_ids = Vec::new();
        for title in ["Minuet", "Prelude"] {
            let input = CreateSubtaskInput { title: title.into() };
            let resp = create_subtask(State(state.clone()), Path((goal_id, task_id)), Json(input))
                .await
                .into_response();
            let v = body_json(resp).await;
            sub_ids.push(Uuid::parse_str(v["id"].as_str().unwrap()).unwrap());
        }

        let resp = toggle_subtask(State(state.clone()), Path((goal_id, task_id, sub_ids[0])))
            .await
            .into_response();
        assert_eq!(body_json(resp).await["is_completed"], true);

        let v = body_json(get_goals(State(state.clone())).await.into_response()).await;
        assert_eq!(v[0]["progress"], 50);
        assert_eq!(v[0]["title"], "Learn piano");
    }

    #[tokio::test]
    async fn count_task_rejects_time_fields_on_update() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let goal_id = new_goal(&state).await;

        let spec = TaskSpec {
            title: "Pieces".into(),
            task_type: TaskType::Count,
            target_duration_min: None,
            period: None,
        };
        let task = body_json(create_task(State(state.clone()), Path(goal_id), Json(spec)).await.into_response()).await;
        let task_id = Uuid::parse_str(task["id"].as_str().unwrap()).unwrap();

        let patches = [
            TaskPatch {
                target_duration_min: Some(30),
                ..TaskPatch::default()
            },
            TaskPatch {
                period: Some(crate::models::Period::Week),
                ..TaskPatch::default()
            },
        ];
        for patch in patches {
            let resp = update_task(State(state.clone()), Path((goal_id, task_id)), Json(patch))
                .await
                .into_response();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }

        let rename = TaskPatch {
            title: Some("Etudes".into()),
            ..TaskPatch::default()
        };
        let resp = update_task(State(state.clone()), Path((goal_id, task_id)), Json(rename))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["title"], "Etudes");
    }

    #[tokio::test]
    async fn missing_goal_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let resp = delete_goal(State(state(&dir)), Path(Uuid::new_v4()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
