// Define data modules
mod app; // Shared state: tracker (goals + ledger + profile) and the focus timer
mod config; // Server configuration from env
mod error; // AppError and its HTTP mapping
mod goals; // Goal / task / subtask tree and session rollups
mod ledger; // Append-only focus sessions and daily logs
mod logic; // Progress aggregation (pure)
mod models; // Data structures (Goal, Task, FocusSession, etc.)
mod routes_goals; // HTTP handlers for the goal tree
mod routes_journal; // HTTP handlers for daily logs and profile
mod routes_stats; // HTTP handlers for statistics and calendar
mod routes_timer; // HTTP handlers for the timer and sessions
mod store; // Persistent storage (one JSON file per collection)
mod timer; // Focus countdown -> FocusSession

// Import axum routing utilities and Router
use axum::{
    routing::{get, post, put}, // HTTP method helpers
    Router, // Main router type
};
use tower_http::services::ServeDir; // Used to serve static files (HTML/CSS/JS)
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::app::{App, AppState, Tracker};
use crate::config::Config;
use crate::store::Storage;

fn router(state: AppState, static_dir: &std::path::Path) -> Router {
    let api = Router::new()
        // goals
        .route("/goals", get(routes_goals::get_goals).post(routes_goals::create_goal))
        .route("/goals/:id", put(routes_goals::update_goal).delete(routes_goals::delete_goal))
        .route("/goals/:goal_id/tasks", post(routes_goals::create_task))
        .route(
            "/goals/:goal_id/tasks/:task_id",
            put(routes_goals::update_task).delete(routes_goals::delete_task),
        )
        .route("/goals/:goal_id/tasks/:task_id/subtasks", post(routes_goals::create_subtask))
        .route(
            "/goals/:goal_id/tasks/:task_id/subtasks/:subtask_id",
            put(routes_goals::update_subtask).delete(routes_goals::delete_subtask),
        )
        .route(
            "/goals/:goal_id/tasks/:task_id/subtasks/:subtask_id/toggle",
            post(routes_goals::toggle_subtask),
        )
        // timer & sessions
        .route("/timer", get(routes_timer::get_timer))
        .route("/timer/start", post(routes_timer::start_timer))
        .route("/timer/adjust", post(routes_timer::adjust_timer))
        .route("/timer/stop", post(routes_timer::stop_timer))
        .route("/sessions", get(routes_timer::get_sessions))
        // statistics
        .route("/stats/period", get(routes_stats::get_period_stats))
        .route("/stats/day", get(routes_stats::get_day_stats))
        .route("/calendar", get(routes_stats::get_calendar))
        // journal & profile
        .route("/logs", get(routes_journal::get_logs).put(routes_journal::put_log))
        .route("/profile", get(routes_journal::get_profile).put(routes_journal::put_profile))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .nest_service("/", ServeDir::new(static_dir))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "focus tracker stopped");
        std::process::exit(1);
    }
}

async fn run() -> error::AppResult<()> {
    let cfg = Config::from_env()?;
    let tracker = Tracker::load(Storage::new(&cfg.data_dir), cfg.week_start)?;
    let app = router(App::new(tracker), &cfg.static_dir);

    // Print the link to the server
    info!("server running at http://{}", cfg.addr);
    info!(static_dir = %cfg.static_dir.display(), data_dir = %cfg.data_dir.display(), "serving");

    let listener = tokio::net::TcpListener::bind(cfg.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
