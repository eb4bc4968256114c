use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Target assumed for a time task that somehow lost its target
pub const DEFAULT_TARGET_MIN: i64 = 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalColor {
    Blue,
    Green,
    Orange,
    Pink,
    Purple,
    Red,
    Teal,
    Yellow,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Time,
    Count,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub color: GoalColor,
    pub tasks: Vec<Task>,
}

impl Goal {
    pub fn task(&self, task_id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }
}

// A task is either time-bound (target + period) or count-bound (subtasks).
// `task_type` decides which of the two is active.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub target_duration_min: Option<i64>,
    pub period: Option<Period>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<FixedOffset>>,
    pub total_time_spent: i64, // minutes
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subtask {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub title: String,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<FixedOffset>>,
    pub total_time_spent: i64, // minutes
}

// One finished focus run. Never edited after it is appended.
// goal_id / task_id are empty for free focus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FocusSession {
    pub id: Uuid,
    pub goal_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub subtask_id: Option<Uuid>,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub duration_min: i64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyLog {
    pub date: NaiveDate,
    pub mood: Option<String>,
    pub journal: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub name: String,
    pub avatar: Option<String>, // data url
    pub language: String,       // "en", "zh", ...
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "Focuser".to_string(),
            avatar: None,
            language: "en".to_string(),
        }
    }
}

// Task shape as accepted by the store. Validated at the HTTP boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSpec {
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub target_duration_min: Option<i64>,
    pub period: Option<Period>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<GoalColor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub target_duration_min: Option<i64>,
    pub period: Option<Period>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubtaskPatch {
    pub title: Option<String>,
}

// Local wall clock with its current offset
pub fn now_fixed_offset() -> DateTime<FixedOffset> {
    chrono::Local::now().fixed_offset()
}
