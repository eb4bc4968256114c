/*
Goal / task / subtask tree.
Every mutation builds a fresh snapshot; snapshots already handed out never change.
Inputs are assumed validated by the HTTP layer.
*/

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    FocusSession, Goal, GoalColor, GoalPatch, Subtask, SubtaskPatch, Task, TaskPatch, TaskSpec,
    TaskType,
};

#[derive(Debug, Clone, Default)]
pub struct GoalStore {
    goals: Arc<Vec<Goal>>,
}

impl GoalStore {
    pub fn new(goals: Vec<Goal>) -> Self {
        Self {
            goals: Arc::new(goals),
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<Goal>> {
        Arc::clone(&self.goals)
    }

    // Copy the current tree, apply `f`, publish the copy only if `f` succeeded
    fn mutate<T>(&mut self, f: impl FnOnce(&mut Vec<Goal>) -> AppResult<T>) -> AppResult<T> {
        let mut next = (*self.goals).clone();
        let out = f(&mut next)?;
        self.goals = Arc::new(next);
        Ok(out)
    }

    pub fn create_goal(
        &mut self,
        title: String,
        description: Option<String>,
        color: GoalColor,
        now: DateTime<FixedOffset>,
    ) -> Goal {
        let goal = Goal {
            id: Uuid::new_v4(),
            title,
            description,
            created_at: now,
            color,
            tasks: Vec::new(),
        };
        let created = goal.clone();
        let mut next = (*self.goals).clone();
        next.push(goal);
        self.goals = Arc::new(next);
        created
    }

    pub fn update_goal(&mut self, id: Uuid, patch: GoalPatch) -> AppResult<Goal> {
        self.mutate(|goals| {
            let g = find_goal(goals, id)?;
            if let Some(title) = patch.title {
                g.title = title;
            }
            if patch.description.is_some() {
                g.description = patch.description;
            }
            if let Some(color) = patch.color {
                g.color = color;
            }
            Ok(g.clone())
        })
    }

    // Sessions pointing at the goal are left alone in the ledger
    pub fn delete_goal(&mut self, id: Uuid) -> AppResult<()> {
        self.mutate(|goals| {
            let before = goals.len();
            goals.retain(|g| g.id != id);
            if goals.len() == before {
                return Err(AppError::NotFound("goal"));
            }
            Ok(())
        })
    }

    pub fn create_task(&mut self, goal_id: Uuid, spec: TaskSpec) -> AppResult<Task> {
        self.mutate(|goals| {
            let g = find_goal(goals, goal_id)?;
            let is_time = spec.task_type == TaskType::Time;
            let task = Task {
                id: Uuid::new_v4(),
                parent_id: g.id,
                title: spec.title,
                task_type: spec.task_type,
                target_duration_min: if is_time { spec.target_duration_min } else { None },
                period: if is_time { spec.period } else { None },
                subtasks: Vec::new(),
                is_completed: false,
                completed_at: None,
                total_time_spent: 0,
            };
            g.tasks.push(task.clone());
            Ok(task)
        })
    }

    pub fn update_task(&mut self, goal_id: Uuid, task_id: Uuid, patch: TaskPatch) -> AppResult<Task> {
        self.mutate(|goals| {
            let t = find_task(goals, goal_id, task_id)?;
            if let Some(title) = patch.title {
                t.title = title;
            }
            if t.task_type == TaskType::Time {
                if patch.target_duration_min.is_some() {
                    t.target_duration_min = patch.target_duration_min;
                }
                if patch.period.is_some() {
                    t.period = patch.period;
                }
            }
            Ok(t.clone())
        })
    }

    pub fn delete_task(&mut self, goal_id: Uuid, task_id: Uuid) -> AppResult<()> {
        self.mutate(|goals| {
            let g = find_goal(goals, goal_id)?;
            let before = g.tasks.len();
            g.tasks.retain(|t| t.id != task_id);
            if g.tasks.len() == before {
                return Err(AppError::NotFound("task"));
            }
            Ok(())
        })
    }

    pub fn create_subtask(&mut self, goal_id: Uuid, task_id: Uuid, title: String) -> AppResult<Subtask> {
        self.mutate(|goals| {
            let t = find_task(goals, goal_id, task_id)?;
            let sub = Subtask {
                id: Uuid::new_v4(),
                parent_id: t.id,
                title,
                is_completed: false,
                completed_at: None,
                total_time_spent: 0,
            };
            t.subtasks.push(sub.clone());
            Ok(sub)
        })
    }

    pub fn update_subtask(
        &mut self,
        goal_id: Uuid,
        task_id: Uuid,
        subtask_id: Uuid,
        patch: SubtaskPatch,
    ) -> AppResult<Subtask> {
        self.mutate(|goals| {
            let s = find_subtask(goals, goal_id, task_id, subtask_id)?;
            if let Some(title) = patch.title {
                s.title = title;
            }
            Ok(s.clone())
        })
    }

    pub fn delete_subtask(&mut self, goal_id: Uuid, task_id: Uuid, subtask_id: Uuid) -> AppResult<()> {
        self.mutate(|goals| {
            let t = find_task(goals, goal_id, task_id)?;
            let before = t.subtasks.len();
            t.subtasks.retain(|s| s.id != subtask_id);
            if t.subtasks.len() == before {
                return Err(AppError::NotFound("subtask"));
            }
            Ok(())
        })
    }

    // The toggle instant is the only record of when a count unit was finished
    pub fn toggle_subtask_completion(
        &mut self,
        goal_id: Uuid,
        task_id: Uuid,
        subtask_id: Uuid,
        now: DateTime<FixedOffset>,
    ) -> AppResult<Subtask> {
        self.mutate(|goals| {
            let s = find_subtask(goals, goal_id, task_id, subtask_id)?;
            s.is_completed = !s.is_completed;
            s.completed_at = if s.is_completed { Some(now) } else { None };
            Ok(s.clone())
        })
    }

    /// Apply a finished session to the cached rollup fields.
    ///
    /// Returns `false` when the session's goal or task no longer exists; the
    /// tree is left untouched in that case. Subtask completion is never
    /// changed here, only its time counter.
    pub fn record_session_rollup(&mut self, session: &FocusSession, now: DateTime<FixedOffset>) -> bool {
        let (Some(goal_id), Some(task_id)) = (session.goal_id, session.task_id) else {
            return false;
        };

        self.mutate(|goals| {
            let t = find_task(goals, goal_id, task_id)?;
            t.total_time_spent += session.duration_min;

            if t.task_type == TaskType::Time {
                let target = t.target_duration_min.unwrap_or(crate::models::DEFAULT_TARGET_MIN);
                let done = t.total_time_spent >= target;
                if done && !t.is_completed {
                    t.completed_at = Some(now);
                }
                t.is_completed = done;
            }

            if let Some(sub_id) = session.subtask_id {
                if let Some(s) = t.subtasks.iter_mut().find(|s| s.id == sub_id) {
                    s.total_time_spent += session.duration_min;
                }
            }
            Ok(())
        })
        .is_ok()
    }
}

fn find_goal(goals: &mut [Goal], id: Uuid) -> AppResult<&mut Goal> {
    goals
        .iter_mut()
        .find(|g| g.id == id)
        .ok_or(AppError::NotFound("goal"))
}

fn find_task(goals: &mut [Goal], goal_id: Uuid, task_id: Uuid) -> AppResult<&mut Task> {
    find_goal(goals, goal_id)?
        .tasks
        .iter_mut()
        .find(|t| t.id == task_id)
        .ok_or(AppError::NotFound("task"))
}

fn find_subtask(
    goals: &mut [Goal],
    goal_id: Uuid,
    task_id: Uuid,
    subtask_id: Uuid,
) -> AppResult<&mut Subtask> {
    find_task(goals, goal_id, task_id)?
        .subtasks
        .iter_mut()
        .find(|s| s.id == subtask_id)
        .ok_or(AppError::NotFound("subtask"))
}
