/*
Progress aggregation logic.
Module was independently written from HTTP / Axum for testing.
Every function is pure: same goals + sessions + range in, same numbers out.
*/

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{FocusSession, Goal, Task, TaskType, DEFAULT_TARGET_MIN};

// Minutes at which a calendar day reaches full intensity (12h)
pub const INTENSITY_CEILING_MIN: f64 = 720.0;
// Any activity at all shows at least this intensity
pub const INTENSITY_FLOOR: f64 = 0.10;

pub const UNKNOWN_GOAL: &str = "Unknown";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatsRange {
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    Monday,
    Sunday,
}

impl WeekStart {
    // English locales start the week on Sunday, the rest on Monday
    pub fn for_language(language: &str) -> Self {
        if language.to_ascii_lowercase().starts_with("en") {
            WeekStart::Sunday
        } else {
            WeekStart::Monday
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GoalMinutes {
    pub goal_title: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GoalPercent {
    pub goal_title: String,
    pub percent: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GoalIncrement {
    pub goal_title: String,
    pub increment: i64,     // percent gained inside the range
    pub current_total: i64, // percent cumulative to date
}

// Year ranges fill the completion fields, week/month ranges fill goal_increments
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeriodAggregate {
    pub range: StatsRange,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_focus_min: i64,
    pub per_goal_focus_min: Vec<GoalMinutes>,
    pub completed_goals_count: usize,
    pub uncompleted_goals_progress: Vec<GoalPercent>,
    pub goal_increments: Vec<GoalIncrement>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyIncrement {
    pub goal_title: String,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub total_min: i64,
    pub distribution: Vec<GoalMinutes>,
    pub goal_increments_percent: Vec<DailyIncrement>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub total_min: i64,
    pub intensity: f64,
}

fn target_min(task: &Task) -> i64 {
    task.target_duration_min.unwrap_or(DEFAULT_TARGET_MIN).max(1)
}

fn ratio(part: i64, whole: i64) -> f64 {
    part as f64 / whole.max(1) as f64
}

fn to_percent(sum: f64, count: usize) -> i64 {
    (100.0 * sum / count.max(1) as f64).round() as i64
}

// Task-local completion in [0, 1] from the cached fields
pub fn task_ratio(task: &Task) -> f64 {
    match task.task_type {
        TaskType::Count => {
            if task.subtasks.is_empty() {
                return 0.0;
            }
            let done = task.subtasks.iter().filter(|s| s.is_completed).count();
            done as f64 / task.subtasks.len() as f64
        }
        TaskType::Time => ratio(task.total_time_spent, target_min(task)).min(1.0),
    }
}

/// Goal completion 0..=100: unweighted mean of its task ratios.
///
/// A goal without tasks is at 0.
pub fn goal_progress(goal: &Goal) -> i64 {
    let sum: f64 = goal.tasks.iter().map(task_ratio).sum();
    to_percent(sum, goal.tasks.len())
}

// Count tasks are judged by their subtasks, not by the cached flag.
// An empty checklist is never complete.
fn is_task_complete(task: &Task) -> bool {
    match task.task_type {
        TaskType::Count => !task.subtasks.is_empty() && task.subtasks.iter().all(|s| s.is_completed),
        TaskType::Time => task.is_completed,
    }
}

pub fn is_goal_fully_completed(goal: &Goal) -> bool {
    !goal.tasks.is_empty() && goal.tasks.iter().all(is_task_complete)
}

/// Inclusive first and last calendar day of `range` around `reference`.
pub fn resolve_range(range: StatsRange, reference: NaiveDate, week_start: WeekStart) -> (NaiveDate, NaiveDate) {
    match range {
        StatsRange::Week => {
            let back = match week_start {
                WeekStart::Monday => reference.weekday().num_days_from_monday(),
                WeekStart::Sunday => reference.weekday().num_days_from_sunday(),
            };
            let start = reference - Duration::days(back as i64);
            (start, start + Duration::days(6))
        }
        StatsRange::Month => {
            let start = reference.with_day(1).unwrap_or(reference);
            (start, last_day_of_month(start))
        }
        StatsRange::Year => {
            let year = reference.year();
            let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(reference);
            let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(reference);
            (start, end)
        }
    }
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (y, m) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

// Goal and task the session points at, if both still exist
fn resolve<'a>(goals: &'a [Goal], s: &FocusSession) -> Option<(&'a Goal, &'a Task)> {
    let goal = goals.iter().find(|g| Some(g.id) == s.goal_id)?;
    let task = goal.task(s.task_id?)?;
    Some((goal, task))
}

fn minutes_by_task<'a>(sessions: impl Iterator<Item = &'a FocusSession>) -> HashMap<Uuid, i64> {
    let mut out = HashMap::new();
    for s in sessions {
        if let Some(task_id) = s.task_id {
            *out.entry(task_id).or_insert(0) += s.duration_min;
        }
    }
    out
}

/// Focus totals and goal progress for the week / month / year containing
/// `reference`.
///
/// Sessions are kept when their local start date falls in the range. Orphaned
/// sessions count toward `total_focus_min` but toward no goal.
pub fn period_aggregate(
    goals: &[Goal],
    sessions: &[FocusSession],
    range: StatsRange,
    reference: NaiveDate,
    week_start: WeekStart,
) -> PeriodAggregate {
    let (start, end) = resolve_range(range, reference, week_start);
    let in_range = |d: NaiveDate| d >= start && d <= end;

    let filtered: Vec<&FocusSession> = sessions
        .iter()
        .filter(|s| in_range(s.start_time.date_naive()))
        .collect();

    let total_focus_min = filtered.iter().map(|s| s.duration_min).sum();

    let mut per_goal_focus_min: Vec<GoalMinutes> = goals
        .iter()
        .map(|g| GoalMinutes {
            goal_title: g.title.clone(),
            minutes: filtered
                .iter()
                .filter(|s| matches!(resolve(goals, s), Some((rg, _)) if rg.id == g.id))
                .map(|s| s.duration_min)
                .sum(),
        })
        .filter(|gm| gm.minutes > 0)
        .collect();
    // stable: ties keep goal order
    per_goal_focus_min.sort_by(|a, b| b.minutes.cmp(&a.minutes));

    let mut agg = PeriodAggregate {
        range,
        start,
        end,
        total_focus_min,
        per_goal_focus_min,
        completed_goals_count: 0,
        uncompleted_goals_progress: Vec::new(),
        goal_increments: Vec::new(),
    };

    match range {
        StatsRange::Year => {
            // all-time state, not scoped to the year
            for g in goals {
                if is_goal_fully_completed(g) {
                    agg.completed_goals_count += 1;
                } else {
                    agg.uncompleted_goals_progress.push(GoalPercent {
                        goal_title: g.title.clone(),
                        percent: goal_progress(g),
                    });
                }
            }
        }
        StatsRange::Week | StatsRange::Month => {
            let period_min = minutes_by_task(filtered.iter().copied());
            let all_time_min = minutes_by_task(sessions.iter());

            for g in goals {
                let mut inc_sum = 0.0;
                let mut total_sum = 0.0;

                for t in &g.tasks {
                    match t.task_type {
                        TaskType::Time => {
                            let target = target_min(t);
                            let period = period_min.get(&t.id).copied().unwrap_or(0);
                            let all = all_time_min.get(&t.id).copied().unwrap_or(0);
                            inc_sum += ratio(period, target).min(1.0);
                            total_sum += ratio(all, target).min(1.0);
                        }
                        TaskType::Count => {
                            let n = t.subtasks.len() as i64;
                            let done = t.subtasks.iter().filter(|s| s.is_completed);
                            let in_period = done
                                .clone()
                                .filter(|s| s.completed_at.is_some_and(|at| in_range(at.date_naive())))
                                .count() as i64;
                            inc_sum += ratio(in_period, n);
                            total_sum += ratio(done.count() as i64, n);
                        }
                    }
                }

                let increment = to_percent(inc_sum, g.tasks.len());
                let current_total = to_percent(total_sum, g.tasks.len());
                if increment > 0 || current_total > 0 {
                    agg.goal_increments.push(GoalIncrement {
                        goal_title: g.title.clone(),
                        increment,
                        current_total,
                    });
                }
            }
        }
    }

    agg
}

/// Focus on one local calendar day.
///
/// Unlike the period view, sessions whose goal is gone are surfaced under
/// [`UNKNOWN_GOAL`] instead of being dropped.
pub fn daily_aggregate(goals: &[Goal], sessions: &[FocusSession], day: NaiveDate) -> DailyAggregate {
    let mut distribution: Vec<GoalMinutes> = Vec::new();
    let mut increments: Vec<DailyIncrement> = Vec::new();
    let mut total_min = 0;

    for s in sessions.iter().filter(|s| s.start_time.date_naive() == day) {
        total_min += s.duration_min;

        let goal = goals.iter().find(|g| Some(g.id) == s.goal_id);
        let title = goal.map_or(UNKNOWN_GOAL, |g| g.title.as_str());
        match distribution.iter_mut().find(|d| d.goal_title == title) {
            Some(d) => d.minutes += s.duration_min,
            None => distribution.push(GoalMinutes {
                goal_title: title.to_string(),
                minutes: s.duration_min,
            }),
        }

        // time targets only; checklist tasks don't move this number
        let Some((g, t)) = resolve(goals, s) else { continue };
        if t.task_type != TaskType::Time {
            continue;
        }
        let Some(target) = t.target_duration_min.filter(|m| *m > 0) else {
            continue;
        };
        let pct = s.duration_min as f64 / target as f64 * 100.0;
        match increments.iter_mut().find(|i| i.goal_title == g.title) {
            Some(i) => i.percent += pct,
            None => increments.push(DailyIncrement {
                goal_title: g.title.clone(),
                percent: pct,
            }),
        }
    }

    DailyAggregate {
        date: day,
        total_min,
        distribution,
        goal_increments_percent: increments,
    }
}

/// Heatmap level for a day's focus minutes, in [0, 1].
pub fn calendar_intensity(minutes: i64) -> f64 {
    if minutes <= 0 {
        return 0.0;
    }
    (minutes as f64 / INTENSITY_CEILING_MIN).clamp(INTENSITY_FLOOR, 1.0)
}

// One entry per day of the month, empty days included
pub fn calendar_month(sessions: &[FocusSession], year: i32, month: u32) -> Vec<CalendarDay> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let last = last_day_of_month(first);

    let mut per_day: HashMap<NaiveDate, i64> = HashMap::new();
    for s in sessions {
        let d = s.start_time.date_naive();
        if d >= first && d <= last {
            *per_day.entry(d).or_insert(0) += s.duration_min;
        }
    }

    first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|date| {
            let total_min = per_day.get(&date).copied().unwrap_or(0);
            CalendarDay {
                date,
                total_min,
                intensity: calendar_intensity(total_min),
            }
        })
        .collect()
}
