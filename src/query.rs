//! Read-only views over a [`TaskStore`] for one calendar day.

use crate::store::TaskStore;
use crate::task::{Priority, Task};
use crate::time_math::minutes_to_pixels;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityFilter {
    #[default]
    All,
    Low,
    Medium,
    High,
}

impl PriorityFilter {
    pub fn admits(self, priority: Priority) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Low => priority == Priority::Low,
            PriorityFilter::Medium => priority == Priority::Medium,
            PriorityFilter::High => priority == Priority::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityFilter::All => "all",
            PriorityFilter::Low => "low",
            PriorityFilter::Medium => "medium",
            PriorityFilter::High => "high",
        }
    }
}

impl From<Priority> for PriorityFilter {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => PriorityFilter::Low,
            Priority::Medium => PriorityFilter::Medium,
            Priority::High => PriorityFilter::High,
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(PriorityFilter::All);
        }
        s.parse::<Priority>().map(PriorityFilter::from)
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// View state that narrows the day's tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleFilter {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub priority: PriorityFilter,
    #[serde(default)]
    pub show_completed: bool,
}

/// Tasks for `date` that pass `filter`, earliest start first.
pub fn visible_tasks(store: &TaskStore, date: NaiveDate, filter: &ScheduleFilter) -> Vec<Task> {
    let needle = filter.search.trim().to_lowercase();
    let mut tasks: Vec<Task> = store
        .iter()
        .filter(|task| task.scheduled_date == date)
        .filter(|task| filter.priority.admits(task.priority))
        .filter(|task| task.matches_search(&needle))
        .filter(|task| filter.show_completed || !task.completed)
        .cloned()
        .collect();
    tasks.sort_by_key(|task| task.start_time);
    tasks
}

/// Completed tasks for `date`, earliest start first. Whether they are shown
/// is up to the caller's "show completed" flag.
pub fn completed_tasks_for(store: &TaskStore, date: NaiveDate) -> Vec<Task> {
    let mut tasks: Vec<Task> = store
        .iter()
        .filter(|task| task.scheduled_date == date && task.completed)
        .cloned()
        .collect();
    tasks.sort_by_key(|task| task.start_time);
    tasks
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskLayout {
    pub top: i64,
    pub height: i64,
}

pub fn layout(task: &Task) -> TaskLayout {
    TaskLayout {
        top: minutes_to_pixels(task.start_time.minutes()),
        height: minutes_to_pixels(task.duration_minutes()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DaySummary {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub scheduled_minutes: i64,
}

pub fn day_summary(store: &TaskStore, date: NaiveDate) -> DaySummary {
    store
        .iter()
        .filter(|task| task.scheduled_date == date)
        .fold(DaySummary::default(), |mut summary, task| {
            summary.total += 1;
            if task.completed {
                summary.completed += 1;
            } else {
                summary.pending += 1;
                summary.scheduled_minutes += task.duration_minutes();
            }
            summary
        })
}
