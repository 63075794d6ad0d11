use crate::clock::Clock;
use crate::error::{ImportFailure, PlannerError, PlannerResult, RejectedEntry};
use crate::task::{
    Task, TaskDraft, TaskId, TaskPatch, normalize_description, validate_title, validate_window,
};
use crate::time_math::WallTime;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Authoritative collection of tasks for one planner session.
///
/// The store validates the shape of each task (`start < end`, non-empty
/// title) but leaves the no-overlap policy to its caller: run
/// [`TaskStore::has_conflict`] before `add` or `update`.
pub struct TaskStore {
    tasks: BTreeMap<TaskId, Task>,
    clock: Arc<dyn Clock>,
    last_issued_id: i64,
}

impl TaskStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks: BTreeMap::new(),
            clock,
            last_issued_id: 0,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn all(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    pub fn add(&mut self, draft: TaskDraft, scheduled_date: NaiveDate) -> PlannerResult<Task> {
        let (start_time, end_time) = validate_window(&draft.start_time, &draft.end_time)?;
        let title = validate_title(&draft.title)?;
        let now = self.clock.now();
        let id = self.next_id(now.timestamp_millis());
        let task = Task {
            id: id.clone(),
            title,
            start_time,
            end_time,
            description: normalize_description(draft.description),
            priority: draft.priority,
            completed: false,
            scheduled_date,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        debug!(task_id = %id, date = %scheduled_date, start = %start_time, end = %end_time, "task added");
        self.tasks.insert(id, task.clone());
        Ok(task)
    }

    pub fn update(&mut self, id: &TaskId, patch: TaskPatch) -> PlannerResult<Task> {
        let now = self.clock.now();
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| PlannerError::NotFound(id.clone()))?;

        let start_raw = patch
            .start_time
            .unwrap_or_else(|| task.start_time.to_string());
        let end_raw = patch.end_time.unwrap_or_else(|| task.end_time.to_string());
        let (start_time, end_time) = validate_window(&start_raw, &end_raw)?;
        let title = match patch.title {
            Some(title) => validate_title(&title)?,
            None => task.title.clone(),
        };

        task.title = title;
        task.start_time = start_time;
        task.end_time = end_time;
        if patch.description.is_some() {
            task.description = normalize_description(patch.description);
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        task.updated_at = now;
        debug!(task_id = %id, start = %start_time, end = %end_time, "task updated");
        Ok(task.clone())
    }

    /// Removes a task. Unknown ids are ignored.
    pub fn delete(&mut self, id: &TaskId) -> Option<Task> {
        let removed = self.tasks.remove(id);
        if removed.is_some() {
            debug!(task_id = %id, "task deleted");
        }
        removed
    }

    pub fn toggle_complete(&mut self, id: &TaskId) -> PlannerResult<Task> {
        let now = self.clock.now();
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| PlannerError::NotFound(id.clone()))?;
        task.completed = !task.completed;
        task.completed_at = task.completed.then_some(now);
        task.updated_at = now;
        debug!(task_id = %id, completed = task.completed, "task completion toggled");
        Ok(task.clone())
    }

    pub fn has_conflict(
        &self,
        date: NaiveDate,
        start: &str,
        end: &str,
        exclude: Option<&TaskId>,
    ) -> PlannerResult<bool> {
        let start: WallTime = start.trim().parse()?;
        let end: WallTime = end.trim().parse()?;
        Ok(self.has_conflict_at(date, start, end, exclude))
    }

    pub fn has_conflict_at(
        &self,
        date: NaiveDate,
        start: WallTime,
        end: WallTime,
        exclude: Option<&TaskId>,
    ) -> bool {
        self.conflicting(date, start, end, exclude).next().is_some()
    }

    /// Tasks that would collide with `[start, end)` on `date`.
    pub fn conflicts(
        &self,
        date: NaiveDate,
        start: WallTime,
        end: WallTime,
        exclude: Option<&TaskId>,
    ) -> Vec<Task> {
        self.conflicting(date, start, end, exclude).cloned().collect()
    }

    fn conflicting<'a>(
        &'a self,
        date: NaiveDate,
        start: WallTime,
        end: WallTime,
        exclude: Option<&'a TaskId>,
    ) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.values().filter(move |task| {
            exclude != Some(&task.id)
                && task.scheduled_date == date
                && !task.completed
                && task.overlaps(start, end)
        })
    }

    /// Replaces the whole collection from a JSON array of task records.
    ///
    /// Every entry must be a structurally valid task with a unique id;
    /// otherwise nothing changes and the rejected entries are reported.
    /// Entries are not checked against each other for overlaps.
    pub fn replace_all(&mut self, payload: &Value) -> PlannerResult<usize> {
        let entries = payload
            .as_array()
            .ok_or(PlannerError::Import(ImportFailure::NotAnArray))?;

        let mut tasks = Vec::with_capacity(entries.len());
        let mut rejected = Vec::new();
        let mut seen_ids = HashSet::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            match serde_json::from_value::<Task>(entry.clone()) {
                Ok(task) => {
                    if !seen_ids.insert(task.id.clone()) {
                        rejected.push(RejectedEntry {
                            index,
                            reason: format!("duplicate task id {}", task.id),
                        });
                        continue;
                    }
                    tasks.push(task);
                }
                Err(err) => rejected.push(RejectedEntry {
                    index,
                    reason: err.to_string(),
                }),
            }
        }

        if !rejected.is_empty() {
            return Err(PlannerError::Import(ImportFailure::Rejected(rejected)));
        }

        let count = tasks.len();
        self.tasks = tasks.into_iter().map(|task| (task.id.clone(), task)).collect();
        info!(count, "task collection replaced");
        Ok(count)
    }

    fn next_id(&mut self, now_millis: i64) -> TaskId {
        let mut candidate = now_millis.max(self.last_issued_id + 1);
        while self.tasks.contains_key(&TaskId::new(candidate.to_string())) {
            candidate += 1;
        }
        self.last_issued_id = candidate;
        TaskId::new(candidate.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};

    fn store() -> TaskStore {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap());
        TaskStore::new(Arc::new(clock))
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let mut store = store();
        let a = store.add(TaskDraft::new("A", "09:00", "10:00"), day()).unwrap();
        let b = store.add(TaskDraft::new("B", "10:00", "11:00"), day()).unwrap();
        assert_ne!(a.id, b.id);
        let a_num: i64 = a.id.as_str().parse().unwrap();
        let b_num: i64 = b.id.as_str().parse().unwrap();
        assert_eq!(b_num, a_num + 1);
    }

    #[test]
    fn update_revalidates_merged_window() {
        let mut store = store();
        let task = store.add(TaskDraft::new("A", "09:00", "10:00"), day()).unwrap();
        let patch = TaskPatch {
            start_time: Some("11:00".into()),
            ..TaskPatch::default()
        };
        let err = store.update(&task.id, patch).unwrap_err();
        assert!(matches!(err, PlannerError::Validation(_)));
        assert_eq!(store.get(&task.id).unwrap().start_time.to_string(), "09:00");
    }

    #[test]
    fn conflict_ignores_other_days() {
        let mut store = store();
        store.add(TaskDraft::new("A", "09:00", "10:00"), day()).unwrap();
        let next_day = day().succ_opt().unwrap();
        assert!(!store.has_conflict(next_day, "09:00", "10:00", None).unwrap());
        assert!(store.has_conflict(day(), "09:59", "10:30", None).unwrap());
    }
}
