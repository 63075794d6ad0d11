//! Session context for one user: the store, what they are looking at, and
//! where it all gets saved.
//!
//! Front-ends turn their input into [`Command`]s and render from the
//! read accessors; nothing else mutates the store.

use crate::clock::Clock;
use crate::drag::{DragReposition, DragResult};
use crate::error::{PlannerError, PlannerResult};
use crate::persistence::{self, TaskBlobStore};
use crate::query::{self, DaySummary, PriorityFilter, ScheduleFilter};
use crate::store::TaskStore;
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};
use crate::time_math::{self, WallTime};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddTask(TaskDraft),
    UpdateTask { id: TaskId, patch: TaskPatch },
    DeleteTask(TaskId),
    ToggleComplete(TaskId),
    BeginDrag { id: TaskId, pointer_y: i64 },
    MoveDrag { pointer_y: i64 },
    EndDrag,
    AbortDrag,
    NavigateDays(i64),
    SetDate(NaiveDate),
    SetSearch(String),
    SetPriorityFilter(PriorityFilter),
    ToggleShowCompleted,
    Import(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A message for the user, shown however the front-end shows notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The store changed and was flushed.
    Applied,
    /// Nothing in the store changed (view commands, no-op deletes, drag moves).
    NoChange,
    /// Refused because the slot is taken.
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub kind: OutcomeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
    /// Top offset the dragged task should be drawn at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_top: Option<i64>,
    pub notices: Vec<Notice>,
}

impl Outcome {
    fn new(kind: OutcomeKind) -> Self {
        Self {
            kind,
            task: None,
            preview_top: None,
            notices: Vec::new(),
        }
    }

    fn no_change() -> Self {
        Self::new(OutcomeKind::NoChange)
    }

    fn applied(task: Option<Task>, message: impl Into<String>) -> Self {
        let mut outcome = Self::new(OutcomeKind::Applied);
        outcome.task = task;
        outcome.notices.push(Notice::success(message));
        outcome
    }

    fn conflict(message: impl Into<String>) -> Self {
        let mut outcome = Self::new(OutcomeKind::Conflict);
        outcome.notices.push(Notice::warning(message));
        outcome
    }

    pub fn is_applied(&self) -> bool {
        self.kind == OutcomeKind::Applied
    }
}

const SLOT_TAKEN: &str = "This time slot conflicts with an existing task";

pub struct DayPlanner<S: TaskBlobStore> {
    store: TaskStore,
    adapter: S,
    clock: Arc<dyn Clock>,
    viewed_date: NaiveDate,
    filter: ScheduleFilter,
    drag: DragReposition,
    startup_notices: Vec<Notice>,
}

impl<S: TaskBlobStore> DayPlanner<S> {
    /// Loads whatever the adapter holds and starts on today's date.
    ///
    /// A failing or corrupt store does not stop the session: the planner
    /// starts empty and the problem is reported through
    /// [`DayPlanner::take_startup_notices`].
    pub fn open(adapter: S, clock: Arc<dyn Clock>) -> Self {
        let mut store = TaskStore::new(Arc::clone(&clock));
        let mut startup_notices = Vec::new();
        match persistence::load_tasks(&adapter) {
            Ok(payload) => match store.replace_all(&payload) {
                Ok(count) => info!(count, "loaded saved tasks"),
                Err(err) => {
                    warn!(error = %err, "saved tasks rejected; starting empty");
                    startup_notices.push(Notice::error("Error loading saved tasks"));
                }
            },
            Err(err) => {
                warn!(error = %err, "could not read saved tasks; starting empty");
                startup_notices.push(Notice::error("Error loading saved tasks"));
            }
        }
        let viewed_date = clock.today();
        Self {
            store,
            adapter,
            clock,
            viewed_date,
            filter: ScheduleFilter::default(),
            drag: DragReposition::new(),
            startup_notices,
        }
    }

    pub fn take_startup_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.startup_notices)
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn adapter(&self) -> &S {
        &self.adapter
    }

    pub fn viewed_date(&self) -> NaiveDate {
        self.viewed_date
    }

    pub fn filter(&self) -> &ScheduleFilter {
        &self.filter
    }

    pub fn drag(&self) -> &DragReposition {
        &self.drag
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn visible_tasks(&self) -> Vec<Task> {
        query::visible_tasks(&self.store, self.viewed_date, &self.filter)
    }

    pub fn completed_tasks(&self) -> Vec<Task> {
        query::completed_tasks_for(&self.store, self.viewed_date)
    }

    pub fn summary(&self) -> DaySummary {
        query::day_summary(&self.store, self.viewed_date)
    }

    pub fn date_heading(&self) -> String {
        time_math::date_heading(self.viewed_date, self.today())
    }

    pub fn current_time_offset(&self) -> Option<i64> {
        time_math::current_time_offset(self.viewed_date, self.clock.local_now())
    }

    /// Empty draft with the suggested time window filled in.
    pub fn default_draft(&self) -> TaskDraft {
        let (start, end) = time_math::default_draft_times(self.clock.local_now().time());
        TaskDraft::new("", start, end)
    }

    pub fn export_json(&self) -> PlannerResult<String> {
        Ok(persistence::tasks_to_pretty_json(&self.store.all())?)
    }

    pub fn export_file_name(&self) -> String {
        persistence::export_file_name(self.today())
    }

    pub fn dispatch(&mut self, command: Command) -> PlannerResult<Outcome> {
        match command {
            Command::AddTask(draft) => self.add_task(draft),
            Command::UpdateTask { id, patch } => self.update_task(&id, patch),
            Command::DeleteTask(id) => self.delete_task(&id),
            Command::ToggleComplete(id) => self.toggle_complete(&id),
            Command::BeginDrag { id, pointer_y } => {
                let task = self
                    .store
                    .get(&id)
                    .ok_or_else(|| PlannerError::NotFound(id.clone()))?;
                self.drag.begin(task, pointer_y);
                let mut outcome = Outcome::no_change();
                outcome.preview_top = Some(time_math::minutes_to_pixels(task.start_time.minutes()));
                Ok(outcome)
            }
            Command::MoveDrag { pointer_y } => {
                let top = self.drag.move_to(pointer_y)?;
                let mut outcome = Outcome::no_change();
                outcome.preview_top = Some(top);
                Ok(outcome)
            }
            Command::EndDrag => self.end_drag(),
            Command::AbortDrag => {
                let mut outcome = Outcome::no_change();
                outcome.preview_top = self.drag.abort();
                Ok(outcome)
            }
            Command::NavigateDays(days) => {
                let target = Duration::try_days(days)
                    .and_then(|delta| self.viewed_date.checked_add_signed(delta))
                    .ok_or_else(|| PlannerError::validation("date out of range"))?;
                self.viewed_date = target;
                Ok(Outcome::no_change())
            }
            Command::SetDate(date) => {
                self.viewed_date = date;
                Ok(Outcome::no_change())
            }
            Command::SetSearch(search) => {
                self.filter.search = search;
                Ok(Outcome::no_change())
            }
            Command::SetPriorityFilter(priority) => {
                self.filter.priority = priority;
                Ok(Outcome::no_change())
            }
            Command::ToggleShowCompleted => {
                self.filter.show_completed = !self.filter.show_completed;
                Ok(Outcome::no_change())
            }
            Command::Import(payload) => {
                let count = self.store.replace_all(&payload)?;
                let mut outcome =
                    Outcome::applied(None, format!("{count} tasks imported successfully"));
                self.flush(&mut outcome);
                Ok(outcome)
            }
        }
    }

    fn add_task(&mut self, draft: TaskDraft) -> PlannerResult<Outcome> {
        crate::task::validate_title(&draft.title)?;
        let (start, end) = crate::task::validate_window(&draft.start_time, &draft.end_time)?;
        if self.store.has_conflict_at(self.viewed_date, start, end, None) {
            return Ok(Outcome::conflict(SLOT_TAKEN));
        }
        let task = self.store.add(draft, self.viewed_date)?;
        let mut outcome = Outcome::applied(Some(task), "Task added successfully");
        self.flush(&mut outcome);
        Ok(outcome)
    }

    fn update_task(&mut self, id: &TaskId, patch: TaskPatch) -> PlannerResult<Outcome> {
        let existing = self
            .store
            .get(id)
            .ok_or_else(|| PlannerError::NotFound(id.clone()))?;
        let start = patch
            .start_time
            .as_deref()
            .map(|raw| raw.trim().parse::<WallTime>())
            .transpose()?
            .unwrap_or(existing.start_time);
        let end = patch
            .end_time
            .as_deref()
            .map(|raw| raw.trim().parse::<WallTime>())
            .transpose()?
            .unwrap_or(existing.end_time);
        if start >= end {
            return Err(PlannerError::validation("End time must be after start time"));
        }
        if self
            .store
            .has_conflict_at(existing.scheduled_date, start, end, Some(id))
        {
            return Ok(Outcome::conflict(SLOT_TAKEN));
        }
        let task = self.store.update(id, patch)?;
        let mut outcome = Outcome::applied(Some(task), "Task updated successfully");
        self.flush(&mut outcome);
        Ok(outcome)
    }

    fn delete_task(&mut self, id: &TaskId) -> PlannerResult<Outcome> {
        let Some(removed) = self.store.delete(id) else {
            return Ok(Outcome::no_change());
        };
        let mut outcome = Outcome::applied(Some(removed), "Task deleted successfully");
        self.flush(&mut outcome);
        Ok(outcome)
    }

    fn toggle_complete(&mut self, id: &TaskId) -> PlannerResult<Outcome> {
        let existing = self
            .store
            .get(id)
            .ok_or_else(|| PlannerError::NotFound(id.clone()))?;
        // Reopening a task puts it back into the conflict check.
        if existing.completed
            && self.store.has_conflict_at(
                existing.scheduled_date,
                existing.start_time,
                existing.end_time,
                Some(id),
            )
        {
            return Ok(Outcome::conflict(
                "Cannot mark task incomplete - time conflict detected",
            ));
        }
        let task = self.store.toggle_complete(id)?;
        let message = if task.completed {
            "Task marked as completed"
        } else {
            "Task marked as incomplete"
        };
        let mut outcome = Outcome::applied(Some(task), message);
        self.flush(&mut outcome);
        Ok(outcome)
    }

    fn end_drag(&mut self) -> PlannerResult<Outcome> {
        match self.drag.end(&mut self.store)? {
            DragResult::Moved(task) => {
                let top = time_math::minutes_to_pixels(task.start_time.minutes());
                let mut outcome = Outcome::applied(Some(task), "Task time updated");
                outcome.preview_top = Some(top);
                self.flush(&mut outcome);
                Ok(outcome)
            }
            DragResult::Unchanged => Ok(Outcome::no_change()),
            DragResult::Conflict { original_top } => {
                let mut outcome = Outcome::conflict("Cannot move task - time conflict detected");
                outcome.preview_top = Some(original_top);
                Ok(outcome)
            }
            DragResult::OutOfDay { original_top } => {
                let mut outcome = Outcome::no_change();
                outcome.preview_top = Some(original_top);
                outcome
                    .notices
                    .push(Notice::warning("Cannot move task past the end of the day"));
                Ok(outcome)
            }
        }
    }

    /// Saves the full collection. A failed save keeps the in-memory state
    /// and only adds a warning.
    fn flush(&self, outcome: &mut Outcome) {
        if let Err(err) = persistence::save_tasks(&self.adapter, &self.store.all()) {
            warn!(error = %err, "failed to save tasks");
            outcome
                .notices
                .push(Notice::warning(format!("Changes could not be saved: {err}")));
        }
    }
}
