//! Drag-to-reposition on the hourly grid.
//!
//! `Idle -> Dragging -> {Idle, Committed, Reverted}`; a terminal state is
//! left on the next [`DragReposition::begin`]. A drop that lands on the
//! task's own slot goes straight back to `Idle`. Pointer moves only produce
//! a snapped preview; the task is written once, on [`DragReposition::end`],
//! and only when the new slot is free.

use crate::error::{PlannerError, PlannerResult};
use crate::store::TaskStore;
use crate::task::{Task, TaskId, TaskPatch};
use crate::time_math::{WallTime, minutes_to_pixels, pixels_to_minutes, snap_to_hour};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub task_id: TaskId,
    start_pointer: i64,
    start_top: i64,
    candidate_top: Option<i64>,
}

impl DragSession {
    pub fn original_top(&self) -> i64 {
        self.start_top
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
    Committed(TaskId),
    Reverted(TaskId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragResult {
    Moved(Task),
    Unchanged,
    Conflict { original_top: i64 },
    OutOfDay { original_top: i64 },
}

#[derive(Debug, Default)]
pub struct DragReposition {
    state: DragState,
}

impl DragReposition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn begin(&mut self, task: &Task, pointer_y: i64) {
        let start_top = minutes_to_pixels(task.start_time.minutes());
        debug!(task_id = %task.id, pointer_y, start_top, "drag started");
        self.state = DragState::Dragging(DragSession {
            task_id: task.id.clone(),
            start_pointer: pointer_y,
            start_top,
            candidate_top: None,
        });
    }

    /// Tracks the pointer and returns the snapped top offset to preview.
    pub fn move_to(&mut self, pointer_y: i64) -> PlannerResult<i64> {
        let DragState::Dragging(session) = &mut self.state else {
            return Err(PlannerError::NotDragging);
        };
        let candidate = session
            .start_top
            .saturating_add(pointer_y.saturating_sub(session.start_pointer))
            .max(0);
        session.candidate_top = Some(candidate);
        Ok(snap_to_hour(candidate))
    }

    pub fn end(&mut self, store: &mut TaskStore) -> PlannerResult<DragResult> {
        let session = match std::mem::take(&mut self.state) {
            DragState::Dragging(session) => session,
            other => {
                self.state = other;
                return Err(PlannerError::NotDragging);
            }
        };
        let original_top = session.original_top();

        let Some(candidate) = session.candidate_top else {
            return Ok(DragResult::Unchanged);
        };

        // The task may have been edited while the pointer was down.
        let Some((date, current_start, current_end)) = store
            .get(&session.task_id)
            .map(|task| (task.scheduled_date, task.start_time, task.end_time))
        else {
            self.state = DragState::Reverted(session.task_id.clone());
            return Err(PlannerError::NotFound(session.task_id));
        };
        let duration = current_end.minutes() - current_start.minutes();

        let new_start = pixels_to_minutes(snap_to_hour(candidate));
        let new_end = new_start.saturating_add(duration);
        let (Ok(start), Ok(end)) = (
            WallTime::from_minutes(new_start),
            WallTime::from_minutes(new_end),
        ) else {
            debug!(task_id = %session.task_id, new_start, new_end, "drag rejected past midnight");
            self.state = DragState::Reverted(session.task_id);
            return Ok(DragResult::OutOfDay { original_top });
        };

        if start == current_start {
            return Ok(DragResult::Unchanged);
        }

        if store.has_conflict_at(date, start, end, Some(&session.task_id)) {
            debug!(task_id = %session.task_id, %start, %end, "drag reverted on conflict");
            self.state = DragState::Reverted(session.task_id);
            return Ok(DragResult::Conflict { original_top });
        }

        let patch = TaskPatch::times(start.to_string(), end.to_string());
        match store.update(&session.task_id, patch) {
            Ok(task) => {
                self.state = DragState::Committed(session.task_id);
                Ok(DragResult::Moved(task))
            }
            Err(err) => {
                self.state = DragState::Reverted(session.task_id);
                Err(err)
            }
        }
    }

    /// Cancels an in-flight drag. Returns the top offset to restore.
    pub fn abort(&mut self) -> Option<i64> {
        let DragState::Dragging(session) = &self.state else {
            return None;
        };
        let original_top = session.original_top();
        let task_id = session.task_id.clone();
        self.state = DragState::Reverted(task_id);
        Some(original_top)
    }
}
