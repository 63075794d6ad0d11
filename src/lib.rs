pub mod clock;
pub mod config;
pub mod drag;
pub mod error;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod persistence;
pub mod planner;
pub mod query;
pub mod store;
pub mod task;
pub mod time_math;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, PlannerCliArgs, PlannerConfig, StorageBackend, StorageConfig};
pub use drag::{DragReposition, DragResult, DragState};
pub use error::{ImportFailure, PlannerError, PlannerResult, RejectedEntry};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteBlobStore;
pub use persistence::{
    JsonFileBlobStore, MemoryBlobStore, PersistenceError, PersistenceResult, TaskBlobStore,
    export_file_name, export_tasks_to_csv, load_tasks, load_tasks_from_json_file, save_tasks,
    save_tasks_to_json_file,
};
pub use planner::{Command, DayPlanner, Notice, NoticeLevel, Outcome, OutcomeKind};
pub use query::{
    DaySummary, PriorityFilter, ScheduleFilter, TaskLayout, completed_tasks_for, day_summary,
    layout, visible_tasks,
};
pub use store::TaskStore;
pub use task::{Priority, Task, TaskDraft, TaskId, TaskPatch, TaskRecord};
pub use time_math::WallTime;
