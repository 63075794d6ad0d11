use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    Command, DayPlanner, DaySummary, OutcomeKind, PlannerError, PriorityFilter, ScheduleFilter,
    Task, TaskBlobStore, TaskDraft, TaskId, TaskPatch, day_summary, visible_tasks,
};

pub type SharedBlobStore = Box<dyn TaskBlobStore + Send + Sync>;
pub type SharedPlanner = Arc<RwLock<DayPlanner<SharedBlobStore>>>;

/// Every mutation, including the conflict check in front of it, runs under
/// the write lock.
#[derive(Clone)]
pub struct AppState {
    planner: SharedPlanner,
}

impl AppState {
    pub fn new(planner: DayPlanner<SharedBlobStore>) -> Self {
        Self {
            planner: Arc::new(RwLock::new(planner)),
        }
    }

    pub fn with_shared(planner: SharedPlanner) -> Self {
        Self { planner }
    }

    fn planner(&self) -> SharedPlanner {
        self.planner.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal(String),
}

impl From<PlannerError> for ApiError {
    fn from(value: PlannerError) -> Self {
        match value {
            PlannerError::NotFound(_) => ApiError::NotFound(value.to_string()),
            PlannerError::Storage(_) => ApiError::Internal(value.to_string()),
            PlannerError::NotDragging => ApiError::Conflict(value.to_string()),
            PlannerError::Format { .. } | PlannerError::Validation(_) | PlannerError::Import(_) => {
                ApiError::Invalid(value.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct DayQuery {
    date: Option<NaiveDate>,
    #[serde(default)]
    search: String,
    priority: Option<String>,
    #[serde(default)]
    show_completed: bool,
}

#[derive(Debug, Deserialize)]
struct CreateTaskPayload {
    #[serde(flatten)]
    draft: TaskDraft,
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct MovePayload {
    delta_px: i64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/tasks/:id/toggle", post(toggle_task))
        .route("/tasks/:id/move", post(move_task))
        .route("/summary", get(summary))
        .route("/export", get(export_tasks))
        .route("/import", post(import_tasks))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, planner: DayPlanner<SharedBlobStore>) -> std::io::Result<()> {
    let state = AppState::new(planner);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "day planner HTTP API listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let priority = match query.priority.as_deref() {
        Some(raw) => raw.parse::<PriorityFilter>().map_err(ApiError::Invalid)?,
        None => PriorityFilter::All,
    };
    let filter = ScheduleFilter {
        search: query.search,
        priority,
        show_completed: query.show_completed,
    };
    let planner = state.planner();
    let tasks = {
        let guard = planner.read();
        let date = query.date.unwrap_or_else(|| guard.viewed_date());
        visible_tasks(guard.store(), date, &filter)
    };
    Ok(Json(tasks))
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let planner = state.planner();
    let task = {
        let guard = planner.read();
        guard.store().get(&TaskId::new(task_id.as_str())).cloned()
    };
    task.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("task {task_id} not found")))
}

async fn create_task(
    State(state): State<AppState>,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let planner = state.planner();
    let outcome = {
        let mut guard = planner.write();
        let viewed = guard.viewed_date();
        let date = payload.date.unwrap_or_else(|| guard.today());
        guard.dispatch(Command::SetDate(date))?;
        let result = guard.dispatch(Command::AddTask(payload.draft));
        guard.dispatch(Command::SetDate(viewed))?;
        result?
    };
    match (outcome.kind, outcome.task) {
        (OutcomeKind::Applied, Some(task)) => Ok((StatusCode::CREATED, Json(task))),
        _ => Err(conflict_from(outcome.notices)),
    }
}

async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    let planner = state.planner();
    let outcome = {
        let mut guard = planner.write();
        guard.dispatch(Command::UpdateTask {
            id: TaskId::new(task_id),
            patch,
        })?
    };
    match (outcome.kind, outcome.task) {
        (OutcomeKind::Applied, Some(task)) => Ok(Json(task)),
        _ => Err(conflict_from(outcome.notices)),
    }
}

async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let planner = state.planner();
    {
        let mut guard = planner.write();
        guard.dispatch(Command::DeleteTask(TaskId::new(task_id)))?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let planner = state.planner();
    let outcome = {
        let mut guard = planner.write();
        guard.dispatch(Command::ToggleComplete(TaskId::new(task_id)))?
    };
    if outcome.kind == OutcomeKind::Conflict {
        return Err(conflict_from(outcome.notices));
    }
    outcome
        .task
        .map(Json)
        .ok_or_else(|| ApiError::Internal("task missing after toggle".into()))
}

/// Replays a drag of `delta_px` pixels: begin at 0, move, drop.
async fn move_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(payload): Json<MovePayload>,
) -> Result<Json<Task>, ApiError> {
    let id = TaskId::new(task_id);
    let planner = state.planner();
    let outcome = {
        let mut guard = planner.write();
        guard.dispatch(Command::BeginDrag {
            id: id.clone(),
            pointer_y: 0,
        })?;
        guard.dispatch(Command::MoveDrag {
            pointer_y: payload.delta_px,
        })?;
        let outcome = guard.dispatch(Command::EndDrag)?;
        match outcome.kind {
            OutcomeKind::Applied => outcome,
            OutcomeKind::Conflict => return Err(conflict_from(outcome.notices)),
            OutcomeKind::NoChange => {
                if let Some(notice) = outcome.notices.into_iter().next() {
                    return Err(ApiError::Invalid(notice.message));
                }
                let task = guard
                    .store()
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| ApiError::NotFound(format!("task {id} not found")))?;
                return Ok(Json(task));
            }
        }
    };
    outcome
        .task
        .map(Json)
        .ok_or_else(|| ApiError::Internal("task missing after move".into()))
}

async fn summary(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Json<DaySummary> {
    let planner = state.planner();
    let guard = planner.read();
    let date = query.date.unwrap_or_else(|| guard.viewed_date());
    Json(day_summary(guard.store(), date))
}

async fn export_tasks(State(state): State<AppState>) -> Result<Response, ApiError> {
    let planner = state.planner();
    let (body, file_name) = {
        let guard = planner.read();
        (guard.export_json()?, guard.export_file_name())
    };
    let disposition = format!("attachment; filename=\"{file_name}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn import_tasks(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let planner = state.planner();
    let imported = {
        let mut guard = planner.write();
        guard.dispatch(Command::Import(payload))?;
        guard.store().len()
    };
    Ok(Json(json!({ "imported": imported })))
}

fn conflict_from(notices: Vec<crate::Notice>) -> ApiError {
    let message = notices
        .into_iter()
        .next()
        .map(|notice| notice.message)
        .unwrap_or_else(|| "time slot conflict".to_string());
    ApiError::Conflict(message)
}
