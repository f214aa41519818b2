//! REST API over the planner.
//!
//! Every mutation funnels through [`apply_command`]: write-lock the planner,
//! validate + apply, flush to the save file, broadcast the event to sync
//! subscribers, then answer the HTTP request.

use crate::dates;
use crate::persist::SaveFile;
use crate::planner::{
    Command, Event, Planner, PlannerError, Resource, Task, TaskInput, TaskStatus, Week,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

// ── Shared state ───────────────────────────────────────────────

pub struct AppState {
    pub planner: RwLock<Planner>,
    pub save_file: SaveFile,
    pub events_tx: tokio::sync::broadcast::Sender<String>,
}

pub type SharedState = Arc<AppState>;

// ── Request/response types ─────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWeekRequest {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
pub struct AddResourceRequest {
    pub title: String,
    pub url: String,
}

/// Week as the clients see it: the entity plus the `dates` display string.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekResponse {
    pub id: Uuid,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// `"dd/mm/yy - dd/mm/yy"`
    pub dates: String,
    pub description: String,
    pub tasks: Vec<Task>,
    pub resources: Vec<Resource>,
}

impl From<&Week> for WeekResponse {
    fn from(week: &Week) -> Self {
        WeekResponse {
            id: week.id,
            title: week.title.clone(),
            start_date: week.start_date,
            end_date: week.end_date,
            dates: dates::format_week_range(week.start_date, week.end_date),
            description: week.description.clone(),
            tasks: week.tasks.clone(),
            resources: week.resources.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(ErrorBody { error: msg.into() }))
}

/// Map a rejected command to its HTTP status.
fn reject(err: PlannerError) -> ApiError {
    let status = match err {
        PlannerError::WeekNotFound
        | PlannerError::TaskNotFound
        | PlannerError::ResourceNotFound => StatusCode::NOT_FOUND,
        PlannerError::OverlappingWeek => StatusCode::CONFLICT,
        PlannerError::MissingTitle
        | PlannerError::EndBeforeStart
        | PlannerError::MissingStudyTime
        | PlannerError::MissingDescription
        | PlannerError::MissingResourceFields => StatusCode::BAD_REQUEST,
    };
    api_error(status, err.to_string())
}

// ── Mutation path ──────────────────────────────────────────────

/// Apply a command under the write lock, flush it, broadcast it.
///
/// A failed flush answers 500 and skips the broadcast; the in-memory planner
/// keeps the change and the next successful flush re-writes the whole week.
fn apply_command(state: &SharedState, cmd: Command) -> Result<Event, ApiError> {
    let event = {
        let mut planner = state.planner.write().unwrap();
        let event = planner.apply(cmd).map_err(|e| {
            tracing::warn!(error = %e, "command rejected");
            reject(e)
        })?;

        if let Err(e) = state.save_file.flush(&planner, &event) {
            tracing::error!(error = %e, "save file flush failed");
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save changes",
            ));
        }
        tracing::debug!(revision = planner.revision, "command applied");
        event
    };

    // Fan out to every sync subscriber.
    if let Ok(json) = serde_json::to_string(&event) {
        let _ = state.events_tx.send(json);
    }

    Ok(event)
}

// ── Week handlers ──────────────────────────────────────────────

// GET /api/weeks
pub async fn list_weeks(State(state): State<SharedState>) -> Json<Vec<WeekResponse>> {
    let planner = state.planner.read().unwrap();
    Json(planner.weeks.iter().map(WeekResponse::from).collect())
}

// GET /api/weeks/:id
pub async fn get_week(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WeekResponse>, ApiError> {
    let planner = state.planner.read().unwrap();
    let week = planner
        .week(id)
        .ok_or_else(|| reject(PlannerError::WeekNotFound))?;
    Ok(Json(WeekResponse::from(week)))
}

// POST /api/weeks
pub async fn create_week(
    State(state): State<SharedState>,
    Json(payload): Json<CreateWeekRequest>,
) -> Result<(StatusCode, Json<WeekResponse>), ApiError> {
    let event = apply_command(
        &state,
        Command::CreateWeek {
            title: payload.title,
            start_date: payload.start_date,
            end_date: payload.end_date,
            description: payload.description,
        },
    )?;

    match event {
        Event::WeekCreated { week, .. } => {
            Ok((StatusCode::CREATED, Json(WeekResponse::from(&week))))
        }
        _ => unreachable!("CreateWeek yields WeekCreated"),
    }
}

// DELETE /api/weeks/:id
pub async fn delete_week(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageBody>, ApiError> {
    apply_command(&state, Command::DeleteWeek { week_id: id })?;
    Ok(Json(MessageBody {
        message: "Week deleted successfully",
    }))
}

// ── Task handlers ──────────────────────────────────────────────

// POST /api/weeks/:id/tasks
pub async fn add_task(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TaskInput>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let event = apply_command(&state, Command::AddTask { week_id: id, task: payload })?;

    match event {
        Event::TaskAdded { task, .. } => Ok((StatusCode::CREATED, Json(task))),
        _ => unreachable!("AddTask yields TaskAdded"),
    }
}

// PUT /api/weeks/:id/tasks/:index
pub async fn update_task(
    State(state): State<SharedState>,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(payload): Json<TaskInput>,
) -> Result<Json<Task>, ApiError> {
    let event = apply_command(
        &state,
        Command::UpdateTask { week_id: id, index, task: payload },
    )?;

    match event {
        Event::TaskUpdated { task, .. } => Ok(Json(task)),
        _ => unreachable!("UpdateTask yields TaskUpdated"),
    }
}

// DELETE /api/weeks/:id/tasks/:index
pub async fn delete_task(
    State(state): State<SharedState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<MessageBody>, ApiError> {
    apply_command(&state, Command::DeleteTask { week_id: id, index })?;
    Ok(Json(MessageBody {
        message: "Task deleted successfully",
    }))
}

// PATCH /api/weeks/:id/tasks/:index/status
pub async fn set_task_status(
    State(state): State<SharedState>,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(payload): Json<StatusRequest>,
) -> Result<Json<Task>, ApiError> {
    apply_command(
        &state,
        Command::SetTaskStatus { week_id: id, index, status: payload.status },
    )?;

    // Echo the updated task back, as the original API did.
    let planner = state.planner.read().unwrap();
    let task = planner
        .week(id)
        .and_then(|w| w.tasks.get(index))
        .cloned()
        .ok_or_else(|| reject(PlannerError::TaskNotFound))?;
    Ok(Json(task))
}

// ── Resource handlers ──────────────────────────────────────────

// POST /api/weeks/:id/resources
pub async fn add_resource(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddResourceRequest>,
) -> Result<(StatusCode, Json<Resource>), ApiError> {
    let event = apply_command(
        &state,
        Command::AddResource {
            week_id: id,
            title: payload.title,
            url: payload.url,
        },
    )?;

    match event {
        Event::ResourceAdded { resource, .. } => Ok((StatusCode::CREATED, Json(resource))),
        _ => unreachable!("AddResource yields ResourceAdded"),
    }
}

// DELETE /api/weeks/:id/resources/:rid
pub async fn delete_resource(
    State(state): State<SharedState>,
    Path((id, rid)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageBody>, ApiError> {
    apply_command(&state, Command::DeleteResource { week_id: id, resource_id: rid })?;
    Ok(Json(MessageBody {
        message: "Resource deleted successfully",
    }))
}

// ── Tests ──────────────────────────────────────────────────────
