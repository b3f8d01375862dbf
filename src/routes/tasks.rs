use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::{AppResult, ErrorResponse};
use crate::extract::{AppJson, AppPath};
use crate::models::task::{Task, TaskCreateRequest, TaskUpdateRequest};
use crate::services::tasks;

/// Admin-tier callers see every task; plain users only those assigned to them.
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "Tasks",
    responses(
        (status = 200, description = "Visible tasks, newest first", body = [Task]),
        (status = 401, description = "No token presented", body = ErrorResponse)
    )
)]
pub async fn list_tasks(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<Task>>> {
    tasks::list_tasks(&state.pool, &actor).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "Tasks",
    request_body = TaskCreateRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Admin role or higher required", body = ErrorResponse)
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(payload): AppJson<TaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let task = tasks::create_task(&state.pool, &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task with its notes", body = Task),
        (status = 403, description = "Task is not assigned to the caller", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
pub async fn get_task(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Task>> {
    tasks::get_task(&state.pool, &actor, id).await.map(Json)
}

/// Merge-patch: absent fields are kept, `null` clears `assignedTo` or
/// `completedAt`. Clearing `completedAt` reopens a done task.
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = TaskUpdateRequest,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 403, description = "Admin role or higher required", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
pub async fn update_task(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    tasks::update_task(&state.pool, &actor, id, payload).await.map(Json)
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 204, description = "Task and its notes deleted"),
        (status = 403, description = "Admin role or higher required", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
pub async fn delete_task(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    tasks::delete_task(&state.pool, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
