use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::{AppResult, ErrorResponse};
use crate::extract::{AppJson, AppPath};
use crate::models::subtask::{Subtask, SubtaskCreateRequest, SubtaskUpdateRequest};
use crate::services::subtasks;

#[utoipa::path(
    get,
    path = "/api/tasks/{id}/subtasks",
    tag = "Subtasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Subtasks in creation order", body = [Subtask]),
        (status = 403, description = "Task is not visible to the caller", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
pub async fn list_subtasks(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(task_id): AppPath<Uuid>,
) -> AppResult<Json<Vec<Subtask>>> {
    subtasks::list_subtasks(&state.pool, &actor, task_id).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/api/tasks/{id}/subtasks",
    tag = "Subtasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = SubtaskCreateRequest,
    responses(
        (status = 201, description = "Subtask added, not yet completed", body = Subtask),
        (status = 400, description = "Missing title", body = ErrorResponse),
        (status = 403, description = "Admin tier required", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
pub async fn add_subtask(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(task_id): AppPath<Uuid>,
    AppJson(payload): AppJson<SubtaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Subtask>)> {
    let subtask = subtasks::add_subtask(&state.pool, &actor, task_id, payload).await?;
    Ok((StatusCode::CREATED, Json(subtask)))
}

#[utoipa::path(
    put,
    path = "/api/tasks/{id}/subtasks/{subtask_id}",
    tag = "Subtasks",
    params(
        ("id" = Uuid, Path, description = "Task id"),
        ("subtask_id" = Uuid, Path, description = "Subtask id")
    ),
    request_body = SubtaskUpdateRequest,
    responses(
        (status = 200, description = "Subtask updated", body = Subtask),
        (status = 403, description = "Admin tier required", body = ErrorResponse),
        (status = 404, description = "Task or subtask not found", body = ErrorResponse)
    )
)]
pub async fn update_subtask(
    State(state): State<AppState>,
    actor: Actor,
    AppPath((task_id, subtask_id)): AppPath<(Uuid, Uuid)>,
    AppJson(payload): AppJson<SubtaskUpdateRequest>,
) -> AppResult<Json<Subtask>> {
    subtasks::update_subtask(&state.pool, &actor, task_id, subtask_id, payload)
        .await
        .map(Json)
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{id}/subtasks/{subtask_id}",
    tag = "Subtasks",
    params(
        ("id" = Uuid, Path, description = "Task id"),
        ("subtask_id" = Uuid, Path, description = "Subtask id")
    ),
    responses(
        (status = 204, description = "Subtask deleted"),
        (status = 403, description = "Admin tier required", body = ErrorResponse),
        (status = 404, description = "Task or subtask not found", body = ErrorResponse)
    )
)]
pub async fn delete_subtask(
    State(state): State<AppState>,
    actor: Actor,
    AppPath((task_id, subtask_id)): AppPath<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    subtasks::delete_subtask(&state.pool, &actor, task_id, subtask_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
