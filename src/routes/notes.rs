use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::{AppResult, ErrorResponse};
use crate::extract::{AppJson, AppPath};
use crate::models::note::{Note, NoteCreateRequest, NoteUpdateRequest};
use crate::services::notes;

#[utoipa::path(
    get,
    path = "/api/tasks/{id}/notes",
    tag = "Notes",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Notes, oldest first", body = [Note]),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
pub async fn list_notes(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(task_id): AppPath<Uuid>,
) -> AppResult<Json<Vec<Note>>> {
    notes::list_notes(&state.pool, &actor, task_id).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/api/tasks/{id}/notes",
    tag = "Notes",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = NoteCreateRequest,
    responses(
        (status = 201, description = "Note added", body = Note),
        (status = 403, description = "Task is not visible to the caller", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
pub async fn add_note(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(task_id): AppPath<Uuid>,
    AppJson(payload): AppJson<NoteCreateRequest>,
) -> AppResult<(StatusCode, Json<Note>)> {
    let note = notes::add_note(&state.pool, &actor, task_id, payload).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[utoipa::path(
    put,
    path = "/api/tasks/{id}/notes/{note_id}",
    tag = "Notes",
    params(
        ("id" = Uuid, Path, description = "Task id"),
        ("note_id" = Uuid, Path, description = "Note id")
    ),
    request_body = NoteUpdateRequest,
    responses(
        (status = 200, description = "Note updated", body = Note),
        (status = 403, description = "Only the author or an admin can edit", body = ErrorResponse),
        (status = 404, description = "Task or note not found", body = ErrorResponse)
    )
)]
pub async fn edit_note(
    State(state): State<AppState>,
    actor: Actor,
    AppPath((task_id, note_id)): AppPath<(Uuid, Uuid)>,
    AppJson(payload): AppJson<NoteUpdateRequest>,
) -> AppResult<Json<Note>> {
    notes::edit_note(&state.pool, &actor, task_id, note_id, payload).await.map(Json)
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{id}/notes/{note_id}",
    tag = "Notes",
    params(
        ("id" = Uuid, Path, description = "Task id"),
        ("note_id" = Uuid, Path, description = "Note id")
    ),
    responses(
        (status = 204, description = "Note deleted"),
        (status = 403, description = "Only the author or an admin can delete", body = ErrorResponse),
        (status = 404, description = "Task or note not found", body = ErrorResponse)
    )
)]
pub async fn delete_note(
    State(state): State<AppState>,
    actor: Actor,
    AppPath((task_id, note_id)): AppPath<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    notes::delete_note(&state.pool, &actor, task_id, note_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
