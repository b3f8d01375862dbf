use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::{AppResult, ErrorResponse};
use crate::extract::{AppJson, AppPath};
use crate::models::user::{CreateUserRequest, RoleUpdateRequest, User, UserUpdateRequest};
use crate::services::users;

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    responses(
        (status = 200, description = "All accounts, sorted by first name", body = [User]),
        (status = 403, description = "Admin role or higher required", body = ErrorResponse)
    )
)]
pub async fn list_users(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<User>>> {
    users::list_users(&state.pool, &actor).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 403, description = "Role not allowed", body = ErrorResponse),
        (status = 409, description = "Email or display name already in use", body = ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = users::create_user(&state.pool, &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Account", body = User),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<User>> {
    users::get_user(&state.pool, &actor, id).await.map(Json)
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses(
        (status = 200, description = "Account updated", body = User),
        (status = 403, description = "Not allowed to modify this account", body = ErrorResponse),
        (status = 409, description = "Email or display name already in use", body = ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UserUpdateRequest>,
) -> AppResult<Json<User>> {
    users::update_user(&state.pool, &actor, id, payload).await.map(Json)
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}/role",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "Role changed", body = User),
        (status = 403, description = "Role change not allowed", body = ErrorResponse)
    )
)]
pub async fn update_role(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<RoleUpdateRequest>,
) -> AppResult<Json<User>> {
    users::update_role(&state.pool, &actor, id, payload.role).await.map(Json)
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 403, description = "Deletion not allowed", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    users::delete_user(&state.pool, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
