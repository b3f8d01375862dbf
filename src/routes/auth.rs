use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::{AppError, AppResult, ErrorResponse};
use crate::extract::AppJson;
use crate::models::user::{AuthResponse, LoginRequest, RegisterRequest, User};
use crate::services::{sessions, users};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    security(()),
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email or display name already in use", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let response = sessions::register(&state.pool, &state.jwt, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    security(()),
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    sessions::login(&state.pool, &state.jwt, payload).await.map(Json)
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "No token presented", body = ErrorResponse),
        (status = 403, description = "Invalid or expired token", body = ErrorResponse)
    )
)]
pub async fn me(State(state): State<AppState>, actor: Actor) -> AppResult<Json<User>> {
    users::get_user(&state.pool, &actor, actor.id).await.map(Json)
}

#[utoipa::path(
    get,
    path = "/api/auth/google",
    tag = "Auth",
    security(()),
    responses((status = 303, description = "Redirect to the provider consent screen"))
)]
pub async fn google(State(state): State<AppState>) -> AppResult<Redirect> {
    let Some(provider) = state.identity.as_ref() else {
        return Ok(login_error(&state, "federation_disabled"));
    };

    let url = provider.authorization_url(&Uuid::new_v4().to_string())?;
    Ok(Redirect::to(&url))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    /// Authorization code issued by the provider.
    pub code: Option<String>,
}

/// Always answers with a redirect back to the frontend, carrying either the
/// session token or an error code.
#[utoipa::path(
    get,
    path = "/api/auth/google/callback",
    tag = "Auth",
    security(()),
    params(CallbackQuery),
    responses((status = 303, description = "Redirect to the frontend with `token` or `error`"))
)]
pub async fn google_callback(State(state): State<AppState>, Query(query): Query<CallbackQuery>) -> Redirect {
    let Some(provider) = state.identity.as_ref() else {
        return login_error(&state, "federation_disabled");
    };

    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        tracing::warn!("federated callback without authorization code");
        return login_error(&state, "auth_code_missing");
    };

    let identity = match provider.exchange_code(&code).await {
        Ok(identity) => identity,
        Err(err) => {
            tracing::error!(error = %err, "authorization code exchange failed");
            return login_error(&state, "auth_failed");
        }
    };

    match sessions::federated_sign_in(&state.pool, &state.jwt, identity).await {
        Ok(session) => Redirect::to(&format!("{}/?token={}", state.frontend_url, session.token)),
        Err(AppError::Unauthorized(reason)) => {
            tracing::warn!(reason = %reason, "federated login refused");
            login_error(&state, "email_not_verified")
        }
        Err(err) => {
            tracing::error!(error = %err, "federated login failed");
            login_error(&state, "auth_failed")
        }
    }
}

fn login_error(state: &AppState, code: &str) -> Redirect {
    Redirect::to(&format!("{}/login?error={code}", state.frontend_url))
}
