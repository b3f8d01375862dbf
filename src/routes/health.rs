use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::query_scalar;
use utoipa::ToSchema;

use crate::app::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db_ok: bool,
    pub federated_login: bool,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    security(()),
    responses((status = 200, description = "Service and database liveness", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_ok = match query_scalar::<_, i64>("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => true,
        Err(err) => {
            tracing::error!(error = %err, "health check could not reach the database");
            false
        }
    };

    Json(HealthResponse {
        status: if db_ok { "ok" } else { "degraded" },
        db_ok,
        federated_login: state.identity.is_some(),
    })
}
