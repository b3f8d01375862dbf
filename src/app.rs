use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, patch, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::oauth::{GoogleProvider, IdentityProvider, OAuthConfig};
use crate::routes::{auth, health, notes, subtasks, tasks, users};

const DEV_FRONTEND: &str = "http://localhost:3000";

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    /// `None` when federated login is not configured.
    pub identity: Option<Arc<dyn IdentityProvider>>,
    /// Where the federated callback sends the browser afterwards.
    pub frontend_url: String,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            identity: None,
            frontend_url: DEV_FRONTEND.to_string(),
        }
    }

    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(provider);
        self
    }

    pub fn with_frontend_url(mut self, url: impl Into<String>) -> Self {
        self.frontend_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Allowed browser origins. The first configured one also receives the
/// federated login redirect.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub origins: Vec<String>,
}

impl CorsConfig {
    pub fn from_env() -> Self {
        let mut origins: Vec<String> = std::env::var("FRONTEND_URL")
            .unwrap_or_default()
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        if !origins.iter().any(|origin| origin == DEV_FRONTEND) {
            origins.push(DEV_FRONTEND.to_string());
        }

        Self { origins }
    }

    pub fn frontend_url(&self) -> &str {
        self.origins.first().map(String::as_str).unwrap_or(DEV_FRONTEND)
    }

    pub fn layer(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_origin(AllowOrigin::list(origins))
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let cors = CorsConfig::from_env();

    let mut state = AppState::new(pool, jwt_config).with_frontend_url(cors.frontend_url());
    match OAuthConfig::from_env() {
        Some(config) => state = state.with_identity_provider(Arc::new(GoogleProvider::new(config))),
        None => tracing::info!("GOOGLE_CLIENT_ID/SECRET/REDIRECT_URI not set, federated login disabled"),
    }

    Ok(router(state).layer(cors.layer()))
}

/// All API routes under `/api`, without CORS.
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/google", get(auth::google))
        .route("/google/callback", get(auth::google_callback));

    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/:id",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route("/:id/role", patch(users::update_role));

    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/:id",
            get(tasks::get_task).put(tasks::update_task).delete(tasks::delete_task),
        )
        .route("/:id/notes", get(notes::list_notes).post(notes::add_note))
        .route(
            "/:id/notes/:note_id",
            put(notes::edit_note).delete(notes::delete_note),
        )
        .route("/:id/subtasks", get(subtasks::list_subtasks).post(subtasks::add_subtask))
        .route(
            "/:id/subtasks/:subtask_id",
            put(subtasks::update_subtask).delete(subtasks::delete_subtask),
        );

    let api = Router::new()
        .route("/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/tasks", task_routes);

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
