#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`

use task_tracker::app::{self, AppState};
use task_tracker::db::MIGRATOR;
use task_tracker::jwt::JwtConfig;
use task_tracker::models::role::Role;
use task_tracker::models::user::User;
use task_tracker::oauth::IdentityProvider;
use task_tracker::services::users::{self, NewAccount};

pub const PASSWORD: &str = "password123";
pub const FRONTEND: &str = "http://frontend.test";

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    pub jwt: JwtConfig,
    _dir: TempDir,
}

pub async fn spawn_app() -> Result<TestApp> {
    spawn_app_with(None).await
}

pub async fn spawn_app_with(provider: Option<Arc<dyn IdentityProvider>>) -> Result<TestApp> {
    let dir = tempdir()?;
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(opts).await?;
    MIGRATOR.run(&pool).await?;

    let jwt = JwtConfig::new("test-secret", 1);
    let mut state = AppState::new(pool.clone(), jwt.clone()).with_frontend_url(FRONTEND);
    if let Some(provider) = provider {
        state = state.with_identity_provider(provider);
    }

    Ok(TestApp {
        app: app::router(state),
        pool,
        jwt,
        _dir: dir,
    })
}

impl TestApp {
    /// Creates an account straight through the service layer and returns it
    /// with a valid bearer token.
    pub async fn account(&self, first: &str, last: &str, role: Role) -> Result<(User, String)> {
        let email = format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase());
        let user = users::create_account(
            &self.pool,
            NewAccount {
                email: &email,
                first_name: first,
                last_name: last,
                password: PASSWORD,
                role,
            },
        )
        .await?;
        let token = self.jwt.encode(&user)?;
        Ok((user, token))
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let resp = self.raw(method, uri, token, body).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }

    pub async fn raw(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Response> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };
        Ok(self.app.clone().oneshot(req).await?)
    }
}

pub fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_else(|| panic!("missing string field '{key}' in {value}"))
}
