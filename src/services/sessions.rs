use sqlx::SqlitePool;

use crate::errors::{AppError, AppResult};
use crate::jwt::JwtConfig;
use crate::models::role::Role;
use crate::models::user::{AuthResponse, LoginRequest, RegisterRequest, User};
use crate::oauth::FederatedIdentity;
use crate::services::users::{self, FederatedProfile, NewAccount};
use crate::utils::{normalize_email, verify_password};

const INVALID_CREDENTIALS: &str = "invalid email or password";

pub fn issue(jwt: &JwtConfig, user: User) -> AppResult<AuthResponse> {
    let token = jwt.encode(&user)?;
    Ok(AuthResponse { token, user })
}

/// Self-registration always yields a `user` account.
pub async fn register(pool: &SqlitePool, jwt: &JwtConfig, input: RegisterRequest) -> AppResult<AuthResponse> {
    let user = users::create_account(
        pool,
        NewAccount {
            email: &input.email,
            first_name: &input.first_name,
            last_name: &input.last_name,
            password: &input.password,
            role: Role::User,
        },
    )
    .await?;

    issue(jwt, user)
}

pub async fn login(pool: &SqlitePool, jwt: &JwtConfig, input: LoginRequest) -> AppResult<AuthResponse> {
    let email = normalize_email(&input.email).map_err(|_| AppError::unauthorized(INVALID_CREDENTIALS))?;

    let db_user = users::find_by_email(pool, &email)
        .await?
        .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

    let password_hash = db_user
        .password_hash
        .as_deref()
        .ok_or_else(|| AppError::unauthorized("account uses federated sign-in"))?;

    if !verify_password(&input.password, password_hash)? {
        tracing::info!(user_id = %db_user.id, "password login rejected");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    tracing::info!(user_id = %db_user.id, "password login");
    issue(jwt, db_user.into())
}

/// Resolves a provider identity to a local account, linking or creating one
/// as needed, and issues a session token for it.
pub async fn federated_sign_in(
    pool: &SqlitePool,
    jwt: &JwtConfig,
    identity: FederatedIdentity,
) -> AppResult<AuthResponse> {
    if !identity.email_verified {
        return Err(AppError::unauthorized("email not verified by identity provider"));
    }

    let (first_name, last_name) = split_name(identity.name.as_deref().unwrap_or_default());
    let profile = FederatedProfile {
        federated_id: &identity.subject,
        email: &identity.email,
        first_name: &first_name,
        last_name: &last_name,
        picture: identity.picture.as_deref(),
    };

    let user = if let Some(existing) = users::find_by_federated_id(pool, &identity.subject).await? {
        users::refresh_federated(pool, existing, &profile).await?
    } else {
        let email = normalize_email(&identity.email)?;
        match users::find_by_email(pool, &email).await? {
            Some(existing) => users::link_federated(pool, existing.id, &profile).await?,
            None => users::create_federated(pool, &profile).await?,
        }
    };

    tracing::info!(user_id = %user.id, "federated login");
    issue(jwt, user)
}

/// First word is the first name, the rest is the last name.
pub fn split_name(name: &str) -> (String, String) {
    let mut parts = name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}
