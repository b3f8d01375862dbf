use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::{authorize, display_name, Action, Actor, UserTarget};
use crate::errors::{AppError, AppResult};
use crate::models::role::Role;
use crate::models::user::{CreateUserRequest, DbUser, User, UserUpdateRequest};
use crate::utils::{hash_password, normalize_email, utc_now};

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, password_hash, role, federated_id, profile_picture, created_at, updated_at";

const EMAIL_TAKEN: &str = "email already in use";
const NAME_TAKEN: &str = "display name already in use";

/// [`display_name`] computed over the `users` columns. Task scope and note
/// authorship key on this value, so no two accounts may share it.
const DISPLAY_NAME_SQL: &str = "CASE WHEN trim(first_name) <> '' AND trim(last_name) <> '' \
     THEN trim(first_name) || ' ' || trim(last_name) ELSE email END";

/// Input for a password-backed account, whoever ends up creating it.
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password: &'a str,
    pub role: Role,
}

/// Inserts a password account. Used by self-registration, admin creation and
/// the bootstrap CLI; callers are responsible for authorization.
pub async fn create_account(pool: &SqlitePool, account: NewAccount<'_>) -> AppResult<User> {
    let email = normalize_email(account.email)?;
    let password_hash = hash_password(account.password)?;
    let name = display_name(account.first_name, account.last_name, &email);
    let now = utc_now();
    let user_id = Uuid::new_v4();

    let sql = format!(
        "INSERT INTO users (id, email, first_name, last_name, password_hash, role, created_at, updated_at) \
         SELECT ?, ?, ?, ?, ?, ?, ?, ? WHERE NOT EXISTS (SELECT 1 FROM users WHERE {DISPLAY_NAME_SQL} = ?)"
    );
    let result = sqlx::query(&sql)
        .bind(user_id)
        .bind(&email)
        .bind(account.first_name.trim())
        .bind(account.last_name.trim())
        .bind(password_hash)
        .bind(account.role)
        .bind(now)
        .bind(now)
        .bind(&name)
        .execute(pool)
        .await
        .map_err(|err| AppError::from_unique_violation(err, EMAIL_TAKEN))?;

    if result.rows_affected() == 0 {
        return Err(AppError::conflict(NAME_TAKEN));
    }

    tracing::info!(user_id = %user_id, role = %account.role, "account created");

    fetch_user(pool, user_id).await.map(User::from)
}

pub async fn create_user(pool: &SqlitePool, actor: &Actor, input: CreateUserRequest) -> AppResult<User> {
    let role = input.role.unwrap_or_default();
    authorize(actor, Action::CreateUser { role })?;

    create_account(
        pool,
        NewAccount {
            email: &input.email,
            first_name: &input.first_name,
            last_name: &input.last_name,
            password: &input.password,
            role,
        },
    )
    .await
}

pub async fn list_users(pool: &SqlitePool, actor: &Actor) -> AppResult<Vec<User>> {
    authorize(actor, Action::ListUsers)?;

    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY first_name ASC, last_name ASC, email ASC");
    let rows = sqlx::query_as::<_, DbUser>(&sql).fetch_all(pool).await?;

    Ok(rows.into_iter().map(User::from).collect())
}

pub async fn get_user(pool: &SqlitePool, actor: &Actor, user_id: Uuid) -> AppResult<User> {
    if user_id != actor.id {
        authorize(actor, Action::ViewUser)?;
    }
    fetch_user(pool, user_id).await.map(User::from)
}

/// Profile fields only; the role goes through [`update_role`].
pub async fn update_user(
    pool: &SqlitePool,
    actor: &Actor,
    user_id: Uuid,
    input: UserUpdateRequest,
) -> AppResult<User> {
    let current = fetch_user(pool, user_id).await?;
    authorize(
        actor,
        Action::UpdateUser {
            target: target_of(&current),
        },
    )?;

    let email = match input.email.as_deref() {
        Some(email) => normalize_email(email)?,
        None => current.email,
    };
    let first_name = input
        .first_name
        .map(|name| name.trim().to_string())
        .unwrap_or(current.first_name);
    let last_name = input
        .last_name
        .map(|name| name.trim().to_string())
        .unwrap_or(current.last_name);
    let password_hash = match input.password.as_deref() {
        Some(password) => Some(hash_password(password)?),
        None => current.password_hash,
    };

    let name = display_name(&first_name, &last_name, &email);

    let sql = format!(
        "UPDATE users SET email = ?, first_name = ?, last_name = ?, password_hash = ?, updated_at = ? \
         WHERE id = ? AND NOT EXISTS (SELECT 1 FROM users WHERE id <> ? AND {DISPLAY_NAME_SQL} = ?)"
    );
    let result = sqlx::query(&sql)
        .bind(&email)
        .bind(&first_name)
        .bind(&last_name)
        .bind(password_hash)
        .bind(utc_now())
        .bind(user_id)
        .bind(user_id)
        .bind(&name)
        .execute(pool)
        .await
        .map_err(|err| AppError::from_unique_violation(err, EMAIL_TAKEN))?;

    if result.rows_affected() == 0 {
        return Err(AppError::conflict(NAME_TAKEN));
    }

    tracing::info!(user_id = %user_id, actor_id = %actor.id, "account updated");

    fetch_user(pool, user_id).await.map(User::from)
}

pub async fn update_role(pool: &SqlitePool, actor: &Actor, user_id: Uuid, new_role: Role) -> AppResult<User> {
    let current = fetch_user(pool, user_id).await?;
    authorize(
        actor,
        Action::UpdateUserRole {
            target: target_of(&current),
            new_role,
        },
    )?;

    sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
        .bind(new_role)
        .bind(utc_now())
        .bind(user_id)
        .execute(pool)
        .await?;

    tracing::info!(
        user_id = %user_id,
        actor_id = %actor.id,
        from = %current.role,
        to = %new_role,
        "role changed"
    );

    fetch_user(pool, user_id).await.map(User::from)
}

pub async fn delete_user(pool: &SqlitePool, actor: &Actor, user_id: Uuid) -> AppResult<()> {
    let current = fetch_user(pool, user_id).await?;
    authorize(
        actor,
        Action::DeleteUser {
            target: target_of(&current),
        },
    )?;

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("user not found"));
    }

    tracing::info!(user_id = %user_id, actor_id = %actor.id, "account deleted");
    Ok(())
}

pub async fn fetch_user(pool: &SqlitePool, user_id: Uuid) -> AppResult<DbUser> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    sqlx::query_as::<_, DbUser>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<DbUser>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    Ok(sqlx::query_as::<_, DbUser>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_by_federated_id(pool: &SqlitePool, federated_id: &str) -> AppResult<Option<DbUser>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE federated_id = ?");
    Ok(sqlx::query_as::<_, DbUser>(&sql)
        .bind(federated_id)
        .fetch_optional(pool)
        .await?)
}

/// Profile data supplied by the identity provider.
#[derive(Debug, Clone)]
pub struct FederatedProfile<'a> {
    pub federated_id: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub picture: Option<&'a str>,
}

/// Refreshes names and picture of an account already linked to the provider.
/// Empty values from the provider never overwrite stored ones, and names that
/// would collide with another account's display name are left as stored.
pub async fn refresh_federated(pool: &SqlitePool, current: DbUser, profile: &FederatedProfile<'_>) -> AppResult<User> {
    let first_name = non_empty_or(profile.first_name, current.first_name);
    let last_name = non_empty_or(profile.last_name, current.last_name);
    let name = display_name(&first_name, &last_name, &current.email);
    let picture = profile.picture.map(str::to_string).or(current.profile_picture);

    let sql = format!(
        "UPDATE users SET \
         first_name = CASE WHEN taken THEN first_name ELSE ? END, \
         last_name = CASE WHEN taken THEN last_name ELSE ? END, \
         profile_picture = ?, updated_at = ? \
         FROM (SELECT EXISTS (SELECT 1 FROM users WHERE id <> ? AND {DISPLAY_NAME_SQL} = ?) AS taken) \
         WHERE id = ?"
    );
    sqlx::query(&sql)
        .bind(&first_name)
        .bind(&last_name)
        .bind(picture)
        .bind(utc_now())
        .bind(current.id)
        .bind(&name)
        .bind(current.id)
        .execute(pool)
        .await?;

    fetch_user(pool, current.id).await.map(User::from)
}

/// Attaches a provider subject to an existing password account.
pub async fn link_federated(pool: &SqlitePool, user_id: Uuid, profile: &FederatedProfile<'_>) -> AppResult<User> {
    sqlx::query(
        "UPDATE users SET federated_id = ?, profile_picture = COALESCE(?, profile_picture), updated_at = ? WHERE id = ?",
    )
    .bind(profile.federated_id)
    .bind(profile.picture)
    .bind(utc_now())
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(|err| AppError::from_unique_violation(err, "identity already linked to another account"))?;

    tracing::info!(user_id = %user_id, "federated identity linked");
    fetch_user(pool, user_id).await.map(User::from)
}

/// New `user`-role account without a password.
pub async fn create_federated(pool: &SqlitePool, profile: &FederatedProfile<'_>) -> AppResult<User> {
    let email = normalize_email(profile.email)?;
    let first_name = profile.first_name.trim();
    let last_name = profile.last_name.trim();
    let name = display_name(first_name, last_name, &email);
    let now = utc_now();
    let user_id = Uuid::new_v4();

    let sql = format!(
        "INSERT INTO users (id, email, first_name, last_name, role, federated_id, profile_picture, created_at, updated_at) \
         SELECT ?, ?, ?, ?, ?, ?, ?, ?, ? WHERE NOT EXISTS (SELECT 1 FROM users WHERE {DISPLAY_NAME_SQL} = ?)"
    );
    let result = sqlx::query(&sql)
        .bind(user_id)
        .bind(&email)
        .bind(first_name)
        .bind(last_name)
        .bind(Role::User)
        .bind(profile.federated_id)
        .bind(profile.picture)
        .bind(now)
        .bind(now)
        .bind(&name)
        .execute(pool)
        .await
        .map_err(|err| AppError::from_unique_violation(err, EMAIL_TAKEN))?;

    if result.rows_affected() == 0 {
        return Err(AppError::conflict(NAME_TAKEN));
    }

    tracing::info!(user_id = %user_id, "federated account created");
    fetch_user(pool, user_id).await.map(User::from)
}

fn target_of(user: &DbUser) -> UserTarget {
    UserTarget {
        id: user.id,
        role: user.role,
    }
}

fn non_empty_or(candidate: &str, fallback: String) -> String {
    if candidate.trim().is_empty() {
        fallback
    } else {
        candidate.trim().to_string()
    }
}
