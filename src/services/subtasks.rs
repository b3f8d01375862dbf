use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::authz::{authorize, Action, Actor};
use crate::errors::{AppError, AppResult};
use crate::models::subtask::{Subtask, SubtaskCreateRequest, SubtaskUpdateRequest};
use crate::services::tasks::{fetch_task, touch_task};
use crate::utils::{required_text, utc_now};

const SUBTASK_COLUMNS: &str = "id, task_id, title, completed, created_at, updated_at";

/// Subtasks of one task in the order they were added. Visible to whoever can
/// see the task.
pub async fn list_subtasks(pool: &SqlitePool, actor: &Actor, task_id: Uuid) -> AppResult<Vec<Subtask>> {
    let task = fetch_task(pool, task_id).await?;
    authorize(
        actor,
        Action::ViewTask {
            assigned_to: task.assigned_to.as_deref(),
        },
    )?;

    let sql = format!("SELECT {SUBTASK_COLUMNS} FROM task_subtasks WHERE task_id = ? ORDER BY created_at ASC, rowid ASC");
    Ok(sqlx::query_as::<_, Subtask>(&sql)
        .bind(task_id)
        .fetch_all(pool)
        .await?)
}

pub async fn add_subtask(
    pool: &SqlitePool,
    actor: &Actor,
    task_id: Uuid,
    input: SubtaskCreateRequest,
) -> AppResult<Subtask> {
    authorize(actor, Action::UpdateTask)?;
    let title = required_text("title", &input.title)?;

    let mut tx = pool.begin().await?;
    fetch_task(&mut *tx, task_id).await?;

    let subtask_id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query(
        "INSERT INTO task_subtasks (id, task_id, title, completed, created_at, updated_at) VALUES (?, ?, ?, 0, ?, ?)",
    )
    .bind(subtask_id)
    .bind(task_id)
    .bind(&title)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    touch_task(&mut *tx, task_id).await?;
    let subtask = fetch_subtask(&mut *tx, task_id, subtask_id).await?;
    tx.commit().await?;

    tracing::info!(task_id = %task_id, subtask_id = %subtask_id, actor_id = %actor.id, "subtask added");
    Ok(subtask)
}

/// Merge-patch of title and completion flag.
pub async fn update_subtask(
    pool: &SqlitePool,
    actor: &Actor,
    task_id: Uuid,
    subtask_id: Uuid,
    input: SubtaskUpdateRequest,
) -> AppResult<Subtask> {
    authorize(actor, Action::UpdateTask)?;
    let title = input
        .title
        .as_deref()
        .map(|title| required_text("title", title))
        .transpose()?;

    let mut tx = pool.begin().await?;
    fetch_task(&mut *tx, task_id).await?;
    let current = fetch_subtask(&mut *tx, task_id, subtask_id).await?;

    let completed = input.completed.unwrap_or(current.completed);
    sqlx::query("UPDATE task_subtasks SET title = ?, completed = ?, updated_at = ? WHERE id = ?")
        .bind(title.unwrap_or(current.title))
        .bind(completed)
        .bind(utc_now())
        .bind(subtask_id)
        .execute(&mut *tx)
        .await?;

    touch_task(&mut *tx, task_id).await?;
    let subtask = fetch_subtask(&mut *tx, task_id, subtask_id).await?;
    tx.commit().await?;

    if current.completed != completed {
        tracing::info!(task_id = %task_id, subtask_id = %subtask_id, completed, "subtask toggled");
    }
    Ok(subtask)
}

pub async fn delete_subtask(pool: &SqlitePool, actor: &Actor, task_id: Uuid, subtask_id: Uuid) -> AppResult<()> {
    authorize(actor, Action::UpdateTask)?;

    let mut tx = pool.begin().await?;
    fetch_task(&mut *tx, task_id).await?;
    let result = sqlx::query("DELETE FROM task_subtasks WHERE id = ? AND task_id = ?")
        .bind(subtask_id)
        .bind(task_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("subtask not found"));
    }

    touch_task(&mut *tx, task_id).await?;
    tx.commit().await?;

    tracing::info!(task_id = %task_id, subtask_id = %subtask_id, actor_id = %actor.id, "subtask deleted");
    Ok(())
}

async fn fetch_subtask(conn: &mut SqliteConnection, task_id: Uuid, subtask_id: Uuid) -> AppResult<Subtask> {
    let sql = format!("SELECT {SUBTASK_COLUMNS} FROM task_subtasks WHERE id = ? AND task_id = ?");
    sqlx::query_as::<_, Subtask>(&sql)
        .bind(subtask_id)
        .bind(task_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found("subtask not found"))
}
