use std::collections::HashMap;

use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::authz::{authorize, task_scope, Action, Actor, TaskScope};
use crate::errors::{AppError, AppResult};
use crate::models::note::Note;
use crate::models::task::{
    apply_status, CompletionPatch, CompletionState, DbTask, Task, TaskCreateRequest, TaskUpdateRequest,
};
use crate::utils::{required_text, utc_now};

const TASK_COLUMNS: &str =
    "id, title, description, status, assigned_to, assigned_by, kind, priority, created_at, updated_at, completed_at";
pub(crate) const NOTE_COLUMNS: &str = "id, task_id, text, author, kind, created_at, updated_at";

/// Newest first; tasks created within the same instant fall back to insertion order.
const NEWEST_FIRST: &str = "ORDER BY created_at DESC, rowid DESC";

pub async fn list_tasks(pool: &SqlitePool, actor: &Actor) -> AppResult<Vec<Task>> {
    authorize(actor, Action::ListTasks)?;

    let (filter, assignee) = match task_scope(actor) {
        TaskScope::All => ("", None),
        TaskScope::AssignedTo(name) => ("WHERE assigned_to = ?", Some(name)),
    };

    // One read transaction so the notes match the task rows.
    let mut tx = pool.begin().await?;
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks {filter} {NEWEST_FIRST}");
    let mut query = sqlx::query_as::<_, DbTask>(&sql);
    if let Some(name) = &assignee {
        query = query.bind(name.clone());
    }
    let rows = query.fetch_all(&mut *tx).await?;
    let tasks = attach_notes(&mut *tx, rows, filter, assignee).await?;
    tx.commit().await?;

    Ok(tasks)
}

pub async fn get_task(pool: &SqlitePool, actor: &Actor, task_id: Uuid) -> AppResult<Task> {
    let row = fetch_task(pool, task_id).await?;
    authorize(
        actor,
        Action::ViewTask {
            assigned_to: row.assigned_to.as_deref(),
        },
    )?;

    let notes = notes_for(pool, task_id).await?;
    Ok(row.into_task(notes))
}

pub async fn create_task(pool: &SqlitePool, actor: &Actor, input: TaskCreateRequest) -> AppResult<Task> {
    authorize(actor, Action::CreateTask)?;

    let title = required_text("title", &input.title)?;
    let now = utc_now();
    let completion = input
        .completed_at
        .map(CompletionPatch::Set)
        .unwrap_or_default();
    let state = apply_status(CompletionState::new_pending(), input.status, completion, now);
    let task_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO tasks (id, title, description, status, assigned_to, assigned_by, kind, priority, created_at, updated_at, completed_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(task_id)
    .bind(&title)
    .bind(input.description.unwrap_or_default())
    .bind(state.status)
    .bind(normalize_assignee(input.assigned_to))
    .bind(actor.display_name())
    .bind(input.kind.unwrap_or_default())
    .bind(input.priority.unwrap_or_default())
    .bind(now)
    .bind(now)
    .bind(state.completed_at)
    .execute(pool)
    .await?;

    tracing::info!(task_id = %task_id, actor_id = %actor.id, status = ?state.status, "task created");

    let row = fetch_task(pool, task_id).await?;
    Ok(row.into_task(Vec::new()))
}

/// Merge-patch update. Status and completion date only change through
/// [`apply_status`].
pub async fn update_task(
    pool: &SqlitePool,
    actor: &Actor,
    task_id: Uuid,
    patch: TaskUpdateRequest,
) -> AppResult<Task> {
    authorize(actor, Action::UpdateTask)?;

    let title = patch
        .title
        .as_deref()
        .map(|title| required_text("title", title))
        .transpose()?;

    let mut tx = pool.begin().await?;
    let current = fetch_task(&mut *tx, task_id).await?;

    let now = utc_now();
    let state = apply_status(
        current.completion(),
        patch.status,
        CompletionPatch::from_field(patch.completed_at),
        now,
    );
    let assigned_to = match patch.assigned_to {
        None => current.assigned_to,
        Some(value) => normalize_assignee(value),
    };

    sqlx::query(
        "UPDATE tasks SET title = ?, description = ?, status = ?, assigned_to = ?, kind = ?, priority = ?, \
         updated_at = ?, completed_at = ? WHERE id = ?",
    )
    .bind(title.unwrap_or(current.title))
    .bind(patch.description.unwrap_or(current.description))
    .bind(state.status)
    .bind(assigned_to)
    .bind(patch.kind.unwrap_or(current.kind))
    .bind(patch.priority.unwrap_or(current.priority))
    .bind(now)
    .bind(state.completed_at)
    .bind(task_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    if current.status != state.status {
        tracing::info!(task_id = %task_id, from = ?current.status, to = ?state.status, "task status changed");
    }
    tracing::debug!(task_id = %task_id, actor_id = %actor.id, "task updated");

    get_task(pool, actor, task_id).await
}

/// Removes the task with its notes and subtasks atomically.
pub async fn delete_task(pool: &SqlitePool, actor: &Actor, task_id: Uuid) -> AppResult<()> {
    authorize(actor, Action::DeleteTask)?;

    let mut tx = pool.begin().await?;
    let deleted = match delete_with_children(&mut *tx, task_id).await {
        Ok(deleted) => deleted,
        Err(err) => {
            tracing::error!(task_id = %task_id, error = %err, "task delete failed, rolling back");
            return Err(err.into());
        }
    };

    if deleted == 0 {
        return Err(AppError::not_found("task not found"));
    }

    tx.commit().await?;
    tracing::info!(task_id = %task_id, actor_id = %actor.id, "task deleted");
    Ok(())
}

async fn delete_with_children(conn: &mut SqliteConnection, task_id: Uuid) -> Result<u64, sqlx::Error> {
    sqlx::query("DELETE FROM task_notes WHERE task_id = ?")
        .bind(task_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM task_subtasks WHERE task_id = ?")
        .bind(task_id)
        .execute(&mut *conn)
        .await?;

    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(task_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub(crate) async fn fetch_task<'e, E>(executor: E, task_id: Uuid) -> AppResult<DbTask>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?");
    sqlx::query_as::<_, DbTask>(&sql)
        .bind(task_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("task not found"))
}

/// Notes of one task, oldest first.
pub(crate) async fn notes_for<'e, E>(executor: E, task_id: Uuid) -> AppResult<Vec<Note>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {NOTE_COLUMNS} FROM task_notes WHERE task_id = ? ORDER BY created_at ASC, rowid ASC");
    Ok(sqlx::query_as::<_, Note>(&sql)
        .bind(task_id)
        .fetch_all(executor)
        .await?)
}

pub(crate) async fn touch_task(conn: &mut SqliteConnection, task_id: Uuid) -> AppResult<()> {
    sqlx::query("UPDATE tasks SET updated_at = ? WHERE id = ?")
        .bind(utc_now())
        .bind(task_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Loads the notes for every listed row with a single query. The task set is
/// selected again by the same filter rather than bound id by id, which would
/// run into SQLite's host parameter limit on large lists.
async fn attach_notes(
    conn: &mut SqliteConnection,
    rows: Vec<DbTask>,
    filter: &str,
    assignee: Option<String>,
) -> AppResult<Vec<Task>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {NOTE_COLUMNS} FROM task_notes WHERE task_id IN (SELECT id FROM tasks {filter}) \
         ORDER BY created_at ASC, rowid ASC"
    );

    let mut query = sqlx::query_as::<_, Note>(&sql);
    if let Some(name) = assignee {
        query = query.bind(name);
    }

    let mut by_task: HashMap<Uuid, Vec<Note>> = HashMap::new();
    for note in query.fetch_all(conn).await? {
        by_task.entry(note.task_id).or_default().push(note);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let notes = by_task.remove(&row.id).unwrap_or_default();
            row.into_task(notes)
        })
        .collect())
}

/// Blank assignees are stored as unassigned.
fn normalize_assignee(value: Option<String>) -> Option<String> {
    value
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}
