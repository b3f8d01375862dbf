use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::authz::{authorize, Action, Actor};
use crate::errors::{AppError, AppResult};
use crate::models::note::{Note, NoteCreateRequest, NoteUpdateRequest};
use crate::services::tasks::{fetch_task, notes_for, touch_task, NOTE_COLUMNS};
use crate::utils::{required_text, utc_now};

pub async fn list_notes(pool: &SqlitePool, actor: &Actor, task_id: Uuid) -> AppResult<Vec<Note>> {
    let task = fetch_task(pool, task_id).await?;
    authorize(
        actor,
        Action::ViewTask {
            assigned_to: task.assigned_to.as_deref(),
        },
    )?;

    notes_for(pool, task_id).await
}

pub async fn add_note(pool: &SqlitePool, actor: &Actor, task_id: Uuid, input: NoteCreateRequest) -> AppResult<Note> {
    let text = required_text("text", &input.text)?;

    let mut tx = pool.begin().await?;
    let task = fetch_task(&mut *tx, task_id).await?;
    authorize(
        actor,
        Action::AddNote {
            assigned_to: task.assigned_to.as_deref(),
        },
    )?;

    let note_id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query(
        "INSERT INTO task_notes (id, task_id, text, author, kind, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(note_id)
    .bind(task_id)
    .bind(&text)
    .bind(actor.display_name())
    .bind(input.kind.unwrap_or_default())
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    touch_task(&mut *tx, task_id).await?;
    let note = fetch_note(&mut *tx, task_id, note_id).await?;
    tx.commit().await?;

    tracing::info!(task_id = %task_id, note_id = %note_id, actor_id = %actor.id, "note added");
    Ok(note)
}

pub async fn edit_note(
    pool: &SqlitePool,
    actor: &Actor,
    task_id: Uuid,
    note_id: Uuid,
    input: NoteUpdateRequest,
) -> AppResult<Note> {
    let text = input
        .text
        .as_deref()
        .map(|text| required_text("text", text))
        .transpose()?;

    let mut tx = pool.begin().await?;
    let task = fetch_task(&mut *tx, task_id).await?;
    let current = fetch_note(&mut *tx, task_id, note_id).await?;
    authorize(
        actor,
        Action::EditNote {
            author: &current.author,
            assigned_to: task.assigned_to.as_deref(),
        },
    )?;

    sqlx::query("UPDATE task_notes SET text = ?, kind = ?, updated_at = ? WHERE id = ?")
        .bind(text.unwrap_or(current.text))
        .bind(input.kind.unwrap_or(current.kind))
        .bind(utc_now())
        .bind(note_id)
        .execute(&mut *tx)
        .await?;

    touch_task(&mut *tx, task_id).await?;
    let note = fetch_note(&mut *tx, task_id, note_id).await?;
    tx.commit().await?;

    tracing::debug!(task_id = %task_id, note_id = %note_id, actor_id = %actor.id, "note edited");
    Ok(note)
}

pub async fn delete_note(pool: &SqlitePool, actor: &Actor, task_id: Uuid, note_id: Uuid) -> AppResult<()> {
    let mut tx = pool.begin().await?;
    let task = fetch_task(&mut *tx, task_id).await?;
    let current = fetch_note(&mut *tx, task_id, note_id).await?;
    authorize(
        actor,
        Action::DeleteNote {
            author: &current.author,
            assigned_to: task.assigned_to.as_deref(),
        },
    )?;

    sqlx::query("DELETE FROM task_notes WHERE id = ?")
        .bind(note_id)
        .execute(&mut *tx)
        .await?;

    touch_task(&mut *tx, task_id).await?;
    tx.commit().await?;

    tracing::info!(task_id = %task_id, note_id = %note_id, actor_id = %actor.id, "note deleted");
    Ok(())
}

/// A note is only found through the task it belongs to.
async fn fetch_note(conn: &mut SqliteConnection, task_id: Uuid, note_id: Uuid) -> AppResult<Note> {
    let sql = format!("SELECT {NOTE_COLUMNS} FROM task_notes WHERE id = ? AND task_id = ?");
    sqlx::query_as::<_, Note>(&sql)
        .bind(note_id)
        .bind(task_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found("note not found"))
}
