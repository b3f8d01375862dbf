use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::note::Note;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn is_done(self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TaskKind {
    Bug,
    #[default]
    Feature,
    Refactor,
    Other,
}

/// The pair of fields that must always agree: a task carries a completion
/// timestamp exactly when its status is `done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionState {
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CompletionState {
    pub fn new_pending() -> Self {
        Self {
            status: TaskStatus::Pending,
            completed_at: None,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.status.is_done() == self.completed_at.is_some()
    }
}

/// What the caller asked for regarding the completion date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionPatch {
    /// Field absent from the request.
    #[default]
    Keep,
    /// Explicit `null`.
    Clear,
    /// Explicit date, e.g. a manually chosen completion day.
    Set(DateTime<Utc>),
}

impl CompletionPatch {
    pub fn from_field(field: Option<Option<DateTime<Utc>>>) -> Self {
        match field {
            None => CompletionPatch::Keep,
            Some(None) => CompletionPatch::Clear,
            Some(Some(at)) => CompletionPatch::Set(at),
        }
    }
}

/// The only way a task's status or completion date changes.
///
/// * An explicit `null` date clears the date and pulls a `done` status back
///   to `pending`.
/// * A `done` result keeps an existing date (so repeating `done` is a no-op),
///   takes an explicit date when one is given, or stamps `now`.
/// * Any other status clears the date; an explicit date is ignored.
pub fn apply_status(
    current: CompletionState,
    requested: Option<TaskStatus>,
    completion: CompletionPatch,
    now: DateTime<Utc>,
) -> CompletionState {
    let status = requested.unwrap_or(current.status);

    if completion == CompletionPatch::Clear {
        let status = if status.is_done() { TaskStatus::Pending } else { status };
        return CompletionState {
            status,
            completed_at: None,
        };
    }

    let completed_at = if status.is_done() {
        match completion {
            CompletionPatch::Set(at) => Some(at),
            _ => current.completed_at.or(Some(now)),
        }
    } else {
        None
    };

    CompletionState { status, completed_at }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    /// Display name or email of the assignee.
    pub assigned_to: Option<String>,
    pub assigned_by: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[schema(format = DateTime, example = "2025-10-15T17:00:00Z")]
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTask {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub assigned_to: Option<String>,
    pub assigned_by: String,
    pub kind: TaskKind,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DbTask {
    pub fn completion(&self) -> CompletionState {
        CompletionState {
            status: self.status,
            completed_at: self.completed_at,
        }
    }

    pub fn into_task(self, notes: Vec<Note>) -> Task {
        Task {
            id: self.id,
            title: self.title,
            description: self.description,
            status: self.status,
            assigned_to: self.assigned_to,
            assigned_by: self.assigned_by,
            kind: self.kind,
            priority: self.priority,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
            notes,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateRequest {
    #[schema(example = "Fix login redirect")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "pending")]
    pub status: Option<TaskStatus>,
    #[schema(example = "Ada Lovelace")]
    pub assigned_to: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TaskKind>,
    #[schema(example = "high")]
    pub priority: Option<Priority>,
    #[schema(format = DateTime, example = "2025-10-15T17:00:00Z")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Merge-patch: absent fields are left alone. `assignedTo` and `completedAt`
/// also accept an explicit `null`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub assigned_to: Option<Option<String>>,
    #[serde(rename = "type")]
    pub kind: Option<TaskKind>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>, format = DateTime, example = "2025-10-15T17:00:00Z")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
}
