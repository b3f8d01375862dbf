use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Checklist item under a task.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New subtasks always start open.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubtaskCreateRequest {
    #[schema(example = "Update the migration guide")]
    pub title: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SubtaskUpdateRequest {
    pub title: Option<String>,
    pub completed: Option<bool>,
}
