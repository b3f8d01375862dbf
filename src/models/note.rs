use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum NoteKind {
    Bug,
    Solution,
    Review,
    #[default]
    Other,
}

/// Troubleshooting note attached to a task.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub task_id: Uuid,
    pub text: String,
    pub author: String,
    #[serde(rename = "type")]
    pub kind: NoteKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NoteCreateRequest {
    #[schema(example = "Redirect loses the token when the origin has a trailing slash")]
    pub text: String,
    #[serde(rename = "type")]
    pub kind: Option<NoteKind>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct NoteUpdateRequest {
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<NoteKind>,
}
