//! Security log and AI prompt models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SecurityLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Option<Uuid>,
    /// Comma-joined trigger reasons, e.g. "markup_tags,length_exceeded"
    pub reasons: String,
    pub original_text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AiPrompt {
    pub id: Uuid,
    pub name: String,
    pub content: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
