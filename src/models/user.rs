//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    /// External chat-platform user id
    pub platform_user_id: String,
    pub display_name: Option<String>,
    /// Free-form personal preferences maintained through the AI
    pub preferences: serde_json::Value,
    pub is_banned: bool,
    pub banned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name shown in summaries and AI context
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or("member")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_falls_back_when_display_name_missing() {
        let mut user = User {
            id: Uuid::new_v4(),
            platform_user_id: "U1".to_string(),
            display_name: None,
            preferences: serde_json::json!({}),
            is_banned: false,
            banned_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(user.name(), "member");
        user.display_name = Some("Ana".to_string());
        assert_eq!(user.name(), "Ana");
    }
}
