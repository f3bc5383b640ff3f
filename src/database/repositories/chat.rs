//! Chat history repository

use crate::models::chat::ChatMessage;
use crate::utils::errors::OrderBuddyError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        group_id: Option<Uuid>,
        user_id: Uuid,
        session_id: Option<Uuid>,
        role: &str,
        content: &str,
    ) -> Result<ChatMessage, OrderBuddyError> {
        let message = sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO chat_messages (group_id, user_id, session_id, role, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, group_id, user_id, session_id, role, content, created_at
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(session_id)
        .bind(role)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    /// Recent messages of one group session, oldest first
    pub async fn session_messages(
        &self,
        session_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, OrderBuddyError> {
        let mut messages = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, group_id, user_id, session_id, role, content, created_at
            FROM chat_messages
            WHERE session_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        messages.reverse();
        Ok(messages)
    }

    /// Recent messages of a group outside any session, oldest first.
    /// Used by the application conversation.
    pub async fn group_messages(
        &self,
        group_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, OrderBuddyError> {
        let mut messages = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, group_id, user_id, session_id, role, content, created_at
            FROM chat_messages
            WHERE group_id = $1 AND session_id IS NULL
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(group_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        messages.reverse();
        Ok(messages)
    }

    /// Recent one-on-one messages of a user, oldest first
    pub async fn personal_messages(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, OrderBuddyError> {
        let mut messages = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, group_id, user_id, session_id, role, content, created_at
            FROM chat_messages
            WHERE user_id = $1 AND group_id IS NULL
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        messages.reverse();
        Ok(messages)
    }
}
