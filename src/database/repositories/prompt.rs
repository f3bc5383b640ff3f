//! AI prompt repository

use crate::models::system::AiPrompt;
use crate::utils::errors::OrderBuddyError;
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct PromptRepository {
    pool: PgPool,
}

impl PromptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<AiPrompt>, OrderBuddyError> {
        let prompt = sqlx::query_as::<_, AiPrompt>(
            "SELECT id, name, content, is_active, created_at, updated_at FROM ai_prompts WHERE name = $1 AND is_active = TRUE"
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(prompt)
    }
}
