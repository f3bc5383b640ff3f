//! Security log repository

use crate::models::system::SecurityLog;
use crate::utils::errors::OrderBuddyError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SecurityLogRepository {
    pool: PgPool,
}

impl SecurityLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        group_id: Option<Uuid>,
        reasons: &str,
        original_text: &str,
    ) -> Result<SecurityLog, OrderBuddyError> {
        let log = sqlx::query_as::<_, SecurityLog>(
            r#"
            INSERT INTO security_logs (user_id, group_id, reasons, original_text)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, group_id, reasons, original_text, created_at
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .bind(reasons)
        .bind(original_text)
        .fetch_one(&self.pool)
        .await?;

        Ok(log)
    }

    /// All-time violation count for a user. Monotonic; drives the ban threshold.
    pub async fn count_for_user(&self, user_id: Uuid) -> Result<i64, OrderBuddyError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM security_logs WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }
}
