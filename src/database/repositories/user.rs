//! User repository implementation

use crate::models::user::User;
use crate::utils::errors::OrderBuddyError;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find user by platform id, creating a fresh row on first contact
    pub async fn get_or_create(
        &self,
        platform_user_id: &str,
        display_name: Option<&str>,
    ) -> Result<User, OrderBuddyError> {
        if let Some(user) = self.find_by_platform_id(platform_user_id).await? {
            return Ok(user);
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (platform_user_id, display_name)
            VALUES ($1, $2)
            ON CONFLICT (platform_user_id) DO UPDATE SET updated_at = NOW()
            RETURNING id, platform_user_id, display_name, preferences, is_banned, banned_at, created_at, updated_at
            "#
        )
        .bind(platform_user_id)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_platform_id(
        &self,
        platform_user_id: &str,
    ) -> Result<Option<User>, OrderBuddyError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, platform_user_id, display_name, preferences, is_banned, banned_at, created_at, updated_at FROM users WHERE platform_user_id = $1"
        )
        .bind(platform_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Fetch several users in one round trip
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, OrderBuddyError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(
            "SELECT id, platform_user_id, display_name, preferences, is_banned, banned_at, created_at, updated_at FROM users WHERE id = ANY($1)"
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, OrderBuddyError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, platform_user_id, display_name, preferences, is_banned, banned_at, created_at, updated_at FROM users WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Ban a user. Idempotent; the first ban timestamp is kept.
    pub async fn ban(&self, id: Uuid) -> Result<User, OrderBuddyError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_banned = TRUE,
                banned_at = COALESCE(banned_at, $2),
                updated_at = $2
            WHERE id = $1
            RETURNING id, platform_user_id, display_name, preferences, is_banned, banned_at, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Replace the stored preference document
    pub async fn set_preferences(
        &self,
        id: Uuid,
        preferences: serde_json::Value,
    ) -> Result<User, OrderBuddyError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET preferences = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, platform_user_id, display_name, preferences, is_banned, banned_at, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(preferences)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn set_display_name(
        &self,
        id: Uuid,
        display_name: &str,
    ) -> Result<User, OrderBuddyError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET display_name = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, platform_user_id, display_name, preferences, is_banned, banned_at, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(display_name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}
