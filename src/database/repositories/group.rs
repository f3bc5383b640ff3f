//! Group, membership, admin and application repositories

use crate::models::group::{
    ApplicationStatus, CreateApplicationRequest, Group, GroupAdmin, GroupApplication, GroupMember,
    GroupStatus,
};
use crate::utils::errors::OrderBuddyError;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find group by platform id, creating a pending row on first contact
    pub async fn get_or_create(&self, platform_group_id: &str) -> Result<Group, OrderBuddyError> {
        if let Some(group) = self.find_by_platform_id(platform_group_id).await? {
            return Ok(group);
        }

        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (platform_group_id)
            VALUES ($1)
            ON CONFLICT (platform_group_id) DO UPDATE SET updated_at = NOW()
            RETURNING id, platform_group_id, name, description, group_code, status, activated_at, created_at, updated_at
            "#
        )
        .bind(platform_group_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(group)
    }

    pub async fn find_by_platform_id(
        &self,
        platform_group_id: &str,
    ) -> Result<Option<Group>, OrderBuddyError> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, platform_group_id, name, description, group_code, status, activated_at, created_at, updated_at FROM groups WHERE platform_group_id = $1"
        )
        .bind(platform_group_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>, OrderBuddyError> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, platform_group_id, name, description, group_code, status, activated_at, created_at, updated_at FROM groups WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: GroupStatus,
    ) -> Result<Group, OrderBuddyError> {
        let activated_at = match status {
            GroupStatus::Active => Some(Utc::now()),
            _ => None,
        };

        let group = sqlx::query_as::<_, Group>(
            r#"
            UPDATE groups
            SET status = $2,
                activated_at = COALESCE(activated_at, $3),
                updated_at = $4
            WHERE id = $1
            RETURNING id, platform_group_id, name, description, group_code, status, activated_at, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(status.as_str())
        .bind(activated_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(group)
    }

    /// Activate a group with the name and code from its approved application
    pub async fn activate(
        &self,
        id: Uuid,
        name: &str,
        group_code: &str,
    ) -> Result<Group, OrderBuddyError> {
        let group = sqlx::query_as::<_, Group>(
            r#"
            UPDATE groups
            SET status = 'active',
                name = $2,
                group_code = $3,
                activated_at = COALESCE(activated_at, $4),
                updated_at = $4
            WHERE id = $1
            RETURNING id, platform_group_id, name, description, group_code, status, activated_at, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(name)
        .bind(group_code)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(group)
    }
}

#[derive(Debug, Clone)]
pub struct ApplicationRepository {
    pool: PgPool,
}

impl ApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        request: CreateApplicationRequest,
    ) -> Result<GroupApplication, OrderBuddyError> {
        let application = sqlx::query_as::<_, GroupApplication>(
            r#"
            INSERT INTO group_applications (platform_group_id, group_name, contact_info, group_code)
            VALUES ($1, $2, $3, $4)
            RETURNING id, platform_group_id, group_name, contact_info, group_code, status, reviewed_at, review_note, created_at, updated_at
            "#
        )
        .bind(request.platform_group_id)
        .bind(request.group_name)
        .bind(request.contact_info)
        .bind(request.group_code)
        .fetch_one(&self.pool)
        .await?;

        Ok(application)
    }

    /// Most recent application for a group, regardless of status
    pub async fn latest_for_group(
        &self,
        platform_group_id: &str,
    ) -> Result<Option<GroupApplication>, OrderBuddyError> {
        let application = sqlx::query_as::<_, GroupApplication>(
            r#"
            SELECT id, platform_group_id, group_name, contact_info, group_code, status, reviewed_at, review_note, created_at, updated_at
            FROM group_applications
            WHERE platform_group_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#
        )
        .bind(platform_group_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(application)
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        review_note: Option<&str>,
    ) -> Result<GroupApplication, OrderBuddyError> {
        let application = sqlx::query_as::<_, GroupApplication>(
            r#"
            UPDATE group_applications
            SET status = $2,
                reviewed_at = $3,
                review_note = COALESCE($4, review_note),
                updated_at = $3
            WHERE id = $1
            RETURNING id, platform_group_id, group_name, contact_info, group_code, status, reviewed_at, review_note, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(review_note)
        .fetch_one(&self.pool)
        .await?;

        Ok(application)
    }

    /// Archive a rejected application so the group may reapply
    pub async fn archive(&self, id: Uuid) -> Result<GroupApplication, OrderBuddyError> {
        self.set_status(id, ApplicationStatus::Archived, None).await
    }
}

#[derive(Debug, Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert membership. Returns the row plus whether it was newly created.
    pub async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<(GroupMember, bool), OrderBuddyError> {
        let inserted = sqlx::query_as::<_, GroupMember>(
            r#"
            INSERT INTO group_members (group_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (group_id, user_id) DO NOTHING
            RETURNING id, group_id, user_id, joined_at
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(member) = inserted {
            return Ok((member, true));
        }

        let member = sqlx::query_as::<_, GroupMember>(
            "SELECT id, group_id, user_id, joined_at FROM group_members WHERE group_id = $1 AND user_id = $2"
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((member, false))
    }

    pub async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> Result<(), OrderBuddyError> {
        sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, OrderBuddyError> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Whether the user belongs to at least one active group.
    /// Gates the one-on-one conversation surface.
    pub async fn is_member_of_any_active_group(
        &self,
        user_id: Uuid,
    ) -> Result<bool, OrderBuddyError> {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM group_members gm
                JOIN groups g ON g.id = gm.group_id
                WHERE gm.user_id = $1 AND g.status = 'active'
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Active groups a user belongs to, most recently joined first
    pub async fn groups_for_user(&self, user_id: Uuid) -> Result<Vec<Group>, OrderBuddyError> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT g.id, g.platform_group_id, g.name, g.description, g.group_code, g.status, g.activated_at, g.created_at, g.updated_at
            FROM groups g
            JOIN group_members gm ON gm.group_id = g.id
            WHERE gm.user_id = $1 AND g.status = 'active'
            ORDER BY gm.joined_at DESC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }
}

#[derive(Debug, Clone)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn is_admin(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, OrderBuddyError> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM group_admins WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Grant admin. Idempotent on the unique (group, user) pair.
    pub async fn add_admin(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<GroupAdmin, OrderBuddyError> {
        let inserted = sqlx::query_as::<_, GroupAdmin>(
            r#"
            INSERT INTO group_admins (group_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (group_id, user_id) DO NOTHING
            RETURNING id, group_id, user_id, granted_at
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(admin) = inserted {
            return Ok(admin);
        }

        let admin = sqlx::query_as::<_, GroupAdmin>(
            "SELECT id, group_id, user_id, granted_at FROM group_admins WHERE group_id = $1 AND user_id = $2"
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(admin)
    }

    /// Revoke admin, refusing to remove the last admin of the group.
    /// Runs inside one transaction with the rows locked so two concurrent
    /// unbinds cannot both pass the count check.
    pub async fn remove_admin_checked(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), OrderBuddyError> {
        let mut tx = self.pool.begin().await?;

        let admins: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM group_admins WHERE group_id = $1 FOR UPDATE",
        )
        .bind(group_id)
        .fetch_all(&mut *tx)
        .await?;

        if !admins.iter().any(|(id,)| *id == user_id) {
            tx.rollback().await?;
            return Err(OrderBuddyError::PermissionDenied(
                "user is not an admin of this group".to_string(),
            ));
        }
        if admins.len() <= 1 {
            tx.rollback().await?;
            return Err(OrderBuddyError::LastAdmin);
        }

        sqlx::query("DELETE FROM group_admins WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn count_for_group(&self, group_id: Uuid) -> Result<i64, OrderBuddyError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM group_admins WHERE group_id = $1")
            .bind(group_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }
}
