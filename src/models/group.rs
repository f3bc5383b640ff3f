//! Group, membership, admin binding and application models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Group lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    Pending,
    Active,
    Suspended,
    Inactive,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Pending => "pending",
            GroupStatus::Active => "active",
            GroupStatus::Suspended => "suspended",
            GroupStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(GroupStatus::Pending),
            "active" => Some(GroupStatus::Active),
            "suspended" => Some(GroupStatus::Suspended),
            "inactive" => Some(GroupStatus::Inactive),
            _ => None,
        }
    }
}

/// Application review status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    Archived,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ApplicationStatus::Pending),
            "approved" => Some(ApplicationStatus::Approved),
            "rejected" => Some(ApplicationStatus::Rejected),
            "archived" => Some(ApplicationStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    /// External chat-platform group id
    pub platform_group_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Shared secret for admin binding and code-scoped stores
    pub group_code: Option<String>,
    pub status: String,
    pub activated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn status(&self) -> GroupStatus {
        GroupStatus::parse(&self.status).unwrap_or(GroupStatus::Pending)
    }

    pub fn is_active(&self) -> bool {
        self.status() == GroupStatus::Active
    }

    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => {
                let short: String = self.platform_group_id.chars().take(8).collect();
                format!("group {short}...")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupApplication {
    pub id: Uuid,
    pub platform_group_id: String,
    pub group_name: Option<String>,
    pub contact_info: Option<String>,
    pub group_code: Option<String>,
    pub status: String,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupApplication {
    pub fn status(&self) -> ApplicationStatus {
        ApplicationStatus::parse(&self.status).unwrap_or(ApplicationStatus::Archived)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupMember {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupAdmin {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub granted_at: DateTime<Utc>,
}

/// Payload for a new group application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplicationRequest {
    pub platform_group_id: String,
    pub group_name: String,
    pub contact_info: String,
    pub group_code: String,
}
