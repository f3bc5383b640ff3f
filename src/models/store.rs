//! Store and menu models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Store visibility: shared by everyone or exclusive to one group code
pub const SCOPE_GLOBAL: &str = "global";
pub const SCOPE_GROUP: &str = "group";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub scope: String,
    pub group_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One orderable menu line, flattened across store/category/item for
/// price resolution and AI context building.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MenuEntry {
    pub item_id: Uuid,
    pub store_id: Uuid,
    pub store_name: String,
    pub category: String,
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
}
