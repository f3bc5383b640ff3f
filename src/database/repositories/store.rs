//! Store and menu repository

use crate::models::store::{MenuEntry, Store};
use crate::utils::errors::OrderBuddyError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: PgPool,
}

impl StoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active stores visible to a group: every global store plus the
    /// stores scoped to the group's code.
    pub async fn stores_for_group(
        &self,
        group_code: Option<&str>,
    ) -> Result<Vec<Store>, OrderBuddyError> {
        let stores = sqlx::query_as::<_, Store>(
            r#"
            SELECT id, name, phone, address, description, is_active, scope, group_code, created_at, updated_at
            FROM stores
            WHERE is_active = TRUE
              AND (scope = 'global' OR (scope = 'group' AND group_code = $1))
            ORDER BY name
            "#
        )
        .bind(group_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(stores)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Store>, OrderBuddyError> {
        let store = sqlx::query_as::<_, Store>(
            "SELECT id, name, phone, address, description, is_active, scope, group_code, created_at, updated_at FROM stores WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(store)
    }

    /// Flattened, available menu lines for the given stores
    pub async fn menu_entries_for_stores(
        &self,
        store_ids: &[Uuid],
    ) -> Result<Vec<MenuEntry>, OrderBuddyError> {
        if store_ids.is_empty() {
            return Ok(Vec::new());
        }

        let entries = sqlx::query_as::<_, MenuEntry>(
            r#"
            SELECT mi.id AS item_id,
                   s.id AS store_id,
                   s.name AS store_name,
                   mc.name AS category,
                   mi.name AS name,
                   mi.price AS price,
                   mi.description AS description
            FROM menu_items mi
            JOIN menu_categories mc ON mc.id = mi.category_id
            JOIN stores s ON s.id = mc.store_id
            WHERE mi.is_available = TRUE AND s.id = ANY($1)
            ORDER BY s.name, mc.sort_order, mi.name
            "#,
        )
        .bind(store_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
