//! Ordering session, order and today-store repositories

use crate::models::order::{
    Order, OrderItem, OrderItemSummary, OrderSummary, OrderingSession, TodayStore,
};
use crate::utils::errors::OrderBuddyError;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn active_session(
        &self,
        group_id: Uuid,
    ) -> Result<Option<OrderingSession>, OrderBuddyError> {
        let session = sqlx::query_as::<_, OrderingSession>(
            "SELECT id, group_id, status, opened_by, opened_at, closed_at FROM ordering_sessions WHERE group_id = $1 AND status = 'ordering'"
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Open a session. The partial unique index makes this race-free:
    /// a conflicting insert returns no row and we report the clash.
    pub async fn open_session(
        &self,
        group_id: Uuid,
        opened_by: Uuid,
    ) -> Result<OrderingSession, OrderBuddyError> {
        let session = sqlx::query_as::<_, OrderingSession>(
            r#"
            INSERT INTO ordering_sessions (group_id, opened_by)
            VALUES ($1, $2)
            ON CONFLICT (group_id) WHERE (status = 'ordering') DO NOTHING
            RETURNING id, group_id, status, opened_by, opened_at, closed_at
            "#,
        )
        .bind(group_id)
        .bind(opened_by)
        .fetch_optional(&self.pool)
        .await?;

        session.ok_or(OrderBuddyError::SessionAlreadyOpen { group_id })
    }

    /// Close the open session, if any
    pub async fn close_session(
        &self,
        group_id: Uuid,
    ) -> Result<OrderingSession, OrderBuddyError> {
        let session = sqlx::query_as::<_, OrderingSession>(
            r#"
            UPDATE ordering_sessions
            SET status = 'ended', closed_at = $2
            WHERE group_id = $1 AND status = 'ordering'
            RETURNING id, group_id, status, opened_by, opened_at, closed_at
            "#,
        )
        .bind(group_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        session.ok_or(OrderBuddyError::SessionNotOpen { group_id })
    }
}

#[derive(Debug, Clone)]
pub struct TodayStoreRepository {
    pool: PgPool,
}

impl TodayStoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn for_group(
        &self,
        group_id: Uuid,
        order_date: NaiveDate,
    ) -> Result<Vec<TodayStore>, OrderBuddyError> {
        let rows = sqlx::query_as::<_, TodayStore>(
            r#"
            SELECT ts.id, ts.group_id, ts.store_id, s.name AS store_name, ts.order_date, ts.created_at
            FROM group_today_stores ts
            JOIN stores s ON s.id = ts.store_id
            WHERE ts.group_id = $1 AND ts.order_date = $2
            ORDER BY ts.created_at
            "#
        )
        .bind(group_id)
        .bind(order_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Replace the day's selection with a single store
    pub async fn replace(
        &self,
        group_id: Uuid,
        store_id: Uuid,
        order_date: NaiveDate,
    ) -> Result<(), OrderBuddyError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM group_today_stores WHERE group_id = $1 AND order_date = $2")
            .bind(group_id)
            .bind(order_date)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO group_today_stores (group_id, store_id, order_date) VALUES ($1, $2, $3)",
        )
        .bind(group_id)
        .bind(store_id)
        .bind(order_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Add a store to the day's selection. Idempotent.
    pub async fn add(
        &self,
        group_id: Uuid,
        store_id: Uuid,
        order_date: NaiveDate,
    ) -> Result<(), OrderBuddyError> {
        sqlx::query(
            r#"
            INSERT INTO group_today_stores (group_id, store_id, order_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (group_id, store_id, order_date) DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(store_id)
        .bind(order_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove one store from the day's selection. Returns whether a row went away.
    pub async fn remove(
        &self,
        group_id: Uuid,
        store_id: Uuid,
        order_date: NaiveDate,
    ) -> Result<bool, OrderBuddyError> {
        let result = sqlx::query(
            "DELETE FROM group_today_stores WHERE group_id = $1 AND store_id = $2 AND order_date = $3"
        )
        .bind(group_id)
        .bind(store_id)
        .bind(order_date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drop the day's whole selection. Returns how many rows went away.
    pub async fn clear(
        &self,
        group_id: Uuid,
        order_date: NaiveDate,
    ) -> Result<u64, OrderBuddyError> {
        let result =
            sqlx::query("DELETE FROM group_today_stores WHERE group_id = $1 AND order_date = $2")
                .bind(group_id)
                .bind(order_date)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_session_and_user(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Order>, OrderBuddyError> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT id, session_id, user_id, store_id, total_amount, payment_status, paid_at, created_at, updated_at FROM orders WHERE session_id = $1 AND user_id = $2"
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Get the member's order for this session, creating an empty one if needed
    pub async fn get_or_create(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        store_id: Option<Uuid>,
    ) -> Result<Order, OrderBuddyError> {
        if let Some(order) = self.find_by_session_and_user(session_id, user_id).await? {
            return Ok(order);
        }

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (session_id, user_id, store_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (session_id, user_id) DO UPDATE SET updated_at = NOW()
            RETURNING id, session_id, user_id, store_id, total_amount, payment_status, paid_at, created_at, updated_at
            "#
        )
        .bind(session_id)
        .bind(user_id)
        .bind(store_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(order)
    }

    pub async fn insert_item(
        &self,
        order_id: Uuid,
        name: &str,
        quantity: i32,
        unit_price: Decimal,
        note: Option<&str>,
    ) -> Result<OrderItem, OrderBuddyError> {
        let subtotal = unit_price * Decimal::from(quantity);

        let item = sqlx::query_as::<_, OrderItem>(
            r#"
            INSERT INTO order_items (order_id, name, quantity, unit_price, subtotal, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, order_id, name, quantity, unit_price, subtotal, note, created_at
            "#,
        )
        .bind(order_id)
        .bind(name)
        .bind(quantity)
        .bind(unit_price)
        .bind(subtotal)
        .bind(note)
        .fetch_one(&self.pool)
        .await?;

        Ok(item)
    }

    pub async fn items_for_order(&self, order_id: Uuid) -> Result<Vec<OrderItem>, OrderBuddyError> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, name, quantity, unit_price, subtotal, note, created_at FROM order_items WHERE order_id = $1 ORDER BY created_at"
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lower an item's quantity, recomputing its subtotal at the stored unit price
    pub async fn set_item_quantity(
        &self,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<OrderItem, OrderBuddyError> {
        let item = sqlx::query_as::<_, OrderItem>(
            r#"
            UPDATE order_items
            SET quantity = $2, subtotal = unit_price * $2
            WHERE id = $1
            RETURNING id, order_id, name, quantity, unit_price, subtotal, note, created_at
            "#,
        )
        .bind(item_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await?;

        Ok(item)
    }

    pub async fn delete_item(&self, item_id: Uuid) -> Result<(), OrderBuddyError> {
        sqlx::query("DELETE FROM order_items WHERE id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete_order(&self, order_id: Uuid) -> Result<(), OrderBuddyError> {
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Recompute the order total as the sum of its line subtotals
    pub async fn recalculate_total(&self, order_id: Uuid) -> Result<Order, OrderBuddyError> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET total_amount = (
                    SELECT COALESCE(SUM(subtotal), 0)
                    FROM order_items
                    WHERE order_id = $1
                ),
                updated_at = $2
            WHERE id = $1
            RETURNING id, session_id, user_id, store_id, total_amount, payment_status, paid_at, created_at, updated_at
            "#
        )
        .bind(order_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(order)
    }

    pub async fn set_payment_status(
        &self,
        order_id: Uuid,
        payment_status: &str,
    ) -> Result<Order, OrderBuddyError> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET payment_status = $2,
                paid_at = CASE WHEN $2 = 'paid' THEN $3 ELSE NULL END,
                updated_at = $3
            WHERE id = $1
            RETURNING id, session_id, user_id, store_id, total_amount, payment_status, paid_at, created_at, updated_at
            "#,
        )
        .bind(order_id)
        .bind(payment_status)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(order)
    }

    /// All orders in a session with their items, for summaries and events
    pub async fn session_order_summaries(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<OrderSummary>, OrderBuddyError> {
        let orders: Vec<(Uuid, Uuid, Option<String>, Decimal, String)> = sqlx::query_as(
            r#"
            SELECT o.id, o.user_id, u.display_name, o.total_amount, o.payment_status
            FROM orders o
            JOIN users u ON u.id = o.user_id
            WHERE o.session_id = $1
            ORDER BY o.created_at
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(orders.len());
        for (order_id, user_id, display_name, total_amount, payment_status) in orders {
            let items = self.items_for_order(order_id).await?;
            summaries.push(OrderSummary {
                order_id,
                user_id,
                display_name,
                total_amount,
                payment_status,
                items: items
                    .into_iter()
                    .map(|i| OrderItemSummary {
                        name: i.name,
                        quantity: i.quantity,
                        unit_price: i.unit_price,
                        subtotal: i.subtotal,
                        note: i.note,
                    })
                    .collect(),
            });
        }

        Ok(summaries)
    }

    /// A user's most recent orders across all groups
    pub async fn recent_orders_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Order>, OrderBuddyError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT id, session_id, user_id, store_id, total_amount, payment_status, paid_at, created_at, updated_at FROM orders WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2"
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}
