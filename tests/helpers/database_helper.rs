//! Test database helper utilities
//!
//! Wires the repositories against a throwaway PostgreSQL database named
//! by TEST_DATABASE_URL. Tests call [`TestDatabase::try_new`] and return
//! early when the variable is not set, so the suite still passes on
//! machines without a database.

use sqlx::PgPool;
use std::sync::Once;
use uuid::Uuid;
use OrderBuddy::database::DatabaseService;
use OrderBuddy::models::group::Group;
use OrderBuddy::models::user::User;

static INIT: Once = Once::new();

pub struct TestDatabase {
    pub pool: PgPool,
    pub db: DatabaseService,
}

impl TestDatabase {
    /// Connect, migrate, and start from empty tables.
    /// Returns None when TEST_DATABASE_URL is not set.
    pub async fn try_new() -> Option<Self> {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt::try_init();
        });

        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url)
            .await
            .expect("connect to test database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("run migrations");

        let helper = Self {
            db: DatabaseService::new(pool.clone()),
            pool,
        };
        helper.cleanup().await.expect("clean test database");
        Some(helper)
    }

    /// Delete all rows in reverse order of dependencies
    pub async fn cleanup(&self) -> Result<(), sqlx::Error> {
        for table in [
            "security_logs",
            "chat_messages",
            "order_items",
            "orders",
            "ordering_sessions",
            "group_today_stores",
            "menu_items",
            "menu_categories",
            "stores",
            "group_admins",
            "group_members",
            "group_applications",
            "groups",
            "users",
        ] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    pub async fn create_test_user(&self, platform_user_id: &str, display_name: &str) -> User {
        self.db
            .users
            .get_or_create(platform_user_id, Some(display_name))
            .await
            .expect("create test user")
    }

    pub async fn create_active_group(&self, platform_group_id: &str, code: &str) -> Group {
        let group = self
            .db
            .groups
            .get_or_create(platform_group_id)
            .await
            .expect("create test group");
        self.db
            .groups
            .activate(group.id, "Test Group", code)
            .await
            .expect("activate test group")
    }

    pub async fn create_pending_group(&self, platform_group_id: &str) -> Group {
        self.db
            .groups
            .get_or_create(platform_group_id)
            .await
            .expect("create pending group")
    }

    /// Seed one store with a two-item menu and select it for the group today
    pub async fn seed_store_with_menu(&self, group: &Group, store_name: &str) -> Uuid {
        let store_id: Uuid =
            sqlx::query_scalar("INSERT INTO stores (name) VALUES ($1) RETURNING id")
                .bind(store_name)
                .fetch_one(&self.pool)
                .await
                .expect("insert store");

        let category_id: Uuid = sqlx::query_scalar(
            "INSERT INTO menu_categories (store_id, name) VALUES ($1, 'Lunch Box') RETURNING id",
        )
        .bind(store_id)
        .fetch_one(&self.pool)
        .await
        .expect("insert menu category");

        for (name, price) in [("Fried Rice", "80"), ("Beef Noodles", "95")] {
            sqlx::query("INSERT INTO menu_items (category_id, name, price) VALUES ($1, $2, $3::numeric)")
                .bind(category_id)
                .bind(name)
                .bind(price)
                .execute(&self.pool)
                .await
                .expect("insert menu item");
        }

        sqlx::query(
            "INSERT INTO group_today_stores (group_id, store_id, order_date) VALUES ($1, $2, CURRENT_DATE)",
        )
        .bind(group.id)
        .bind(store_id)
        .execute(&self.pool)
        .await
        .expect("select store for today");

        store_id
    }

    pub async fn count_records(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .expect("count records")
    }
}
