//! Ordering session and order models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Ordering session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Ordering,
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Ordering => "ordering",
            SessionStatus::Ended => "ended",
        }
    }
}

/// Payment status of a single order
pub const PAYMENT_UNPAID: &str = "unpaid";
pub const PAYMENT_PAID: &str = "paid";
pub const PAYMENT_REFUNDED: &str = "refunded";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderingSession {
    pub id: Uuid,
    pub group_id: Uuid,
    pub status: String,
    pub opened_by: Uuid,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl OrderingSession {
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Ordering.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub store_id: Option<Uuid>,
    pub total_amount: Decimal,
    pub payment_status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Store picked for a group's ordering day
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TodayStore {
    pub id: Uuid,
    pub group_id: Uuid,
    pub store_id: Uuid,
    pub store_name: String,
    pub order_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// One member's order with its line items, used for summaries and events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub total_amount: Decimal,
    pub payment_status: String,
    pub items: Vec<OrderItemSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemSummary {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub note: Option<String>,
}
