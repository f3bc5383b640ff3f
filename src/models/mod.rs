//! Data models
//!
//! Row types map one to one onto the migration schema; status columns
//! stay as strings with typed accessors.

pub mod chat;
pub mod group;
pub mod order;
pub mod store;
pub mod system;
pub mod user;

pub use chat::{ChatMessage, ROLE_ASSISTANT, ROLE_USER};
pub use group::{
    ApplicationStatus, CreateApplicationRequest, Group, GroupAdmin, GroupApplication, GroupMember,
    GroupStatus,
};
pub use order::{
    Order, OrderItem, OrderItemSummary, OrderSummary, OrderingSession, SessionStatus, TodayStore,
    PAYMENT_PAID, PAYMENT_REFUNDED, PAYMENT_UNPAID,
};
pub use store::{MenuEntry, Store, SCOPE_GLOBAL, SCOPE_GROUP};
pub use system::{AiPrompt, SecurityLog};
pub use user::User;
