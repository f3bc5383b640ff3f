//! OrderBuddy group ordering bot
//!
//! A conversation-driven lunch ordering assistant for group chats.
//! This library provides the message router, AI gateway, store and menu
//! resolution, and the board notification pipeline.

#![allow(non_snake_case)]

pub mod config;
pub mod database;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{AiError, OrderBuddyError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use handlers::{IncomingMessage, MessageRouter};
pub use notify::{BroadcastRegistry, NotificationQueue};
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
