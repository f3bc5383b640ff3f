//! Error handling for OrderBuddy
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for OrderBuddy application
#[derive(Error, Debug)]
pub enum OrderBuddyError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("AI gateway error: {0}")]
    Ai(#[from] AiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: String },

    #[error("Group not found: {group_id}")]
    GroupNotFound { group_id: String },

    #[error("Store not found: {name}")]
    StoreNotFound { name: String },

    #[error("Menu item not found: {name}")]
    MenuItemNotFound { name: String },

    #[error("Order not found for user {user_id}")]
    OrderNotFound { user_id: String },

    #[error("An ordering session is already open for group {group_id}")]
    SessionAlreadyOpen { group_id: Uuid },

    #[error("No ordering session is open for group {group_id}")]
    SessionNotOpen { group_id: Uuid },

    #[error("No store configured for today")]
    NoStoreConfigured,

    #[error("Cannot remove the last admin of a group")]
    LastAdmin,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// AI gateway specific errors
#[derive(Error, Debug)]
pub enum AiError {
    #[error("AI process timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("AI process exited with status {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("AI process could not be spawned: {0}")]
    Spawn(String),
}

/// Result type alias for OrderBuddy operations
pub type Result<T> = std::result::Result<T, OrderBuddyError>;

impl OrderBuddyError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            OrderBuddyError::Database(_) => false,
            OrderBuddyError::Migration(_) => false,
            OrderBuddyError::Ai(_) => true,
            OrderBuddyError::Config(_) => false,
            OrderBuddyError::Io(_) => true,
            OrderBuddyError::ServiceUnavailable(_) => true,
            _ => false,
        }
    }

    /// Errors a member can fix themselves get surfaced as a reply;
    /// everything else is logged and turned into a generic apology.
    pub fn user_message(&self) -> Option<String> {
        match self {
            OrderBuddyError::StoreNotFound { name } => {
                Some(format!("Store \"{name}\" was not found."))
            }
            OrderBuddyError::MenuItemNotFound { name } => {
                Some(format!("\"{name}\" is not on any of today's menus."))
            }
            OrderBuddyError::OrderNotFound { .. } => {
                Some("You have no order in this session yet.".to_string())
            }
            OrderBuddyError::SessionAlreadyOpen { .. } => {
                Some("Ordering is already open for this group.".to_string())
            }
            OrderBuddyError::SessionNotOpen { .. } => {
                Some("There is no ordering session open right now.".to_string())
            }
            OrderBuddyError::NoStoreConfigured => {
                Some("No store is set for today, so ordering cannot start.".to_string())
            }
            OrderBuddyError::LastAdmin => Some(
                "You are the only admin of this group and cannot unbind.\n\
                 Have someone else bind as admin first."
                    .to_string(),
            ),
            OrderBuddyError::InvalidInput(msg) => Some(msg.clone()),
            OrderBuddyError::PermissionDenied(msg) => Some(msg.clone()),
            _ => None,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            OrderBuddyError::Database(_) => ErrorSeverity::Critical,
            OrderBuddyError::Migration(_) => ErrorSeverity::Critical,
            OrderBuddyError::Config(_) => ErrorSeverity::Critical,
            OrderBuddyError::Ai(_) => ErrorSeverity::Error,
            OrderBuddyError::PermissionDenied(_) => ErrorSeverity::Warning,
            OrderBuddyError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_errors_are_user_facing() {
        let err = OrderBuddyError::SessionAlreadyOpen {
            group_id: Uuid::new_v4(),
        };
        assert!(err.user_message().is_some());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_internal_errors_are_not_surfaced() {
        let err = OrderBuddyError::Config("bad".to_string());
        assert!(err.user_message().is_none());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }
}
