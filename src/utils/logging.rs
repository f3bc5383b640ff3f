//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging
//! helpers for the OrderBuddy application.

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Initialize logging based on configuration
///
/// Returns the appender guard, which must be kept alive for the lifetime
/// of the process or buffered log lines are lost on shutdown.
pub fn init_logging(config: &LoggingConfig) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "orderbuddy.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log group lifecycle events with structured data
pub fn log_group_event(group_id: &str, event: &str, user_id: Option<&str>, details: Option<&str>) {
    info!(
        group_id = group_id,
        event = event,
        user_id = user_id,
        details = details,
        "Group event occurred"
    );
}

/// Log sanitizer triggers. `reasons` is the comma-joined reason list as
/// stored in the security log.
pub fn log_security_event(user_id: &str, group_id: Option<&str>, reasons: &str) {
    warn!(
        user_id = user_id,
        group_id = group_id,
        reasons = reasons,
        "Suspicious input sanitized"
    );
}

/// Log admin command execution
pub fn log_admin_action(user_id: &str, group_id: &str, action: &str) {
    info!(
        user_id = user_id,
        group_id = group_id,
        action = action,
        "Admin action performed"
    );
}
