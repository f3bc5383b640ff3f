//! Configuration validation
//!
//! Catches unusable settings at startup instead of at first use.

use crate::config::Settings;
use crate::utils::errors::OrderBuddyError;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<(), OrderBuddyError> {
    if settings.bot.name.trim().is_empty() {
        return Err(OrderBuddyError::Config("bot.name must not be empty".to_string()));
    }

    if settings.database.url.trim().is_empty() {
        return Err(OrderBuddyError::Config(
            "database.url must not be empty".to_string(),
        ));
    }
    if settings.database.min_connections > settings.database.max_connections {
        return Err(OrderBuddyError::Config(
            "database.min_connections must not exceed max_connections".to_string(),
        ));
    }

    if settings.ai.command.trim().is_empty() {
        return Err(OrderBuddyError::Config("ai.command must not be empty".to_string()));
    }
    if settings.ai.timeout_seconds == 0 {
        return Err(OrderBuddyError::Config(
            "ai.timeout_seconds must be greater than zero".to_string(),
        ));
    }
    if settings.ai.history_limit < 0 {
        return Err(OrderBuddyError::Config(
            "ai.history_limit must not be negative".to_string(),
        ));
    }

    if settings.security.ban_threshold < 1 {
        return Err(OrderBuddyError::Config(
            "security.ban_threshold must be at least 1".to_string(),
        ));
    }
    if settings.security.max_message_length == 0 {
        return Err(OrderBuddyError::Config(
            "security.max_message_length must be greater than zero".to_string(),
        ));
    }
    if settings.security.group_code_min_length > settings.security.group_code_max_length {
        return Err(OrderBuddyError::Config(
            "security.group_code_min_length must not exceed group_code_max_length".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut settings = Settings::default();
        settings.ai.timeout_seconds = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_zero_ban_threshold_rejected() {
        let mut settings = Settings::default();
        settings.security.ban_threshold = 0;
        assert!(validate_settings(&settings).is_err());
    }
}
