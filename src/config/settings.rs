//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub bot: BotConfig,
    pub database: DatabaseConfig,
    pub ai: AiConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

/// Chat bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    /// Name the bot answers to ("@name" also triggers it)
    pub name: String,
    /// Extra phrases that wake the bot in an idle group
    pub trigger_words: Vec<String>,
    /// Public URL where group activation can be requested
    pub apply_url: Option<String>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// AI gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiConfig {
    /// Command used to invoke the AI CLI process
    pub command: String,
    /// Model passed to the CLI
    pub model: String,
    /// Working directory for the subprocess
    pub working_dir: Option<String>,
    /// Hard timeout for one invocation
    pub timeout_seconds: u64,
    /// Number of conversation history entries sent per request
    pub history_limit: i64,
}

/// Input sanitizing and ban escalation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecurityConfig {
    /// Maximum message length accepted before the sanitizer truncates
    pub max_message_length: usize,
    /// All-time sanitizer violations at which a user is banned
    pub ban_threshold: i64,
    /// Required length range for group shared codes
    pub group_code_min_length: usize,
    pub group_code_max_length: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("ORDERBUDDY").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::OrderBuddyError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "buddy".to_string(),
                trigger_words: vec!["order".to_string(), "lunch".to_string()],
                apply_url: Some("https://orderbuddy.example/apply".to_string()),
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/orderbuddy".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            ai: AiConfig {
                command: "claude".to_string(),
                model: "haiku".to_string(),
                working_dir: None,
                timeout_seconds: 120,
                history_limit: 40,
            },
            security: SecurityConfig {
                max_message_length: 200,
                ban_threshold: 5,
                group_code_min_length: 4,
                group_code_max_length: 64,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "/var/log/orderbuddy".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_round_trip_through_toml() {
        let rendered = toml::to_string(&Settings::default()).unwrap();
        let parsed: Settings = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.bot.name, "buddy");
        assert_eq!(parsed.security.ban_threshold, 5);
        assert!(parsed.ai.working_dir.is_none());
    }

    #[test]
    fn test_load_settings_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, toml::to_string(&Settings::default()).unwrap()).unwrap();

        let settings: Settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.database.max_connections, 10);
        assert_eq!(settings.bot.trigger_words.len(), 2);
    }
}
