use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;
use validator::Validate;

use crate::fetcher::DEFAULT_USER_AGENT;
use crate::models::{NewTrackedItem, SearchDefinition};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub database: DatabaseConfig,
    #[validate(nested)]
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[validate(nested)]
    #[serde(default)]
    pub searches: Vec<SearchDefinition>,
    #[validate(nested)]
    #[serde(default)]
    pub products: Vec<NewTrackedItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    #[validate(length(min = 1))]
    pub path: String,
    #[validate(range(min = 1))]
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ScraperConfig {
    #[validate(range(min = 1))]
    pub max_retries: u32,
    pub request_delay_ms: u64,
    pub snipe_delay_ms: u64,
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
    #[validate(length(min = 1))]
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            request_delay_ms: 5_000,
            snipe_delay_ms: 300_000,
            request_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: String,
    pub use_tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            username: None,
            password: None,
            from_address: None,
            from_name: "Sniper Watch".to_string(),
            use_tls: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Also write daily-rotated log files here when set.
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9001,
        }
    }
}

fn default_max_connections() -> u32 {
    1
}

impl AppConfig {
    /// Layers `config/default`, an explicit file, `config/local` and
    /// `SNIPER__*` environment variables, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let s = builder
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("SNIPER").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate_all()?;
        Ok(config)
    }

    pub fn validate_all(&self) -> Result<(), ConfigError> {
        self.validate()
            .map_err(|e| ConfigError::Message(format!("Invalid configuration: {}", e)))?;

        for search in &self.searches {
            if Url::parse(&search.url).is_err() {
                return Err(ConfigError::Message(format!(
                    "Invalid search URL: {}",
                    search.url
                )));
            }
        }

        if self.notifications.enabled {
            let smtp = &self.notifications.smtp;
            if smtp.port == 0 {
                return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
            }
            if smtp.from_address.is_none() && smtp.username.is_none() {
                return Err(ConfigError::Message(
                    "SMTP from_address or username is required when notifications are enabled".into(),
                ));
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        Ok(())
    }
}
