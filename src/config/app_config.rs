use std::time::Duration;

use serde::Deserialize;

use crate::domain::cache::DEFAULT_KEY_PREFIX;
use crate::domain::DomainError;
use crate::infrastructure::cache::{CacheConfig, CacheType};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Cache settings as read from files and `APP__CACHE__*` variables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub driver: String,
    pub prefix: String,
    pub redis_url: Option<String>,
    pub max_ttl_secs: u64,
    pub max_capacity: u64,
    pub connection_timeout_ms: u64,
    pub response_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            driver: CacheType::InMemory.to_string(),
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            redis_url: None,
            max_ttl_secs: 7200,
            max_capacity: 10_000,
            connection_timeout_ms: 5000,
            response_timeout_ms: 2000,
        }
    }
}

impl CacheSettings {
    /// Validated factory configuration
    pub fn cache_config(&self) -> Result<CacheConfig, DomainError> {
        if self.max_ttl_secs == 0 {
            return Err(DomainError::configuration("cache.max_ttl_secs must be greater than zero"));
        }

        Ok(CacheConfig {
            driver: self.driver.parse()?,
            prefix: self.prefix.clone(),
            redis_url: self.redis_url.clone().filter(|url| !url.is_empty()),
            max_ttl: Duration::from_secs(self.max_ttl_secs),
            max_capacity: self.max_capacity,
            connection_timeout: Duration::from_millis(self.connection_timeout_ms),
            response_timeout: Duration::from_millis(self.response_timeout_ms),
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(source: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = from_toml("");

        assert_eq!(config.cache.driver, "in_memory");
        assert_eq!(config.cache.prefix, "taskboard_cache");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_override() {
        let config = from_toml(
            r#"
            [cache]
            driver = "redis"
            redis_url = "redis://cache:6379"
            response_timeout_ms = 250

            [logging]
            format = "json"
            "#,
        );

        let cache = config.cache.cache_config().unwrap();
        assert_eq!(cache.driver, CacheType::Redis);
        assert_eq!(cache.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(cache.response_timeout, Duration::from_millis(250));
        assert_eq!(cache.connection_timeout, Duration::from_secs(5));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_driver() {
        let settings = CacheSettings {
            driver: "memcached".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            settings.cache_config(),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_zero_max_ttl_rejected() {
        let settings = CacheSettings {
            max_ttl_secs: 0,
            ..Default::default()
        };

        assert!(settings.cache_config().is_err());
    }
}
