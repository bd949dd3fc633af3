//! # Configuration Module
//!
//! Layered configuration for the queue service: `config/facility.toml` as the
//! base, an optional `config/facility.{environment}.toml` overlay, then
//! `FACILITY__`-prefixed environment variables on top
//! (`FACILITY__QUEUE__IDLE_BACKOFF_SECONDS=30` overrides
//! `queue.idle_backoff_seconds`). Every field has a default, so the service
//! starts with no config file at all.

use crate::constants::system;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the facility queue service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL. `DATABASE_URL` is honored when the field is absent.
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum connections in the pool
    #[serde(default = "default_pool_size")]
    pub pool: u32,
    /// Seconds to wait when acquiring a connection
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

/// Queue loop pacing and selection behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Seconds slept when no eligible plan exists
    #[serde(default = "default_idle_backoff")]
    pub idle_backoff_seconds: u64,
    /// Seconds slept after a transient error
    #[serde(default = "default_error_backoff")]
    pub error_backoff_seconds: u64,
    /// Order the work list by observation priority instead of insertion order
    #[serde(default)]
    pub priority_ordering: bool,
    /// Repository readiness probes attempted at startup
    #[serde(default = "default_probe_attempts")]
    pub startup_probe_attempts: u32,
    /// Seconds between readiness probes
    #[serde(default = "default_probe_delay")]
    pub startup_probe_delay_seconds: u64,
}

/// Stub exposure executor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Directory placeholder artifacts are written into
    #[serde(default = "default_artifact_directory")]
    pub artifact_directory: String,
    /// Simulated exposure duration in seconds
    #[serde(default = "default_exposure_delay")]
    pub exposure_delay_seconds: u64,
}

fn default_database_url() -> String {
    std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgresql://localhost/facility_development".to_string())
}

fn default_pool_size() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_backoff() -> u64 {
    system::DEFAULT_IDLE_BACKOFF_SECONDS
}

fn default_error_backoff() -> u64 {
    system::DEFAULT_ERROR_BACKOFF_SECONDS
}

fn default_probe_attempts() -> u32 {
    system::DEFAULT_STARTUP_PROBE_ATTEMPTS
}

fn default_probe_delay() -> u64 {
    system::DEFAULT_STARTUP_PROBE_DELAY_SECONDS
}

fn default_artifact_directory() -> String {
    system::DEFAULT_ARTIFACT_DIRECTORY.to_string()
}

fn default_exposure_delay() -> u64 {
    system::DEFAULT_EXPOSURE_DELAY_SECONDS
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            idle_backoff_seconds: default_idle_backoff(),
            error_backoff_seconds: default_error_backoff(),
            priority_ordering: false,
            startup_probe_attempts: default_probe_attempts(),
            startup_probe_delay_seconds: default_probe_delay(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            artifact_directory: default_artifact_directory(),
            exposure_delay_seconds: default_exposure_delay(),
        }
    }
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            queue: QueueConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl FacilityConfig {
    /// Load configuration with environment auto-detection
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_for_environment(&detect_environment())
    }

    /// Load configuration for an explicit environment. Useful in tests where
    /// mutating `FACILITY_ENV` would race other tests.
    pub fn load_for_environment(environment: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/facility").required(false))
            .add_source(
                config::File::with_name(&format!("config/facility.{environment}")).required(false),
            )
            .add_source(config::Environment::with_prefix("FACILITY").separator("__"))
            .build()
            .map_err(|e| ConfigError::Load {
                message: e.to_string(),
            })?;

        let loaded: Self = settings.try_deserialize().map_err(|e| ConfigError::Load {
            message: e.to_string(),
        })?;

        loaded.validate()?;

        tracing::debug!(
            environment = %environment,
            idle_backoff_seconds = loaded.queue.idle_backoff_seconds,
            error_backoff_seconds = loaded.queue.error_backoff_seconds,
            priority_ordering = loaded.queue.priority_ordering,
            "Configuration loaded"
        );

        Ok(loaded)
    }

    /// Reject values the queue loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_empty() {
            return Err(ConfigError::invalid_value(
                "database.url",
                "must not be empty",
            ));
        }
        if self.database.pool == 0 {
            return Err(ConfigError::invalid_value(
                "database.pool",
                "must be at least 1",
            ));
        }
        if self.queue.idle_backoff_seconds == 0 {
            return Err(ConfigError::invalid_value(
                "queue.idle_backoff_seconds",
                "a zero idle backoff would spin the loop",
            ));
        }
        if self.queue.error_backoff_seconds == 0 {
            return Err(ConfigError::invalid_value(
                "queue.error_backoff_seconds",
                "a zero error backoff would spin the loop",
            ));
        }
        if self.queue.startup_probe_attempts == 0 {
            return Err(ConfigError::invalid_value(
                "queue.startup_probe_attempts",
                "must be at least 1",
            ));
        }
        if self.executor.artifact_directory.is_empty() {
            return Err(ConfigError::invalid_value(
                "executor.artifact_directory",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

impl QueueConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_secs(self.idle_backoff_seconds)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_seconds)
    }

    pub fn startup_probe_delay(&self) -> Duration {
        Duration::from_secs(self.startup_probe_delay_seconds)
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl ExecutorConfig {
    pub fn exposure_delay(&self) -> Duration {
        Duration::from_secs(self.exposure_delay_seconds)
    }
}

/// Get current environment from environment variables
pub fn detect_environment() -> String {
    std::env::var("FACILITY_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> FacilityConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_match_service_constants() {
        let config = FacilityConfig::default();
        assert_eq!(config.queue.idle_backoff_seconds, 15);
        assert_eq!(config.queue.error_backoff_seconds, 5);
        assert!(!config.queue.priority_ordering);
        assert_eq!(config.executor.exposure_delay_seconds, 10);
        assert_eq!(config.executor.artifact_directory, "observations_data");
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_file_overrides_defaults() {
        let config = parse(
            r#"
            [queue]
            idle_backoff_seconds = 60
            priority_ordering = true
            "#,
        );
        assert_eq!(config.queue.idle_backoff_seconds, 60);
        assert!(config.queue.priority_ordering);
        // untouched sections keep their defaults
        assert_eq!(config.queue.error_backoff_seconds, 5);
        assert_eq!(config.executor.exposure_delay_seconds, 10);
    }

    #[test]
    fn test_zero_backoff_is_rejected() {
        let config = parse(
            r#"
            [queue]
            idle_backoff_seconds = 0
            "#,
        );
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "queue.idle_backoff_seconds"));
    }

    #[test]
    fn test_durations_are_derived_from_seconds() {
        let config = FacilityConfig::default();
        assert_eq!(config.queue.idle_backoff(), Duration::from_secs(15));
        assert_eq!(config.queue.error_backoff(), Duration::from_secs(5));
        assert_eq!(config.executor.exposure_delay(), Duration::from_secs(10));
    }
}
