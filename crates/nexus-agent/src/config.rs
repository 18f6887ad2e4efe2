//! # Environment-Based Agent Configuration
//!
//! ## Environment Variables
//!
//! - `NEXUS_COORDINATOR_URL` - Base URL of the coordinator (default: `http://gpt-nexus:8000`)
//! - `NEXUS_BUS_URL` - Bus to connect to, `redis://...` or `memory://` (default: `redis://localhost:6379`)
//! - `NEXUS_HEARTBEAT_INTERVAL_SECS` - Seconds between heartbeats (default: 10)
//! - `NEXUS_REQUEST_TIMEOUT_SECS` - Timeout for coordinator HTTP calls (default: 5)
//! - `NEXUS_DOCS_DIR` - Directory holding internal documents for research (default: `/app/mock_data`)
//! - `NEXUS_ARGUMENT_POLICY` - `lenient` or `enforce` (default: `lenient`)

use nexus_tools::ArgumentPolicy;
use nexus_tools::standard::DEFAULT_DOCS_DIR;
use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_COORDINATOR_URL: &str = "http://gpt-nexus:8000";
pub const DEFAULT_BUS_URL: &str = "redis://localhost:6379";
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Settings for one agent process
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub coordinator_url: String,
    pub bus_url: String,
    pub heartbeat_interval: Duration,
    pub request_timeout: Duration,
    pub docs_dir: PathBuf,
    pub argument_policy: ArgumentPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            coordinator_url: DEFAULT_COORDINATOR_URL.to_string(),
            bus_url: DEFAULT_BUS_URL.to_string(),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            docs_dir: PathBuf::from(DEFAULT_DOCS_DIR),
            argument_policy: ArgumentPolicy::Lenient,
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any variable has an invalid value or the
    /// result fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = get_env_string("NEXUS_COORDINATOR_URL") {
            config.coordinator_url = url;
        }
        if let Some(url) = get_env_string("NEXUS_BUS_URL") {
            config.bus_url = url;
        }
        if let Some(secs) = get_env_u64("NEXUS_HEARTBEAT_INTERVAL_SECS")? {
            config.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = get_env_u64("NEXUS_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = get_env_string("NEXUS_DOCS_DIR") {
            config.docs_dir = PathBuf::from(dir);
        }
        if let Some(policy) = get_env_string("NEXUS_ARGUMENT_POLICY") {
            config.argument_policy = policy.parse().map_err(|message| ConfigError::InvalidEnvVar {
                key: "NEXUS_ARGUMENT_POLICY".to_string(),
                message,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_coordinator_url(mut self, url: impl Into<String>) -> Self {
        self.coordinator_url = url.into();
        self
    }

    pub fn with_bus_url(mut self, url: impl Into<String>) -> Self {
        self.bus_url = url.into();
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_docs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.docs_dir = dir.into();
        self
    }

    pub fn with_argument_policy(mut self, policy: ArgumentPolicy) -> Self {
        self.argument_policy = policy;
        self
    }

    /// Check invariants the runtime relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "heartbeat interval must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        if self.coordinator_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "coordinator URL cannot be empty".to_string(),
            ));
        }
        if self.bus_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "bus URL cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn get_env_string(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn get_env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u64 value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}
