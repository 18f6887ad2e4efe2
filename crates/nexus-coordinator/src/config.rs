//! # Environment-Based Coordinator Configuration
//!
//! ## Environment Variables
//!
//! - `NEXUS_BIND_ADDR` - Address the HTTP server listens on (default: `0.0.0.0:8000`)
//! - `NEXUS_BUS_URL` - Bus to connect to, `redis://...` or `memory://` (default: `redis://localhost:6379`)
//! - `NEXUS_ACTIVE_THRESHOLD_MINUTES` - Heartbeat age after which an agent is offline (default: 5)
//! - `NEXUS_REAPER_INTERVAL_SECS` - Run a background liveness sweep this often (default: unset, no reaper)
//! - `NEXUS_COMPLETED_CAPACITY` - Completed command outcomes kept for lookup (default: 1024)
//! - `NEXUS_PENDING_CAPACITY` - Unanswered commands tracked before the oldest expires (default: 1024)
//! - `NEXUS_ENABLE_CORS` - Permissive CORS on the HTTP API (default: true)

use std::{env, net::SocketAddr, time::Duration};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_BUS_URL: &str = "redis://localhost:6379";
pub const DEFAULT_ACTIVE_THRESHOLD_MINUTES: u64 = 5;
pub const DEFAULT_COMPLETED_CAPACITY: usize = 1024;
pub const DEFAULT_PENDING_CAPACITY: usize = 1024;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub bind_addr: SocketAddr,
    pub bus_url: String,
    pub active_threshold_minutes: u64,
    /// `None` leaves the list-time sweep as the only liveness check
    pub reaper_interval: Option<Duration>,
    pub completed_capacity: usize,
    pub pending_capacity: usize,
    pub enable_cors: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            bus_url: DEFAULT_BUS_URL.to_string(),
            active_threshold_minutes: DEFAULT_ACTIVE_THRESHOLD_MINUTES,
            reaper_interval: None,
            completed_capacity: DEFAULT_COMPLETED_CAPACITY,
            pending_capacity: DEFAULT_PENDING_CAPACITY,
            enable_cors: true,
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from environment variables, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any variable has an invalid value or the
    /// result fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = get_env_string("NEXUS_BIND_ADDR") {
            config.bind_addr = addr.parse().map_err(|e| ConfigError::InvalidEnvVar {
                key: "NEXUS_BIND_ADDR".to_string(),
                message: format!("invalid socket address '{addr}': {e}"),
            })?;
        }
        if let Some(url) = get_env_string("NEXUS_BUS_URL") {
            config.bus_url = url;
        }
        if let Some(minutes) = get_env_u64("NEXUS_ACTIVE_THRESHOLD_MINUTES")? {
            config.active_threshold_minutes = minutes;
        }
        if let Some(secs) = get_env_u64("NEXUS_REAPER_INTERVAL_SECS")? {
            config.reaper_interval = Some(Duration::from_secs(secs));
        }
        if let Some(capacity) = get_env_u64("NEXUS_COMPLETED_CAPACITY")? {
            config.completed_capacity = capacity as usize;
        }
        if let Some(capacity) = get_env_u64("NEXUS_PENDING_CAPACITY")? {
            config.pending_capacity = capacity as usize;
        }
        if let Some(enabled) = get_env_bool("NEXUS_ENABLE_CORS")? {
            config.enable_cors = enabled;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_bus_url(mut self, url: impl Into<String>) -> Self {
        self.bus_url = url.into();
        self
    }

    pub fn with_active_threshold_minutes(mut self, minutes: u64) -> Self {
        self.active_threshold_minutes = minutes;
        self
    }

    pub fn with_reaper_interval(mut self, interval: Option<Duration>) -> Self {
        self.reaper_interval = interval;
        self
    }

    pub fn with_completed_capacity(mut self, capacity: usize) -> Self {
        self.completed_capacity = capacity;
        self
    }

    pub fn with_pending_capacity(mut self, capacity: usize) -> Self {
        self.pending_capacity = capacity;
        self
    }

    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.enable_cors = enabled;
        self
    }

    /// The liveness threshold as a chrono duration
    pub fn active_threshold(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.active_threshold_minutes as i64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.active_threshold_minutes == 0 {
            return Err(ConfigError::ValidationError(
                "active threshold must be at least one minute".to_string(),
            ));
        }
        if self.active_threshold_minutes > i32::MAX as u64 {
            return Err(ConfigError::ValidationError(format!(
                "active threshold of {} minutes is out of range",
                self.active_threshold_minutes
            )));
        }
        if self.completed_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "completed capacity must be greater than zero".to_string(),
            ));
        }
        if self.pending_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "pending capacity must be greater than zero".to_string(),
            ));
        }
        if self.reaper_interval.is_some_and(|i| i.is_zero()) {
            return Err(ConfigError::ValidationError(
                "reaper interval must be greater than zero".to_string(),
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

fn get_env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid boolean value '{val}' (expected true/false/1/0/yes/no/on/off)"),
            }),
        },
        Err(_) => Ok(None),
    }
}
