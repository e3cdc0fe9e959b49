//! Configuration management for onionmesh
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML file,
//! then `ONIONMESH_*` environment variables. The result is validated once.

use crate::core_router::AddressSpace;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub transport: TransportConfig,
    pub relay: RelayConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Where every node listens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host every node binds to and every peer is reached on
    pub host: String,

    pub registry_port: u16,

    /// Relay `n` listens on `base_relay_port + n`
    pub base_relay_port: u16,

    /// User `u` listens on `base_user_port + u`; also the relay/user boundary
    pub base_user_port: u16,

    /// Time servers get to drain after a shutdown signal
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

/// Outbound HTTP calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-request timeout; `None` leaves the client default in place
    #[serde(with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Serve `/getPrivateKey` on relays (diagnostics only)
    pub expose_private_key: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub json_format: bool,
    pub with_timestamp: bool,
    pub with_target: bool,
}

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus exporter
    pub enabled: bool,
    pub bind_address: SocketAddr,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let addresses = AddressSpace::default();
        Self {
            host: "127.0.0.1".to_string(),
            registry_port: addresses.registry_port,
            base_relay_port: addresses.base_relay_port,
            base_user_port: addresses.base_user_port,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl NetworkConfig {
    pub fn address_space(&self) -> AddressSpace {
        AddressSpace::new(self.registry_port, self.base_relay_port, self.base_user_port)
    }

    /// `host:port` for a listener or peer
    pub fn socket_address(&self, port: u16) -> String {
        format!("{}:{}", self.host, port)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: SocketAddr::from(([127, 0, 0, 1], 9090)),
        }
    }
}

fn parse_var<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

fn parse_duration(var: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime_serde::re::humantime::parse_duration(value.trim()).map_err(|e| {
        ConfigError::InvalidValue {
            var: var.to_string(),
            reason: e.to_string(),
        }
    })
}

impl Config {
    /// Defaults plus environment overrides
    ///
    /// Environment variables follow the pattern `ONIONMESH_<KEY>`,
    /// e.g. `ONIONMESH_BASE_RELAY_PORT=4000`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_from(|var| env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// File (if any), then environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|var| env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ONIONMESH_*` overrides read through `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        const HOST: &str = "ONIONMESH_HOST";
        const REGISTRY_PORT: &str = "ONIONMESH_REGISTRY_PORT";
        const BASE_RELAY_PORT: &str = "ONIONMESH_BASE_RELAY_PORT";
        const BASE_USER_PORT: &str = "ONIONMESH_BASE_USER_PORT";
        const SHUTDOWN_TIMEOUT: &str = "ONIONMESH_SHUTDOWN_TIMEOUT";
        const REQUEST_TIMEOUT: &str = "ONIONMESH_REQUEST_TIMEOUT";
        const EXPOSE_PRIVATE_KEY: &str = "ONIONMESH_EXPOSE_PRIVATE_KEY";
        const LOG_LEVEL: &str = "ONIONMESH_LOG_LEVEL";
        const LOG_JSON: &str = "ONIONMESH_LOG_JSON";
        const METRICS_ENABLED: &str = "ONIONMESH_METRICS_ENABLED";
        const METRICS_BIND_ADDRESS: &str = "ONIONMESH_METRICS_BIND_ADDRESS";

        // Network config
        if let Some(host) = lookup(HOST) {
            self.network.host = host;
        }
        if let Some(port) = lookup(REGISTRY_PORT) {
            self.network.registry_port = parse_var(REGISTRY_PORT, &port)?;
        }
        if let Some(port) = lookup(BASE_RELAY_PORT) {
            self.network.base_relay_port = parse_var(BASE_RELAY_PORT, &port)?;
        }
        if let Some(port) = lookup(BASE_USER_PORT) {
            self.network.base_user_port = parse_var(BASE_USER_PORT, &port)?;
        }
        if let Some(timeout) = lookup(SHUTDOWN_TIMEOUT) {
            self.network.shutdown_timeout = parse_duration(SHUTDOWN_TIMEOUT, &timeout)?;
        }

        // Transport and relay config
        if let Some(timeout) = lookup(REQUEST_TIMEOUT) {
            self.transport.request_timeout = Some(parse_duration(REQUEST_TIMEOUT, &timeout)?);
        }
        if let Some(expose) = lookup(EXPOSE_PRIVATE_KEY) {
            self.relay.expose_private_key = parse_var(EXPOSE_PRIVATE_KEY, &expose)?;
        }

        // Logging config
        if let Some(level) = lookup(LOG_LEVEL) {
            self.logging.level = level.trim().to_lowercase();
        }
        if let Some(json) = lookup(LOG_JSON) {
            self.logging.json_format = parse_var(LOG_JSON, &json)?;
        }

        // Metrics config
        if let Some(enabled) = lookup(METRICS_ENABLED) {
            self.metrics.enabled = parse_var(METRICS_ENABLED, &enabled)?;
        }
        if let Some(addr) = lookup(METRICS_BIND_ADDRESS) {
            self.metrics.bind_address = parse_var(METRICS_BIND_ADDRESS, &addr)?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let network = &self.network;

        if network.host.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("host must not be empty".to_string()));
        }

        if network.base_user_port <= network.base_relay_port {
            return Err(ConfigError::ValidationFailed(format!(
                "base_user_port ({}) must be greater than base_relay_port ({})",
                network.base_user_port, network.base_relay_port
            )));
        }

        if network.base_relay_port == 0 {
            return Err(ConfigError::ValidationFailed(
                "base_relay_port must be greater than 0".to_string(),
            ));
        }

        if network.shutdown_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "shutdown_timeout must be greater than 0".to_string(),
            ));
        }

        if self.transport.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ValidationFailed(
                "request_timeout must be greater than 0 when set".to_string(),
            ));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}
