// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache configuration from `STORE_*` environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `STORE_HOST` | `localhost` | Primary host |
//! | `STORE_PORT` | `6379` | Primary port |
//! | `STORE_REPLICAS` | empty | Comma-separated `host:port` replica list |
//! | `STORE_TIMEOUT` | `5` | Socket timeout in seconds |
//!
//! Configuration is read once; there is no reload.

use std::collections::HashMap;
use std::time::Duration;

use config::{Config, Environment};
use failover_cache_node::Endpoint;
use serde::Deserialize;

const PREFIX: &str = "STORE";
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 6379;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// An error produced when the store configuration is invalid.
#[ohno::error]
#[display("invalid store configuration: {setting}")]
pub struct ConfigError {
    setting: String,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    host: String,
    port: u16,
    replicas: String,
    timeout: u64,
}

/// Where the store nodes live and how long to wait for them.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use failover_cache::CacheConfig;
///
/// let config = CacheConfig::from_vars([
///     ("STORE_HOST", "primary.internal"),
///     ("STORE_REPLICAS", "replica-1:6380, replica-2:6380"),
/// ])?;
///
/// assert_eq!(config.primary().to_string(), "primary.internal:6379");
/// assert_eq!(config.replicas().len(), 2);
/// assert_eq!(config.timeout(), Duration::from_secs(5));
/// # Ok::<(), failover_cache::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    primary: Endpoint,
    replicas: Vec<Endpoint>,
    timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(Endpoint::new(DEFAULT_HOST, DEFAULT_PORT))
    }
}

impl CacheConfig {
    /// Creates a configuration for `primary` with no replicas and the default timeout.
    #[must_use]
    pub fn new(primary: Endpoint) -> Self {
        Self {
            primary,
            replicas: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the replica endpoints.
    #[must_use]
    pub fn with_replicas(mut self, replicas: impl IntoIterator<Item = Endpoint>) -> Self {
        self.replicas = replicas.into_iter().collect();
        self
    }

    /// Sets the socket timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::with_prefix(PREFIX))
    }

    /// Reads the configuration from explicit `STORE_*` variables.
    ///
    /// Variables without the `STORE_` prefix are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an invalid value.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self::load(Environment::with_prefix(PREFIX).source(Some(vars)))
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        let raw: RawConfig = Config::builder()
            .set_default("host", DEFAULT_HOST)
            .and_then(|builder| builder.set_default("port", u64::from(DEFAULT_PORT)))
            .and_then(|builder| builder.set_default("replicas", ""))
            .and_then(|builder| builder.set_default("timeout", DEFAULT_TIMEOUT.as_secs()))
            .map_err(|e| ConfigError::caused_by("defaults", e))?
            .add_source(environment)
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| ConfigError::caused_by(format!("{PREFIX}_*"), e))?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let host = raw.host.trim();
        if host.is_empty() {
            return Err(ConfigError::caused_by(format!("{PREFIX}_HOST"), "host is empty"));
        }

        if raw.timeout == 0 {
            return Err(ConfigError::caused_by(format!("{PREFIX}_TIMEOUT"), "timeout must be at least one second"));
        }

        let replicas = raw
            .replicas
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::parse::<Endpoint>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::caused_by(format!("{PREFIX}_REPLICAS"), e))?;

        Ok(Self {
            primary: Endpoint::new(host, raw.port),
            replicas,
            timeout: Duration::from_secs(raw.timeout),
        })
    }

    /// Returns the primary endpoint.
    #[must_use]
    pub fn primary(&self) -> &Endpoint {
        &self.primary
    }

    /// Returns the replica endpoints, in configuration order.
    #[must_use]
    pub fn replicas(&self) -> &[Endpoint] {
        &self.replicas
    }

    /// Returns the socket timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
