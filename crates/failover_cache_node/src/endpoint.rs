// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// An error produced when a `host:port` string cannot be parsed.
#[ohno::error]
#[display("invalid endpoint: {input}")]
pub struct EndpointError {
    input: String,
}

/// The network address of one store node.
///
/// # Examples
///
/// ```
/// use failover_cache_node::Endpoint;
///
/// let endpoint: Endpoint = "replica-1:6380".parse()?;
/// assert_eq!(endpoint.host(), "replica-1");
/// assert_eq!(endpoint.port(), 6380);
/// assert_eq!(endpoint.to_string(), "replica-1:6380");
/// # Ok::<(), failover_cache_node::EndpointError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Creates an endpoint from a host name and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    /// Returns the host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the TCP port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let Some((host, port)) = trimmed.rsplit_once(':') else {
            return Err(EndpointError::caused_by(trimmed, "expected host:port"));
        };

        if host.is_empty() {
            return Err(EndpointError::caused_by(trimmed, "host is empty"));
        }

        let port = port.parse::<u16>().map_err(|e| EndpointError::caused_by(trimmed, e))?;
        Ok(Self::new(host, port))
    }
}
