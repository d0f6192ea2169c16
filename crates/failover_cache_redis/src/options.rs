// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use redis::aio::ConnectionManagerConfig;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RECONNECT_RETRIES: usize = 3;

/// Connection-level settings for a [`RedisNode`](crate::RedisNode).
///
/// Defaults to a 5 second response and connect timeout and 3 transport
/// retries.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use failover_cache_redis::ConnectionOptions;
///
/// let options = ConnectionOptions::with_timeout(Duration::from_secs(2)).with_reconnect_retries(1);
/// assert_eq!(options.response_timeout(), Duration::from_secs(2));
/// assert_eq!(options.connection_timeout(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    response_timeout: Duration,
    connection_timeout: Duration,
    reconnect_retries: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_TIMEOUT,
            connection_timeout: DEFAULT_TIMEOUT,
            reconnect_retries: DEFAULT_RECONNECT_RETRIES,
        }
    }
}

impl ConnectionOptions {
    /// Creates options that use `timeout` for both responses and connects.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::default().with_response_timeout(timeout).with_connection_timeout(timeout)
    }

    /// Sets the socket timeout for a single command.
    #[must_use]
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Sets the timeout for establishing a connection.
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Sets how many times the transport retries a failed connect.
    #[must_use]
    pub fn with_reconnect_retries(mut self, retries: usize) -> Self {
        self.reconnect_retries = retries;
        self
    }

    /// Returns the socket timeout for a single command.
    #[must_use]
    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Returns the connect timeout.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    /// Returns the number of transport retries.
    #[must_use]
    pub fn reconnect_retries(&self) -> usize {
        self.reconnect_retries
    }

    pub(crate) fn manager_config(&self) -> ConnectionManagerConfig {
        ConnectionManagerConfig::new()
            .set_response_timeout(self.response_timeout)
            .set_connection_timeout(self.connection_timeout)
            .set_number_of_retries(self.reconnect_retries)
    }
}
