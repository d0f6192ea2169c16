// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Display, Formatter};

use recoverable::{Recovery, RecoveryInfo};

/// The failure a caller of the cache ultimately observes.
///
/// Each signal corresponds to an HTTP status so that services built on the
/// cache can surface failures without translating them again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Signal {
    /// No store node could be reached (503).
    ServiceUnavailable,
    /// A store node did not answer in time (504).
    GatewayTimeout,
    /// Any other failure (500).
    InternalError,
    /// The requested operation is not available on the target node (501).
    ///
    /// This is a programming or configuration error, not a transient condition.
    NotSupported,
}

impl Signal {
    /// Returns the HTTP status code equivalent of this signal.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::ServiceUnavailable => 503,
            Self::GatewayTimeout => 504,
            Self::InternalError => 500,
            Self::NotSupported => 501,
        }
    }

    /// Returns the reason phrase of this signal.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ServiceUnavailable => "Service Unavailable",
            Self::GatewayTimeout => "Gateway Timeout",
            Self::InternalError => "Internal Server Error",
            Self::NotSupported => "Not Supported",
        }
    }
}

impl Display for Signal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned by cache operations.
///
/// Carries the [`Signal`] the caller should act on and keeps the underlying
/// failure as its cause.
///
/// # Examples
///
/// ```
/// use failover_cache::{Signal, classify};
/// use failover_cache_node::StoreError;
///
/// let error = classify(StoreError::timed_out("replica did not answer"));
/// assert_eq!(error.signal(), Signal::GatewayTimeout);
/// assert_eq!(error.status_code(), 504);
/// ```
#[ohno::error]
#[display("{signal}")]
pub struct Error {
    signal: Signal,
}

impl Error {
    pub(crate) fn internal(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(Signal::InternalError, cause)
    }

    pub(crate) fn not_supported(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(Signal::NotSupported, cause)
    }

    /// Returns the signal of this error.
    #[must_use]
    pub fn signal(&self) -> Signal {
        self.signal
    }

    /// Returns the HTTP status code equivalent of this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.signal.status_code()
    }
}

impl Recovery for Error {
    fn recovery(&self) -> RecoveryInfo {
        match self.signal {
            Signal::ServiceUnavailable => RecoveryInfo::unavailable(),
            Signal::GatewayTimeout => RecoveryInfo::retry(),
            Signal::InternalError => RecoveryInfo::unknown(),
            Signal::NotSupported => RecoveryInfo::never(),
        }
    }
}

/// A specialized [`Result`](std::result::Result) for cache operations.
pub type Result<T> = std::result::Result<T, Error>;
