// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Raw errors reported by store nodes.

use std::fmt::{Display, Formatter};

use recoverable::{Recovery, RecoveryInfo};

/// The low-level failure mode of a store command.
///
/// Backends map their client errors onto these kinds; the caching layer
/// classifies them further into caller-facing signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum StoreErrorKind {
    /// The endpoint refused the connection, is unreachable, or dropped it.
    ConnectionRefused,
    /// The command did not complete within the configured deadline.
    TimedOut,
    /// The node was already closed.
    Closed,
    /// The endpoint answered with a reply that could not be decoded.
    Protocol,
    /// Any other failure.
    Other,
}

impl StoreErrorKind {
    /// Returns a short lowercase label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionRefused => "connection_refused",
            Self::TimedOut => "timed_out",
            Self::Closed => "closed",
            Self::Protocol => "protocol",
            Self::Other => "other",
        }
    }
}

impl Display for StoreErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from a store node.
///
/// Wraps the backend's own error as its cause and records the
/// [`StoreErrorKind`] used for classification.
///
/// # Examples
///
/// ```
/// use failover_cache_node::{StoreError, StoreErrorKind};
///
/// let error = StoreError::timed_out("read deadline exceeded");
/// assert_eq!(error.kind(), StoreErrorKind::TimedOut);
/// ```
#[ohno::error]
#[display("store command failed ({kind})")]
pub struct StoreError {
    kind: StoreErrorKind,
}

impl StoreError {
    /// The endpoint refused the connection or could not be reached.
    pub fn connection_refused(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(StoreErrorKind::ConnectionRefused, cause)
    }

    /// The command exceeded its deadline.
    pub fn timed_out(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(StoreErrorKind::TimedOut, cause)
    }

    /// The node was used after it had been closed.
    pub fn closed(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(StoreErrorKind::Closed, cause)
    }

    /// The reply could not be decoded.
    pub fn protocol(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(StoreErrorKind::Protocol, cause)
    }

    /// Any other failure.
    pub fn other(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(StoreErrorKind::Other, cause)
    }

    /// Returns the failure mode of this error.
    #[must_use]
    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }
}

impl Recovery for StoreError {
    fn recovery(&self) -> RecoveryInfo {
        match self.kind {
            StoreErrorKind::ConnectionRefused | StoreErrorKind::Closed => RecoveryInfo::unavailable(),
            StoreErrorKind::TimedOut => RecoveryInfo::retry(),
            StoreErrorKind::Protocol => RecoveryInfo::never(),
            StoreErrorKind::Other => RecoveryInfo::unknown(),
        }
    }
}
