// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mapping of raw store failures onto caller-facing signals.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use failover_cache_node::{StoreError, StoreErrorKind};

use crate::{Error, Signal};

/// The category a raw store failure falls into.
///
/// # Examples
///
/// ```
/// use failover_cache::{FailureKind, Signal};
/// use failover_cache_node::StoreError;
///
/// let kind = FailureKind::of(&StoreError::timed_out("read deadline exceeded"));
/// assert_eq!(kind, FailureKind::Timeout);
/// assert_eq!(kind.signal(), Signal::GatewayTimeout);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The node refused the connection, could not be reached or was closed.
    Unavailable,
    /// The node did not answer within the configured deadline.
    Timeout,
    /// Any other failure.
    Internal,
}

impl FailureKind {
    /// Categorizes a raw store error.
    #[must_use]
    pub fn of(error: &StoreError) -> Self {
        match error.kind() {
            StoreErrorKind::ConnectionRefused | StoreErrorKind::Closed => Self::Unavailable,
            StoreErrorKind::TimedOut => Self::Timeout,
            _ => Self::Internal,
        }
    }

    /// Returns the signal surfaced to callers for this category.
    #[must_use]
    pub const fn signal(self) -> Signal {
        match self {
            Self::Unavailable => Signal::ServiceUnavailable,
            Self::Timeout => Signal::GatewayTimeout,
            Self::Internal => Signal::InternalError,
        }
    }

    /// Returns a short lowercase label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can be turned into a caller-facing [`Error`].
///
/// Raw store errors are classified and logged. An [`Error`] produced earlier
/// by this crate passes through unchanged, so a failure that already crossed
/// a guard is never wrapped or logged twice.
pub trait Classify: std::error::Error + Send + Sync + 'static {
    /// Converts this error into a caller-facing error.
    fn classify(self) -> Error;
}

impl Classify for StoreError {
    fn classify(self) -> Error {
        classify(self)
    }
}

impl Classify for Error {
    fn classify(self) -> Error {
        self
    }
}

/// Classifies a raw store error and logs it.
///
/// The raw error is logged at `error` level together with a line naming the
/// category. Its full `Debug` rendering is only logged when `debug` is enabled.
///
/// # Examples
///
/// ```
/// use failover_cache::{Signal, classify};
/// use failover_cache_node::StoreError;
///
/// let error = classify(StoreError::connection_refused("10.0.0.7:6379 refused"));
/// assert_eq!(error.signal(), Signal::ServiceUnavailable);
/// ```
#[must_use]
pub fn classify(error: StoreError) -> Error {
    let kind = FailureKind::of(&error);

    tracing::error!(error = %summary(&error), failure = kind.as_str(), "store operation failed");
    match kind {
        FailureKind::Unavailable => tracing::error!("unable to connect with store node"),
        FailureKind::Timeout => tracing::error!("store node timed out"),
        FailureKind::Internal => {}
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        tracing::debug!(error = ?error, "store operation failure details");
    }

    Error::caused_by(kind.signal(), error)
}

/// Renders an error and its causes on one line, without captured backtraces.
///
/// Backtraces are only rendered by the `debug` level failure details.
pub(crate) fn summary(error: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = Vec::new();
    let mut current = Some(error);

    while let Some(link) = current {
        if let Some(store) = link.downcast_ref::<StoreError>() {
            parts.push(format!("store command failed ({})", store.kind()));
        } else if let Some(classified) = link.downcast_ref::<Error>() {
            parts.push(classified.signal().to_string());
        } else if let Some(shared) = link.downcast_ref::<Arc<Error>>() {
            parts.push(shared.signal().to_string());
        } else {
            parts.push(link.to_string());
            break;
        }
        current = link.source();
    }

    parts.join(": ")
}
