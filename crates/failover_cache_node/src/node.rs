// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for store node backends.
//!
//! [`StoreNode`] is implemented once per backend. The caching layer binds
//! nodes into primary and replica roles and wraps every call with failure
//! classification, so implementations only execute commands.

use crate::{Command, CommandName, Endpoint, Reply, StoreError};

/// A handle to one key-value store endpoint.
///
/// Implementations must be safe for concurrent use: a single node is shared
/// by every caller of the cache that owns it.
///
/// `close` releases the underlying connection. Calling any method after
/// `close` must fail with [`StoreErrorKind::Closed`](crate::StoreErrorKind::Closed)
/// rather than reconnect, and calling `close` again must succeed.
pub trait StoreNode: Send + Sync {
    /// Returns the address this node talks to.
    fn endpoint(&self) -> &Endpoint;

    /// Returns `true` if this node can execute commands with the given name.
    ///
    /// Defaults to `true`; nodes backed by restricted endpoints override it.
    fn supports(&self, name: CommandName) -> bool {
        let _ = name;
        true
    }

    /// Executes a command and returns the decoded reply.
    fn execute(&self, command: Command) -> impl Future<Output = Result<Reply, StoreError>> + Send;

    /// Releases the connection held by this node.
    fn close(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
