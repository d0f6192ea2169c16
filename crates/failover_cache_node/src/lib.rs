// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Store node abstractions for primary/replica failover caches.
//!
//! A node is a handle to one key-value store endpoint. This crate defines the
//! [`StoreNode`] trait that every backend implements, the enumerated command
//! catalog nodes execute ([`CommandName`], [`Command`]), the decoded [`Reply`]
//! and the raw [`StoreError`] a node reports when a command fails.
//!
//! # Overview
//!
//! Nodes know nothing about routing or failover. They execute one command
//! against one endpoint and report failures with a [`StoreErrorKind`] that
//! the caching layer classifies into caller-facing signals.
//!
//! # Implementing a Node
//!
//! ```
//! use failover_cache_node::{Command, Endpoint, Reply, StoreError, StoreNode};
//!
//! struct Echo(Endpoint);
//!
//! impl StoreNode for Echo {
//!     fn endpoint(&self) -> &Endpoint {
//!         &self.0
//!     }
//!
//!     async fn execute(&self, command: Command) -> Result<Reply, StoreError> {
//!         Ok(Reply::Text(command.name().to_string()))
//!     }
//!
//!     async fn close(&self) -> Result<(), StoreError> {
//!         Ok(())
//!     }
//! }
//! ```

mod command;
mod endpoint;
pub mod error;
pub(crate) mod node;
mod reply;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use command::{Arity, Command, CommandName, UnknownCommand};
#[doc(inline)]
pub use endpoint::{Endpoint, EndpointError};
#[doc(inline)]
pub use error::{StoreError, StoreErrorKind};
#[doc(inline)]
pub use node::StoreNode;
#[doc(inline)]
pub use reply::Reply;
