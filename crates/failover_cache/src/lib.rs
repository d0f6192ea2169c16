// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A read/write cache over a primary/replica key-value store.
//!
//! Writes go to the primary. Reads are spread across replicas and fall back
//! to the primary when a replica fails. Every store failure reaches the
//! caller as exactly one classified [`Error`] carrying a [`Signal`].
//!
//! # Overview
//!
//! - [`Cache`] is the public surface: [`get`](Cache::get), [`set`](Cache::set),
//!   [`get_or_load`](Cache::get_or_load), a by-name [`command`](Cache::command)
//!   pass-through and [`close`](Cache::close).
//! - [`Router`] binds an operation to a node: writes to the primary, reads to
//!   a replica picked by a [`ReplicaSelector`] with the primary as fallback.
//! - [`Guard`] runs an operation with at most one fallback attempt and
//!   classifies the failure that reaches the caller.
//! - [`classify`] maps raw [`StoreError`]s onto a [`FailureKind`] and a
//!   [`Signal`].
//!
//! # Quick Start
//!
//! ```no_run
//! use failover_cache::{Cache, CacheConfig, load};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Cache::from_config(&CacheConfig::from_env()?)?;
//!
//! cache.set("users", "42", r#"{"name":"Ann"}"#).await?;
//! let user = cache
//!     .get_or_load("users", "43", load::from_fn(|| Ok::<_, std::io::Error>(r#"{"name":"Bo"}"#.to_string())))
//!     .await?;
//!
//! cache.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Failure Signals
//!
//! | Signal | Status | Raised for |
//! |--------|--------|------------|
//! | [`Signal::ServiceUnavailable`] | 503 | refused, unreachable or closed nodes |
//! | [`Signal::GatewayTimeout`] | 504 | commands exceeding the socket timeout |
//! | [`Signal::InternalError`] | 500 | any other store, loader or payload failure |
//! | [`Signal::NotSupported`] | 501 | unknown commands, wrong argument counts |
//!
//! When a replica read fails and the primary fallback fails too, the signal
//! is derived from the primary's failure. The replica's failure is still
//! logged as a `guard.fallback` event.
//!
//! # Features
//!
//! - `redis` (default): [`RedisNode`] backends and [`Cache::from_config`].
//! - `test-util`: enables `failover_cache_node::testing::MockNode`.

mod builder;
mod cache;
mod classifier;
mod config;
mod error;
mod guard;
pub mod load;
mod router;
pub mod schema;
mod selector;
mod telemetry;
#[cfg(test)]
mod testing;
mod topology;

#[doc(inline)]
pub use builder::CacheBuilder;
#[doc(inline)]
pub use cache::Cache;
#[doc(inline)]
pub use classifier::{Classify, FailureKind, classify};
#[doc(inline)]
pub use crate::config::{CacheConfig, ConfigError};
#[doc(inline)]
pub use error::{Error, Result, Signal};
#[doc(inline)]
pub use failover_cache_node::{Command, CommandName, Endpoint, Reply, StoreError, StoreErrorKind, StoreNode};
#[cfg(feature = "redis")]
#[doc(inline)]
pub use failover_cache_redis::{ConnectionOptions, RedisNode};
#[doc(inline)]
pub use guard::Guard;
#[doc(inline)]
pub use load::Loadable;
#[doc(inline)]
pub use router::{GuardedOp, NodeCall, Router};
#[doc(inline)]
pub use schema::Schema;
#[doc(inline)]
pub use selector::{RandomReplica, ReplicaSelector, RoundRobin};
#[doc(inline)]
pub use topology::Topology;
