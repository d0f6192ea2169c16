// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Redis-backed store nodes.
//!
//! [`RedisNode`] implements [`StoreNode`](failover_cache_node::StoreNode) for
//! one `host:port` endpoint. The connection is a multiplexed
//! [`ConnectionManager`](redis::aio::ConnectionManager) that is established
//! on the first command, reconnects on its own and is shared by every
//! concurrent caller.
//!
//! Connection-level resilience (socket timeout, connect timeout, transport
//! retries, TCP keepalive) is configured through [`ConnectionOptions`]; it is
//! independent of the failover performed by the caching layer above.
//!
//! # Examples
//!
//! ```no_run
//! use failover_cache_node::{Command, Endpoint, StoreNode};
//! use failover_cache_redis::{ConnectionOptions, RedisNode};
//!
//! # async fn example() -> Result<(), failover_cache_node::StoreError> {
//! let node = RedisNode::new(Endpoint::new("localhost", 6379), ConnectionOptions::default())?;
//! node.execute(Command::hset("users", "42", "Ann")).await?;
//! node.close().await?;
//! # Ok(())
//! # }
//! ```

mod decode;
mod node;
mod options;

#[doc(inline)]
pub use node::RedisNode;
#[doc(inline)]
pub use options::ConnectionOptions;
